//! Shared piece, colour, and score types.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const SQUARE_NB: usize = 64;

/// Maximum search distance from the root, in plies.
pub const MAX_PLY: i32 = 128;

// Score constants. Mates found during search are reported as MATE minus the
// distance to the mate, so everything at or beyond TBWIN_IN_MAX needs the
// height adjustment described in `tt::value_to_tt`.
pub const MATE: i32 = 32000 + MAX_PLY;
pub const MATE_IN_MAX: i32 = MATE - MAX_PLY;
pub const TBWIN: i32 = 31000 + MAX_PLY;
pub const TBWIN_IN_MAX: i32 = TBWIN - MAX_PLY;
pub const VALUE_NONE: i32 = MATE + 1;

/// Piece code stored for an unoccupied square.
pub const EMPTY: u8 = 14;

/// Number of distinct 4-bit piece codes.
pub(crate) const PIECE_CODE_NB: usize = 16;

/// Colors
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Color {
    White,
    Black,
}

impl Color {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }
}

/// Chess piece types.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Piece {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl Piece {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Piece::Pawn => 0,
            Piece::Knight => 1,
            Piece::Bishop => 2,
            Piece::Rook => 3,
            Piece::Queen => 4,
            Piece::King => 5,
        }
    }

    /// Parse a piece from a character (p, n, b, r, q, k, case-insensitive).
    #[must_use]
    pub fn from_char(c: char) -> Option<Piece> {
        match c.to_ascii_lowercase() {
            'p' => Some(Piece::Pawn),
            'n' => Some(Piece::Knight),
            'b' => Some(Piece::Bishop),
            'r' => Some(Piece::Rook),
            'q' => Some(Piece::Queen),
            'k' => Some(Piece::King),
            _ => None,
        }
    }
}

/// 4-bit piece code: white pieces 0-5, black pieces 8-13, empty 14.
#[inline]
#[must_use]
pub const fn piece_code(color: Color, piece: Piece) -> u8 {
    (piece.index() + color.index() * 8) as u8
}

#[inline]
pub(crate) const fn file_of(sq: u8) -> usize {
    (sq & 7) as usize
}

/// What a cached score proves about the position it was searched from.
///
/// The two bits of the bound share a byte with the six-bit entry age, so the
/// discriminants are load-bearing: they must stay within `0x3`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Bound {
    None = 0,
    Lower = 1,
    Upper = 2,
    Exact = 3,
}

impl Bound {
    #[inline]
    #[must_use]
    pub(crate) const fn bits(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub(crate) const fn from_bits(bits: u8) -> Bound {
        match bits & 0x3 {
            0 => Bound::None,
            1 => Bound::Lower,
            2 => Bound::Upper,
            _ => Bound::Exact,
        }
    }
}
