//! Minimal position snapshot consumed by the hashing and cache layers.
//!
//! The table code never generates moves or evaluates anything; all it needs
//! from a position is one 4-bit piece code per square, the castling-rook
//! bitboard, the en-passant square, and the side to move. That contract is
//! captured here as a small read-only snapshot type.

use crate::types::{piece_code, Color, Piece, EMPTY, SQUARE_NB};
use crate::zobrist::HashSrc;

/// Read-only snapshot of the position fields the caches hash and fingerprint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    /// One 4-bit piece code per square, a1 = 0 .. h8 = 63.
    squares: [u8; SQUARE_NB],
    /// One bit per rook that still carries a castling right.
    castle_rooks: u64,
    /// En-passant capture square, or -1 when none is available.
    ep_square: i8,
    turn: Color,
}

impl Board {
    /// An empty board: no pieces, no rights, white to move.
    #[must_use]
    pub fn empty() -> Self {
        Board {
            squares: [EMPTY; SQUARE_NB],
            castle_rooks: 0,
            ep_square: -1,
            turn: Color::White,
        }
    }

    /// Parse the four position fields of a FEN string.
    ///
    /// Move counters are ignored if present. Castling rights only accept the
    /// standard KQkq flags, mapped to the conventional rook squares.
    #[must_use]
    pub fn from_fen(fen: &str) -> Option<Self> {
        let mut parts = fen.split_whitespace();
        let placement = parts.next()?;
        let turn = parts.next()?;
        let castling = parts.next()?;
        let ep = parts.next()?;

        let mut board = Board::empty();

        let mut rank: i32 = 7;
        let mut file: i32 = 0;
        for c in placement.chars() {
            match c {
                '/' => {
                    rank -= 1;
                    file = 0;
                }
                '1'..='8' => file += c as i32 - '0' as i32,
                _ => {
                    if !(0..8).contains(&rank) || !(0..8).contains(&file) {
                        return None;
                    }
                    let color = if c.is_ascii_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    board.set_piece((rank * 8 + file) as u8, color, Piece::from_char(c)?);
                    file += 1;
                }
            }
        }

        board.turn = match turn {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return None,
        };

        if castling != "-" {
            for c in castling.chars() {
                board.castle_rooks |= match c {
                    'K' => 1 << 7,
                    'Q' => 1,
                    'k' => 1 << 63,
                    'q' => 1 << 56,
                    _ => return None,
                };
            }
        }

        if ep != "-" {
            let bytes = ep.as_bytes();
            if bytes.len() != 2
                || !(b'a'..=b'h').contains(&bytes[0])
                || !(b'1'..=b'8').contains(&bytes[1])
            {
                return None;
            }
            board.ep_square = ((bytes[1] - b'1') * 8 + (bytes[0] - b'a')) as i8;
        }

        Some(board)
    }

    pub fn set_piece(&mut self, sq: u8, color: Color, piece: Piece) {
        self.squares[sq as usize] = piece_code(color, piece);
    }

    pub fn clear_square(&mut self, sq: u8) {
        self.squares[sq as usize] = EMPTY;
    }

    pub fn set_turn(&mut self, turn: Color) {
        self.turn = turn;
    }

    pub fn set_ep_square(&mut self, sq: Option<u8>) {
        self.ep_square = sq.map_or(-1, |sq| sq as i8);
    }

    pub fn set_castle_rooks(&mut self, rooks: u64) {
        self.castle_rooks = rooks;
    }

    /// The 4-bit piece code occupying a square (`EMPTY` when unoccupied).
    #[inline]
    #[must_use]
    pub fn piece_code_at(&self, sq: u8) -> u8 {
        self.squares[sq as usize]
    }

    #[inline]
    #[must_use]
    pub fn turn(&self) -> Color {
        self.turn
    }

    #[inline]
    #[must_use]
    pub fn ep_square(&self) -> i8 {
        self.ep_square
    }

    #[inline]
    #[must_use]
    pub fn castle_rooks(&self) -> u64 {
        self.castle_rooks
    }

    /// Eight raw words, eight squares per word in little-endian byte order,
    /// each byte holding one piece code in its low nibble.
    #[must_use]
    pub(crate) fn raw_words(&self) -> [u64; 8] {
        let mut words = [0u64; 8];
        for (i, word) in words.iter_mut().enumerate() {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&self.squares[i * 8..i * 8 + 8]);
            *word = u64::from_le_bytes(bytes);
        }
        words
    }

    /// Zobrist hash of the snapshot (pack + hash in one step).
    #[must_use]
    pub fn hash(&self) -> u64 {
        HashSrc::pack(self).hash()
    }
}
