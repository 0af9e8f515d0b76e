//! Zobrist hashing over packed position snapshots.
//!
//! The board is first packed into a fixed 40-byte [`HashSrc`] record, which
//! doubles as the collision fingerprint kept by the transposition table's
//! verification side table. The hash itself XORs one key per square (all 64,
//! including an explicit key for the empty code), one key per en-passant
//! file, one key per castling-rook bit, and a turn key for Black.

use once_cell::sync::Lazy;
use rand::prelude::*;

use crate::board::Board;
use crate::types::{file_of, Color, PIECE_CODE_NB, SQUARE_NB};

const NIBBLE_LO: u64 = 0x0F0F_0F0F_0F0F_0F0F;

pub(crate) struct ZobristKeys {
    // piece_square[piece_code][square], indexed by the 4-bit packed code so
    // the empty code has its own (harmless, always-XORed) key.
    pub(crate) piece_square: [[u64; SQUARE_NB]; PIECE_CODE_NB],
    pub(crate) enpass: [u64; 8],
    // One key per bit of the castling-rook bitboard.
    pub(crate) castle: [u64; SQUARE_NB],
    pub(crate) turn: u64,
}

impl ZobristKeys {
    fn new() -> Self {
        // Fixed seed for reproducibility across runs and threads.
        let mut rng = StdRng::seed_from_u64(987654321_u64);
        let mut piece_square = [[0; SQUARE_NB]; PIECE_CODE_NB];
        let mut enpass = [0; 8];
        let mut castle = [0; SQUARE_NB];

        for code in &mut piece_square {
            for key in code.iter_mut() {
                *key = rng.gen();
            }
        }
        for key in &mut enpass {
            *key = rng.gen();
        }
        for key in &mut castle {
            *key = rng.gen();
        }

        ZobristKeys {
            piece_square,
            enpass,
            castle,
            turn: rng.gen(),
        }
    }
}

pub(crate) static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::new);

/// Packed 40-byte snapshot of a position, used both as the Zobrist input and
/// as the verification fingerprint stored next to transposition entries.
///
/// Layout (`#[repr(C)]`, 40 bytes total):
/// - `packed[4]`: two raw 8-square words merged per entry, the even word in
///   the low nibbles and the odd word in the high nibbles, so each nibble is
///   one piece code.
/// - `castle_rooks[2]`: white rook files (bits 0-7 of the rook bitboard) and
///   black rook files (bits 56-63).
/// - `ep_square`: square index or -1.
/// - `turn`: 0 white, 1 black.
/// - `padding[4]`: always zero, so whole-record comparison is well defined.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(C)]
pub struct HashSrc {
    packed: [u64; 4],
    castle_rooks: [u8; 2],
    ep_square: i8,
    turn: u8,
    padding: [u8; 4],
}

const _: () = assert!(std::mem::size_of::<HashSrc>() == 40);

impl HashSrc {
    /// Pack a board snapshot. Packing losing a bit is a programmer error in
    /// the board representation and aborts immediately.
    #[must_use]
    pub fn pack(board: &Board) -> HashSrc {
        let raw = board.raw_words();
        let mut packed = [0u64; 4];
        for (i, word) in packed.iter_mut().enumerate() {
            *word = raw[i * 2] | (raw[i * 2 + 1] << 4);
        }

        // The merge is only lossless while every byte of the raw words stays
        // within its low nibble.
        for (i, word) in packed.iter().enumerate() {
            assert_eq!(word & NIBBLE_LO, raw[i * 2]);
            assert_eq!((word >> 4) & NIBBLE_LO, raw[i * 2 + 1]);
        }

        HashSrc {
            packed,
            castle_rooks: [
                (board.castle_rooks() & 0xFF) as u8,
                (board.castle_rooks() >> 56) as u8,
            ],
            ep_square: board.ep_square(),
            turn: board.turn().index() as u8,
            padding: [0; 4],
        }
    }

    /// Recover the eight raw square words the record was packed from.
    #[must_use]
    pub(crate) fn unpack(&self) -> [u64; 8] {
        let mut raw = [0u64; 8];
        for (i, word) in self.packed.iter().enumerate() {
            raw[i * 2] = word & NIBBLE_LO;
            raw[i * 2 + 1] = (word >> 4) & NIBBLE_LO;
        }
        raw
    }

    /// The record viewed as five words, for atomic fingerprint storage.
    #[must_use]
    pub(crate) fn as_words(&self) -> [u64; 5] {
        let mut words = [0u64; 5];
        words[..4].copy_from_slice(&self.packed);
        words[4] = u64::from_le_bytes([
            self.castle_rooks[0],
            self.castle_rooks[1],
            self.ep_square as u8,
            self.turn,
            0,
            0,
            0,
            0,
        ]);
        words
    }

    /// 64-bit Zobrist key of the packed position.
    #[must_use]
    pub fn hash(&self) -> u64 {
        let keys = &*ZOBRIST;
        let mut hash = if self.turn == Color::Black.index() as u8 {
            keys.turn
        } else {
            0
        };

        let raw = self.unpack();
        for (i, word) in raw.iter().enumerate() {
            for (j, code) in word.to_le_bytes().iter().enumerate() {
                hash ^= keys.piece_square[*code as usize][i * 8 + j];
            }
        }

        if self.ep_square != -1 {
            hash ^= keys.enpass[file_of(self.ep_square as u8)];
        }

        let mut rooks =
            u64::from(self.castle_rooks[0]) | u64::from(self.castle_rooks[1]) << 56;
        while rooks != 0 {
            hash ^= keys.castle[rooks.trailing_zeros() as usize];
            rooks &= rooks - 1;
        }

        hash
    }
}
