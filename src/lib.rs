//! Search-memoization layer for a chess engine: a lock-free transposition
//! table, a direct-mapped pawn-king cache, and the packed-board Zobrist
//! hashing that feeds both.

mod alloc;
pub mod board;
pub mod pk;
pub mod tt;
pub mod types;
pub mod zobrist;

pub use board::Board;
pub use pk::{PkHit, PkTable};
pub use tt::{value_from_tt, value_to_tt, TTHit, TTable, VerificationStats, TT_BUCKET_NB};
pub use types::{Bound, Color, Piece};
pub use zobrist::HashSrc;
