//! Direct-mapped pawn-king evaluation cache.
//!
//! Pawn and king structure changes rarely between nodes, so its evaluation
//! is cached under a pawn/king-only Zobrist hash. Unlike the transposition
//! table there is no bucket structure, no aging, and no replacement policy:
//! a new key simply overwrites whatever occupies its slot, because a miss
//! only costs a cheap re-evaluation. The full hash is stored, so a hit is
//! an exact key match rather than a truncated-signature match.

use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Entries in the table, indexed by the top 16 bits of the pawn-king hash.
const PK_TABLE_SIZE: usize = 1 << 16;
const PK_HASH_SHIFT: u32 = 48;

/// Cached pawn-king evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PkHit {
    /// Passed-pawn bitmask, opaque to the table.
    pub passed: u64,
    pub eval: i32,
}

#[derive(Default)]
struct PkSlot {
    hash: AtomicU64,
    passed: AtomicU64,
    eval: AtomicU64,
}

/// The pawn-king table. Shared lock-free like the transposition table; a
/// torn entry is caught by the full-hash comparison in almost all cases,
/// and the residual risk is accepted for the same throughput reasons.
pub struct PkTable {
    slots: Box<[PkSlot]>,
}

impl PkTable {
    #[must_use]
    pub fn new() -> Self {
        PkTable {
            slots: (0..PK_TABLE_SIZE).map(|_| PkSlot::default()).collect(),
        }
    }

    #[inline]
    fn index(pkhash: u64) -> usize {
        (pkhash >> PK_HASH_SHIFT) as usize
    }

    /// Look up a pawn-king hash; a hit requires full hash equality.
    #[must_use]
    pub fn probe(&self, pkhash: u64) -> Option<PkHit> {
        let slot = &self.slots[Self::index(pkhash)];
        if slot.hash.load(Ordering::Relaxed) != pkhash {
            return None;
        }
        Some(PkHit {
            passed: slot.passed.load(Ordering::Relaxed),
            eval: slot.eval.load(Ordering::Relaxed) as u32 as i32,
        })
    }

    /// Cache an evaluation, unconditionally overwriting the slot.
    pub fn store(&self, pkhash: u64, passed: u64, eval: i32) {
        let slot = &self.slots[Self::index(pkhash)];
        slot.passed.store(passed, Ordering::Relaxed);
        slot.eval.store(u64::from(eval as u32), Ordering::Relaxed);
        slot.hash.store(pkhash, Ordering::Relaxed);
    }

    /// Wipe the table (new game). Requires quiescence.
    pub fn clear(&self) {
        for slot in self.slots.iter() {
            slot.hash.store(0, Ordering::Relaxed);
            slot.passed.store(0, Ordering::Relaxed);
            slot.eval.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for PkTable {
    fn default() -> Self {
        Self::new()
    }
}
