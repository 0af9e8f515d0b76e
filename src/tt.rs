//! Shared transposition table.
//!
//! A fixed-size, three-way set-associative cache of search results keyed by
//! Zobrist hash. Probes and stores are lock-free: every slot is a pair of
//! relaxed atomics (a 16-bit signature and a 64-bit payload), and a torn
//! write between them is tolerated by design. The signature check, and
//! optionally a 40-byte fingerprint comparison against a verification side
//! table, catch stale or colliding entries with high probability; the
//! residual false-hit rate is an accepted trade-off of the lockless scheme.
//!
//! Resizing and clearing require quiescence (no in-flight probes or stores);
//! `resize` takes `&mut self` to make the former unmistakable.

use std::mem;
use std::sync::atomic::{AtomicU16, AtomicU64, AtomicU8, Ordering};

use log::{debug, info};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::alloc::Allocation;
use crate::board::Board;
use crate::types::{Bound, TBWIN_IN_MAX};
use crate::zobrist::HashSrc;

/// Slots per bucket (the table's associativity).
pub const TT_BUCKET_NB: usize = 3;

// The low two bits of the packed generation byte hold the bound type; the
// high six bits hold the age. The generation counter therefore advances by
// TT_MASK_BOUND + 1 so aging never touches the bound bits.
const TT_MASK_BOUND: u8 = 0x03;
const TT_MASK_AGE: u8 = 0xFC;

const MB: u64 = 1 << 20;

/// Payload layout, low to high: move (16), value (16), static eval (16),
/// depth (8), bound-plus-generation byte (8).
fn pack_data(mv: u16, value: i16, eval: i16, depth: u8, gen_bound: u8) -> u64 {
    u64::from(mv)
        | u64::from(value as u16) << 16
        | u64::from(eval as u16) << 32
        | u64::from(depth) << 48
        | u64::from(gen_bound) << 56
}

const fn data_move(data: u64) -> u16 {
    data as u16
}

const fn data_value(data: u64) -> i16 {
    (data >> 16) as u16 as i16
}

const fn data_eval(data: u64) -> i16 {
    (data >> 32) as u16 as i16
}

const fn data_depth(data: u64) -> u8 {
    (data >> 48) as u8
}

const fn data_gen_bound(data: u64) -> u8 {
    (data >> 56) as u8
}

const fn with_gen_bound(data: u64, gen_bound: u8) -> u64 {
    data & !(0xFFu64 << 56) | (gen_bound as u64) << 56
}

/// One bucket: three payloads followed by their three signatures, packed so
/// the whole bucket spans 32 bytes.
#[repr(C)]
struct TTBucket {
    data: [AtomicU64; TT_BUCKET_NB],
    sigs: [AtomicU16; TT_BUCKET_NB],
    padding: u16,
}

const _: () = assert!(mem::size_of::<TTBucket>() == 32);
// A 16-bit key must be exactly the 2 MB minimum table.
const _: () = assert!((1u64 << 16) * mem::size_of::<TTBucket>() as u64 == 2 * MB);

/// A stored fingerprint, held as five atomic words so concurrent updates
/// cannot be undefined behaviour (a torn fingerprint merely shows up as a
/// counted mismatch).
#[derive(Default)]
struct Fingerprint([AtomicU64; 5]);

impl Fingerprint {
    fn load(&self) -> [u64; 5] {
        let mut words = [0u64; 5];
        for (word, atom) in words.iter_mut().zip(&self.0) {
            *word = atom.load(Ordering::Relaxed);
        }
        words
    }

    fn store(&self, src: &HashSrc) {
        for (atom, word) in self.0.iter().zip(src.as_words()) {
            atom.store(word, Ordering::Relaxed);
        }
    }
}

/// Entry returned by a successful probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TTHit {
    /// Best-move code, opaque to the table.
    pub mv: u16,
    /// Search value, already re-normalized to the probing height.
    pub value: i32,
    /// Cached static evaluation.
    pub eval: i32,
    pub depth: i32,
    pub bound: Bound,
}

/// Collision-verification counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VerificationStats {
    /// Signature matches that went through a fingerprint comparison.
    pub lookups: u64,
    /// Fingerprint mismatches against a non-empty stored fingerprint, i.e.
    /// genuine 16-bit signature collisions.
    pub failures: u64,
}

/// The transposition table. One instance is shared (via `Arc`) by all
/// search workers; every hot-path operation takes `&self`.
pub struct TTable {
    memory: Allocation,
    hash_mask: u64,
    generation: AtomicU8,
    verification: Option<Box<[Fingerprint]>>,
    verified_lookups: AtomicU64,
    verification_failures: AtomicU64,
}

impl TTable {
    /// Create a table of at most `megabytes` MB (and more than half that).
    /// The minimum is 2 MB; smaller requests are a caller bug.
    #[must_use]
    pub fn new(megabytes: usize) -> Self {
        Self::with_verification(megabytes, false)
    }

    /// Like [`TTable::new`], but also keeps a side table of full position
    /// fingerprints to detect and count 16-bit signature collisions. This
    /// triples the memory footprint and adds a 40-byte comparison per hit.
    #[must_use]
    pub fn new_verified(megabytes: usize) -> Self {
        Self::with_verification(megabytes, true)
    }

    fn with_verification(megabytes: usize, verify: bool) -> Self {
        assert!(megabytes >= 2, "transposition table requires at least 2 MB");

        let bucket_size = mem::size_of::<TTBucket>() as u64;

        // Find the largest power-of-two bucket count still within budget:
        // grow past half the budget, never past the whole of it.
        let mut key_size = 16u32;
        while (1u64 << key_size) * bucket_size <= megabytes as u64 * MB / 2 {
            key_size += 1;
        }
        assert!((1u64 << key_size) * bucket_size <= megabytes as u64 * MB);

        let bytes = ((1u64 << key_size) * bucket_size) as usize;
        let memory = Allocation::zeroed(bytes, mem::align_of::<TTBucket>());

        let verification = verify.then(|| {
            (0..TT_BUCKET_NB << key_size)
                .map(|_| Fingerprint::default())
                .collect()
        });

        info!(
            "allocated {} MB transposition table, {} buckets, verification {}",
            bytes >> 20,
            1u64 << key_size,
            if verify { "on" } else { "off" }
        );

        TTable {
            memory,
            hash_mask: (1u64 << key_size) - 1,
            generation: AtomicU8::new(0),
            verification,
            verified_lookups: AtomicU64::new(0),
            verification_failures: AtomicU64::new(0),
        }
    }

    /// Throw away the old allocation and rebuild at the new size. Old
    /// contents are discarded; there is no incremental rehash. Must not run
    /// concurrently with probes or stores, which `&mut self` enforces.
    pub fn resize(&mut self, megabytes: usize) {
        let generation = self.generation.load(Ordering::Relaxed);
        let lookups = self.verified_lookups.load(Ordering::Relaxed);
        let failures = self.verification_failures.load(Ordering::Relaxed);

        *self = Self::with_verification(megabytes, self.verification.is_some());

        self.generation.store(generation, Ordering::Relaxed);
        self.verified_lookups.store(lookups, Ordering::Relaxed);
        self.verification_failures.store(failures, Ordering::Relaxed);
    }

    fn buckets(&self) -> &[TTBucket] {
        // SAFETY: the allocation is (mask + 1) buckets of zero-initialized
        // memory, and any bit pattern is a valid atomic.
        unsafe {
            std::slice::from_raw_parts(
                self.memory.as_ptr().cast(),
                (self.hash_mask + 1) as usize,
            )
        }
    }

    #[inline]
    fn bucket(&self, hash: u64) -> &TTBucket {
        &self.buckets()[(hash & self.hash_mask) as usize]
    }

    /// Zero the bucket array for a new game. The verification side table is
    /// deliberately left stale: its entries only read as occupied while
    /// non-zero and are superseded as slots are rewritten.
    ///
    /// Requires quiescence, like `resize`.
    pub fn clear(&self) {
        for bucket in self.buckets() {
            for i in 0..TT_BUCKET_NB {
                bucket.data[i].store(0, Ordering::Relaxed);
                bucket.sigs[i].store(0, Ordering::Relaxed);
            }
        }
        debug!("cleared transposition table");
    }

    /// Advance the generation for a new search episode.
    pub fn update_generation(&self) {
        let generation = self
            .generation
            .load(Ordering::Relaxed)
            .wrapping_add(TT_MASK_BOUND + 1);
        assert_eq!(generation & TT_MASK_BOUND, 0);
        self.generation.store(generation, Ordering::Relaxed);
    }

    /// Current allocation size, for display.
    #[must_use]
    pub fn size_mb(&self) -> usize {
        (((self.hash_mask + 1) * mem::size_of::<TTBucket>() as u64) / MB) as usize
    }

    /// Estimated table occupancy in permille, sampled from the first
    /// thousand buckets so search threads never share a live counter. Only
    /// entries touched by the current search episode count as occupied.
    #[must_use]
    pub fn hashfull(&self) -> u32 {
        let generation = self.generation.load(Ordering::Relaxed);
        let mut used = 0u32;

        for bucket in self.buckets().iter().take(1000) {
            for data in &bucket.data {
                let gen_bound = data_gen_bound(data.load(Ordering::Relaxed));
                used += u32::from(
                    gen_bound & TT_MASK_BOUND != Bound::None.bits()
                        && gen_bound & TT_MASK_AGE == generation,
                );
            }
        }

        used / TT_BUCKET_NB as u32
    }

    /// Verification counters; both stay zero when verification is off.
    #[must_use]
    pub fn verification_stats(&self) -> VerificationStats {
        VerificationStats {
            lookups: self.verified_lookups.load(Ordering::Relaxed),
            failures: self.verification_failures.load(Ordering::Relaxed),
        }
    }

    /// Hint the CPU to pull the bucket for `hash` into cache. Pure latency
    /// hiding; always safe to call speculatively.
    pub fn prefetch(&self, hash: u64) {
        let bucket: *const TTBucket = self.bucket(hash);
        #[cfg(target_arch = "x86_64")]
        unsafe {
            use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
            _mm_prefetch(bucket.cast(), _MM_HINT_T0);
        }
        #[cfg(not(target_arch = "x86_64"))]
        let _ = bucket;
    }

    /// Compare the stored fingerprint for a slot against the live board.
    /// Returns false when the probe must be treated as a miss. A mismatch
    /// against an all-zero fingerprint is a cold slot, not a collision, and
    /// is not counted as a failure.
    fn verify_entry(&self, hash: u64, slot: usize, board: &Board) -> bool {
        let Some(fingerprints) = &self.verification else {
            return true;
        };

        let index = (hash & self.hash_mask) as usize * TT_BUCKET_NB + slot;
        let stored = fingerprints[index].load();
        let current = HashSrc::pack(board).as_words();

        self.verified_lookups.fetch_add(1, Ordering::Relaxed);

        if stored == current {
            return true;
        }

        if stored[..4] != [0u64; 4] {
            self.verification_failures.fetch_add(1, Ordering::Relaxed);
            debug!("tt fingerprint mismatch for hash {hash:#018x} slot {slot}");
        }

        false
    }

    /// Look up a position. `height` is the probing node's distance from the
    /// search root, used to re-normalize mate scores. A hit refreshes the
    /// slot's age; a verification mismatch downgrades the hit to a miss.
    #[must_use]
    pub fn probe(&self, hash: u64, height: i32, board: &Board) -> Option<TTHit> {
        let sig = (hash >> 48) as u16;
        let bucket = self.bucket(hash);

        for i in 0..TT_BUCKET_NB {
            if bucket.sigs[i].load(Ordering::Relaxed) != sig {
                continue;
            }

            if !self.verify_entry(hash, i, board) {
                return None;
            }

            let data = bucket.data[i].load(Ordering::Relaxed);

            // Refresh the age while retaining the bound bits.
            let gen_bound = self.generation.load(Ordering::Relaxed)
                | (data_gen_bound(data) & TT_MASK_BOUND);
            bucket.data[i].store(with_gen_bound(data, gen_bound), Ordering::Relaxed);

            return Some(TTHit {
                mv: data_move(data),
                value: value_from_tt(i32::from(data_value(data)), height),
                eval: i32::from(data_eval(data)),
                depth: i32::from(data_depth(data)),
                bound: Bound::from_bits(gen_bound),
            });
        }

        None
    }

    /// Record a search result. Replacement prefers a slot holding the same
    /// signature; otherwise it evicts the slot with the lowest effective
    /// depth, where each elapsed generation-step since the slot was last
    /// touched costs one ply of depth.
    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &self,
        hash: u64,
        mv: u16,
        value: i32,
        eval: i32,
        depth: i32,
        bound: Bound,
        height: i32,
        board: &Board,
    ) {
        let sig = (hash >> 48) as u16;
        let generation = self.generation.load(Ordering::Relaxed);
        let bucket = self.bucket(hash);

        // Snapshot the bucket once; the replacement decision runs on the
        // copy so a concurrent writer cannot skew the scan mid-way.
        let mut datas = [0u64; TT_BUCKET_NB];
        let mut sigs = [0u16; TT_BUCKET_NB];
        for i in 0..TT_BUCKET_NB {
            datas[i] = bucket.data[i].load(Ordering::Relaxed);
            sigs[i] = bucket.sigs[i].load(Ordering::Relaxed);
        }

        // Effective depth: raw depth minus the age penalty. The additive 259
        // keeps the modular subtraction non-negative before masking.
        let effective_depth = |data: u64| {
            i32::from(data_depth(data))
                - ((259 + i32::from(generation) - i32::from(data_gen_bound(data)))
                    & i32::from(TT_MASK_AGE))
        };

        let mut matched = None;
        let mut replace = 0;
        for (i, slot_sig) in sigs.iter().enumerate() {
            if *slot_sig == sig {
                matched = Some(i);
                break;
            }
            if effective_depth(datas[replace]) >= effective_depth(datas[i]) {
                replace = i;
            }
        }
        let target = matched.unwrap_or(replace);

        // Don't let a clearly shallower non-exact result clobber deeper
        // analysis of the same position.
        if bound != Bound::Exact && sig == sigs[target] && depth < i32::from(data_depth(datas[target])) - 3
        {
            return;
        }

        let value = value_to_tt(value, height);
        debug_assert!(i32::from(i16::MIN) <= value && value <= i32::from(i16::MAX));
        debug_assert!((0..256).contains(&depth));

        let data = pack_data(
            mv,
            value as i16,
            eval as i16,
            depth as u8,
            bound.bits() | generation,
        );
        bucket.data[target].store(data, Ordering::Relaxed);
        bucket.sigs[target].store(sig, Ordering::Relaxed);

        if let Some(fingerprints) = &self.verification {
            let index = (hash & self.hash_mask) as usize * TT_BUCKET_NB + target;
            fingerprints[index].store(&HashSrc::pack(board));
        }
    }
}

/// Re-normalize a stored value to a node `height` plies from the root.
/// Mate-range magnitudes shrink toward zero by the height; everything else
/// passes through unchanged.
#[inline]
#[must_use]
pub const fn value_from_tt(value: i32, height: i32) -> i32 {
    if value >= TBWIN_IN_MAX {
        value - height
    } else if value <= -TBWIN_IN_MAX {
        value + height
    } else {
        value
    }
}

/// Inverse of [`value_from_tt`]: shift a mate-range value away from zero by
/// the height before persisting it, so stored scores are root-relative.
#[inline]
#[must_use]
pub const fn value_to_tt(value: i32, height: i32) -> i32 {
    if value >= TBWIN_IN_MAX {
        value + height
    } else if value <= -TBWIN_IN_MAX {
        value - height
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MATE, MATE_IN_MAX};
    use proptest::prelude::*;

    const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn startpos() -> Board {
        Board::from_fen(STARTPOS).unwrap()
    }

    /// Hash mapping to bucket `index` with signature `sig`.
    fn make_hash(index: u64, sig: u16) -> u64 {
        (u64::from(sig) << 48) | index
    }

    #[test]
    fn test_sizing_bounds() {
        for mb in [2, 3, 4, 5, 8, 12, 16] {
            let tt = TTable::new(mb);
            let size = tt.size_mb();
            assert!(size <= mb, "size {size} exceeds budget {mb}");
            assert!(size * 2 > mb, "size {size} below half of budget {mb}");
        }
    }

    #[test]
    #[should_panic]
    fn test_rejects_undersized_budget() {
        let _ = TTable::new(1);
    }

    #[test]
    fn test_store_probe_consistency() {
        let tt = TTable::new(2);
        let board = startpos();
        let hash = board.hash();

        tt.store(hash, 0x1234, 87, -21, 5, Bound::Exact, 3, &board);

        let hit = tt.probe(hash, 3, &board).expect("entry should be found");
        assert_eq!(hit.mv, 0x1234);
        assert_eq!(hit.value, 87);
        assert_eq!(hit.eval, -21);
        assert_eq!(hit.depth, 5);
        assert_eq!(hit.bound, Bound::Exact);
    }

    #[test]
    fn test_probe_miss_is_not_an_error() {
        let tt = TTable::new(2);
        let board = startpos();
        assert!(tt.probe(make_hash(17, 0xBEEF), 0, &board).is_none());
    }

    #[test]
    fn test_mate_values_follow_probing_height() {
        let tt = TTable::new(2);
        let board = startpos();
        let hash = make_hash(9, 0x4242);

        // Mate in three found at height 2 is stored root-relative.
        tt.store(hash, 0, MATE - 3, 0, 8, Bound::Exact, 2, &board);

        let hit = tt.probe(hash, 5, &board).unwrap();
        assert_eq!(hit.value, (MATE - 3 + 2) - 5);

        let hit = tt.probe(hash, 2, &board).unwrap();
        assert_eq!(hit.value, MATE - 3);
    }

    #[test]
    fn test_depth_regression_guard() {
        let tt = TTable::new(2);
        let board = startpos();
        let hash = make_hash(4, 0x7777);

        tt.store(hash, 11, 300, 10, 10, Bound::Lower, 0, &board);

        // More than three plies shallower and not exact: dropped.
        tt.store(hash, 22, -50, 20, 5, Bound::Upper, 0, &board);
        let hit = tt.probe(hash, 0, &board).unwrap();
        assert_eq!(hit.mv, 11);
        assert_eq!(hit.depth, 10);
        assert_eq!(hit.bound, Bound::Lower);

        // Exactly at the threshold (depth == old - 3): accepted.
        tt.store(hash, 33, 70, 30, 7, Bound::Upper, 0, &board);
        let hit = tt.probe(hash, 0, &board).unwrap();
        assert_eq!(hit.mv, 33);
        assert_eq!(hit.depth, 7);

        // Exact bounds always win, however shallow.
        tt.store(hash, 44, 1, 40, 1, Bound::Exact, 0, &board);
        let hit = tt.probe(hash, 0, &board).unwrap();
        assert_eq!(hit.mv, 44);
        assert_eq!(hit.depth, 1);
        assert_eq!(hit.bound, Bound::Exact);
    }

    #[test]
    fn test_replacement_prefers_matching_signature() {
        let tt = TTable::new(2);
        let board = startpos();

        for (sig, depth) in [(0x0101u16, 30), (0x0202, 20), (0x0303, 25)] {
            tt.store(make_hash(6, sig), 1, 0, 0, depth, Bound::Lower, 0, &board);
        }

        // The bucket is full; an update to an existing position must land in
        // its own slot, not evict by depth.
        tt.store(make_hash(6, 0x0101), 99, 5, 5, 31, Bound::Lower, 0, &board);

        for (sig, depth) in [(0x0101u16, 31), (0x0202, 20), (0x0303, 25)] {
            let hit = tt.probe(make_hash(6, sig), 0, &board).unwrap();
            assert_eq!(hit.depth, depth);
        }
    }

    #[test]
    fn test_replacement_evicts_lowest_effective_depth() {
        let tt = TTable::new(2);
        let board = startpos();

        for (sig, depth) in [(0x0A0Au16, 10), (0x0B0B, 20), (0x0C0C, 30)] {
            tt.store(make_hash(8, sig), 0, 0, 0, depth, Bound::Lower, 0, &board);
        }

        // A fourth distinct position must push out the shallowest entry.
        tt.store(make_hash(8, 0x0D0D), 0, 0, 0, 5, Bound::Lower, 0, &board);

        assert!(tt.probe(make_hash(8, 0x0A0A), 0, &board).is_none());
        assert!(tt.probe(make_hash(8, 0x0B0B), 0, &board).is_some());
        assert!(tt.probe(make_hash(8, 0x0C0C), 0, &board).is_some());
        assert!(tt.probe(make_hash(8, 0x0D0D), 0, &board).is_some());
    }

    #[test]
    fn test_stale_entries_age_out_of_replacement() {
        let tt = TTable::new(2);
        let board = startpos();

        // Deep entry from an old search episode.
        tt.store(make_hash(3, 0x1111), 0, 0, 0, 24, Bound::Lower, 0, &board);

        // Twenty-five generations later even depth 24 has decayed below a
        // fresh depth-1 entry, wrapping included.
        for _ in 0..25 {
            tt.update_generation();
        }
        tt.store(make_hash(3, 0x2222), 0, 0, 0, 1, Bound::Lower, 0, &board);
        tt.store(make_hash(3, 0x3333), 0, 0, 0, 1, Bound::Lower, 0, &board);
        tt.store(make_hash(3, 0x4444), 0, 0, 0, 1, Bound::Lower, 0, &board);

        assert!(tt.probe(make_hash(3, 0x1111), 0, &board).is_none());
    }

    #[test]
    fn test_generation_never_touches_bound_bits() {
        let tt = TTable::new(2);
        // A full wrap of the six-bit age plus change.
        for _ in 0..200 {
            tt.update_generation();
        }
    }

    #[test]
    fn test_hashfull_tracks_current_generation() {
        let tt = TTable::new(2);
        let board = startpos();
        tt.clear();

        assert_eq!(tt.hashfull(), 0);

        // One slot per bucket across the sampled prefix.
        for index in 0..300u64 {
            tt.store(make_hash(index, 0x5151), 0, 0, 0, 10, Bound::Exact, 0, &board);
        }
        assert_eq!(tt.hashfull(), 100);

        // A new search episode has touched nothing yet.
        tt.update_generation();
        assert_eq!(tt.hashfull(), 0);

        // Probing refreshes ages into the current episode.
        for index in 0..300u64 {
            let _ = tt.probe(make_hash(index, 0x5151), 0, &board);
        }
        assert_eq!(tt.hashfull(), 100);
    }

    #[test]
    fn test_clear_empties_table() {
        let tt = TTable::new(2);
        let board = startpos();
        let hash = make_hash(2, 0x9999);

        tt.store(hash, 7, 7, 7, 7, Bound::Exact, 0, &board);
        assert!(tt.probe(hash, 0, &board).is_some());

        tt.clear();
        assert!(tt.probe(hash, 0, &board).is_none());
        assert_eq!(tt.hashfull(), 0);
    }

    #[test]
    fn test_resize_discards_contents() {
        let mut tt = TTable::new(2);
        let board = startpos();
        let hash = make_hash(2, 0x2468);

        tt.store(hash, 1, 1, 1, 1, Bound::Exact, 0, &board);
        tt.resize(4);

        assert_eq!(tt.size_mb(), 4);
        assert!(tt.probe(hash, 0, &board).is_none());
    }

    #[test]
    fn test_collision_detection_counts_and_misses() {
        let tt = TTable::new_verified(2);
        let stored_board = startpos();
        let probing_board =
            Board::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
                .unwrap();

        let hash = make_hash(12, 0xABCD);
        let neighbour = make_hash(12, 0xDCBA);

        tt.store(hash, 5, 50, 5, 5, Bound::Exact, 0, &stored_board);
        tt.store(neighbour, 6, 60, 6, 6, Bound::Exact, 0, &stored_board);

        // Same truncated signature, different position: a genuine collision.
        assert!(tt.probe(hash, 0, &probing_board).is_none());
        let stats = tt.verification_stats();
        assert_eq!(stats.failures, 1);
        assert!(stats.lookups >= 1);

        // The matching position still hits, and the neighbour slot survived.
        assert!(tt.probe(hash, 0, &stored_board).is_some());
        let hit = tt.probe(neighbour, 0, &stored_board).unwrap();
        assert_eq!(hit.depth, 6);
        assert_eq!(tt.verification_stats().failures, 1);
    }

    #[test]
    fn test_cold_fingerprint_is_not_a_collision() {
        let tt = TTable::new_verified(2);
        let board = startpos();

        // Signature zero matches the empty slot, but the all-zero stored
        // fingerprint marks it as never written: a miss, not a failure.
        assert!(tt.probe(make_hash(1, 0), 0, &board).is_none());

        let stats = tt.verification_stats();
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.lookups, 1);
    }

    #[test]
    fn test_prefetch_is_inert() {
        let tt = TTable::new(2);
        let board = startpos();
        let hash = make_hash(30, 0x1357);

        tt.prefetch(hash);
        assert!(tt.probe(hash, 0, &board).is_none());

        tt.store(hash, 1, 2, 3, 4, Bound::Exact, 0, &board);
        tt.prefetch(hash);
        assert!(tt.probe(hash, 0, &board).is_some());
    }

    #[test]
    fn test_shared_across_threads() {
        use std::sync::Arc;

        let tt = Arc::new(TTable::new(2));
        let board = startpos();

        let handles: Vec<_> = (0..4u64)
            .map(|worker| {
                let tt = Arc::clone(&tt);
                let board = board.clone();
                std::thread::spawn(move || {
                    for n in 0..2000u64 {
                        let hash = make_hash(n & 0xFFFF, (n >> 2) as u16 | 1);
                        tt.prefetch(hash);
                        tt.store(
                            hash,
                            worker as u16,
                            (n % 100) as i32,
                            0,
                            ((n % 32) + 1) as i32,
                            Bound::Lower,
                            0,
                            &board,
                        );
                        let _ = tt.probe(hash, 0, &board);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    proptest! {
        /// Property: mate normalization round-trips at every height, and is
        /// the identity below the threshold.
        #[test]
        fn prop_value_tt_symmetry(
            value in -MATE..=MATE,
            height in 0..crate::types::MAX_PLY,
        ) {
            if value.abs() >= TBWIN_IN_MAX {
                prop_assert_eq!(value_from_tt(value_to_tt(value, height), height), value);
            } else {
                prop_assert_eq!(value_to_tt(value, height), value);
                prop_assert_eq!(value_from_tt(value, height), value);
            }
        }

        /// Property: payload packing round-trips every field.
        #[test]
        fn prop_pack_data_roundtrip(
            mv in any::<u16>(),
            value in any::<i16>(),
            eval in any::<i16>(),
            depth in any::<u8>(),
            gen_bound in any::<u8>(),
        ) {
            let data = pack_data(mv, value, eval, depth, gen_bound);
            prop_assert_eq!(data_move(data), mv);
            prop_assert_eq!(data_value(data), value);
            prop_assert_eq!(data_eval(data), eval);
            prop_assert_eq!(data_depth(data), depth);
            prop_assert_eq!(data_gen_bound(data), gen_bound);
        }
    }

    #[test]
    fn test_mate_bounds_fit_payload() {
        // The deepest storable mate still fits the 16-bit value field.
        assert!(value_to_tt(MATE, 0) <= i32::from(i16::MAX));
        assert!(value_to_tt(-MATE, 0) >= i32::from(i16::MIN));
        assert!(MATE_IN_MAX < MATE);
    }
}
