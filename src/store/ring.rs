//! Fixed-capacity circular buffer of samples
//!
//! The ring store owns the in-memory retention policy of the appliance: a
//! bounded history of the newest `capacity` samples, overwritten oldest-first
//! once full. It is the single source the query layer reads on the hot path;
//! the durable journal is only consulted at bootstrap.
//!
//! # Invariants
//!
//! - `count <= capacity` always
//! - the write cursor advances by exactly one per accepted sample, wrapping
//!   modulo `capacity`
//! - once `count == capacity` every further write overwrites the oldest
//!   entry and `overflow` stays `true`; the store never rejects a write
//! - logical age ordering is recoverable from `(cursor, count)` alone: the
//!   newest entry sits at `cursor - 1 mod capacity`, the oldest retained at
//!   `cursor - count mod capacity`

use crate::error::{Result, TempLogError};
use crate::types::Sample;

/// Fixed-capacity multi-channel circular buffer of [`Sample`]s
#[derive(Debug)]
pub struct RingStore {
    /// Sample slots; grows up to `capacity` then stays full
    slots: Vec<Sample>,
    /// Maximum number of retained samples
    capacity: usize,
    /// Next physical write position
    cursor: usize,
    /// Number of valid entries
    count: usize,
    /// Set on the first overwrite of an old entry, never cleared except by
    /// [`RingStore::clear`]
    overflow: bool,
}

impl RingStore {
    /// Create an empty ring store
    ///
    /// A capacity of zero is invalid and rejected at construction.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(TempLogError::InvalidArgument(
                "ring store capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
            count: 0,
            overflow: false,
        })
    }

    /// Append a sample, overwriting the oldest entry if full
    ///
    /// O(1) and infallible: a full store is the expected steady state, not an
    /// error.
    pub fn append(&mut self, sample: Sample) {
        if self.slots.len() < self.capacity {
            self.slots.push(sample);
        } else {
            self.slots[self.cursor] = sample;
        }
        if self.count == self.capacity {
            self.overflow = true;
        } else {
            self.count += 1;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    /// The most recently appended sample, `None` if empty
    pub fn latest(&self) -> Option<&Sample> {
        if self.count == 0 {
            return None;
        }
        let newest = (self.cursor + self.capacity - 1) % self.capacity;
        Some(&self.slots[newest])
    }

    /// Number of valid entries
    pub fn len(&self) -> usize {
        self.count
    }

    /// True if no samples are retained
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Maximum number of retained samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once at least one old entry has been overwritten
    pub fn overflowed(&self) -> bool {
        self.overflow
    }

    /// Reset to the initial empty state
    ///
    /// Does not touch the persisted journal; the caller orchestrates both
    /// when the user clears data.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.cursor = 0;
        self.count = 0;
        self.overflow = false;
    }

    /// Physical slot index of the logical position `i` (0 = oldest retained)
    fn physical(&self, i: usize) -> usize {
        (self.cursor + self.capacity - self.count + i) % self.capacity
    }

    /// Iterate over all retained samples in ascending time (age) order
    ///
    /// Handles histories that physically wrap past index 0.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample> + ExactSizeIterator {
        (0..self.count).map(move |i| &self.slots[self.physical(i)])
    }

    /// Samples with `since <= timestamp <= until`, ascending time order
    ///
    /// Lazy and restartable; allocation is independent of the store capacity.
    pub fn window(&self, since: i64, until: i64) -> impl Iterator<Item = &Sample> {
        self.iter()
            .filter(move |s| s.timestamp >= since && s.timestamp <= until)
    }

    /// The `limit` most-recent-minus-`offset` samples, newest-first
    ///
    /// `offset` is clamped to `[0, max_page_offset(limit)]`, so the last page
    /// is always full when enough history exists.
    pub fn page(&self, offset: usize, limit: usize) -> impl Iterator<Item = &Sample> {
        let offset = offset.min(self.max_page_offset(limit));
        self.iter().rev().skip(offset).take(limit)
    }

    /// Largest valid page offset for the given page size
    pub fn max_page_offset(&self, limit: usize) -> usize {
        self.count.saturating_sub(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(ts: i64) -> Sample {
        Sample::new(ts, vec![Some(ts as f32)])
    }

    fn timestamps(store: &RingStore) -> Vec<i64> {
        store.iter().map(|s| s.timestamp).collect()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(RingStore::new(0).is_err());
    }

    #[test]
    fn test_count_tracks_appends_up_to_capacity() {
        let mut store = RingStore::new(5).unwrap();
        assert!(store.is_empty());
        assert!(store.latest().is_none());

        for n in 1..=8 {
            store.append(sample(n));
            assert_eq!(store.len(), (n as usize).min(5));
            assert_eq!(store.latest().unwrap().timestamp, n);
        }
        assert_eq!(store.capacity(), 5);
    }

    #[test]
    fn test_overflow_flag_set_on_first_wraparound() {
        let mut store = RingStore::new(3).unwrap();
        for n in 1..=3 {
            store.append(sample(n));
            assert!(!store.overflowed());
        }
        store.append(sample(4));
        assert!(store.overflowed());
        store.append(sample(5));
        assert!(store.overflowed());
    }

    #[test]
    fn test_ascending_order_across_wraparound() {
        let mut store = RingStore::new(4).unwrap();
        for n in 1..=10 {
            store.append(sample(n));
        }
        assert_eq!(timestamps(&store), vec![7, 8, 9, 10]);
    }

    #[test]
    fn test_window_scenario() {
        // capacity 5, timestamps 1..7 appended
        let mut store = RingStore::new(5).unwrap();
        for n in 1..=7 {
            store.append(sample(n));
        }
        let ts: Vec<i64> = store.window(3, 6).map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_window_is_restartable() {
        let mut store = RingStore::new(5).unwrap();
        for n in 1..=7 {
            store.append(sample(n));
        }
        let first: Vec<i64> = store.window(3, 6).map(|s| s.timestamp).collect();
        let second: Vec<i64> = store.window(3, 6).map(|s| s.timestamp).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_page_scenario_newest_first() {
        // capacity 5, append 7 samples with timestamps 1..7
        let mut store = RingStore::new(5).unwrap();
        for n in 1..=7 {
            store.append(sample(n));
        }
        let ts: Vec<i64> = store.page(0, 5).map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![7, 6, 5, 4, 3]);
    }

    #[test]
    fn test_page_offset_clamped() {
        let mut store = RingStore::new(10).unwrap();
        for n in 1..=6 {
            store.append(sample(n));
        }
        assert_eq!(store.max_page_offset(4), 2);

        // An offset beyond the end clamps to the last full page
        let ts: Vec<i64> = store.page(100, 4).map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![4, 3, 2, 1]);

        // A limit larger than the history returns everything
        let ts: Vec<i64> = store.page(0, 100).map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_clear_resets_state() {
        let mut store = RingStore::new(3).unwrap();
        for n in 1..=5 {
            store.append(sample(n));
        }
        assert!(store.overflowed());

        store.clear();
        assert!(store.is_empty());
        assert!(!store.overflowed());
        assert!(store.latest().is_none());
        assert_eq!(store.window(i64::MIN, i64::MAX).count(), 0);

        // Usable again after clear
        store.append(sample(9));
        assert_eq!(store.latest().unwrap().timestamp, 9);
    }

    proptest! {
        #[test]
        fn prop_count_is_min_of_appends_and_capacity(
            capacity in 1usize..64,
            appends in 0usize..200,
        ) {
            let mut store = RingStore::new(capacity).unwrap();
            for n in 0..appends {
                store.append(sample(n as i64));
            }
            prop_assert_eq!(store.len(), appends.min(capacity));
            prop_assert_eq!(store.overflowed(), appends > capacity);
            if appends > 0 {
                prop_assert_eq!(store.latest().unwrap().timestamp, appends as i64 - 1);
            }
        }

        #[test]
        fn prop_window_is_exact_retained_subset(
            capacity in 1usize..32,
            appends in 0usize..100,
            since in 0i64..100,
            len in 0i64..100,
        ) {
            let until = since + len;
            let mut store = RingStore::new(capacity).unwrap();
            for n in 0..appends {
                store.append(sample(n as i64));
            }

            // Expected: the retained (newest `capacity`) timestamps inside
            // the bounds, ascending.
            let first_retained = appends.saturating_sub(capacity) as i64;
            let expected: Vec<i64> = (first_retained..appends as i64)
                .filter(|ts| *ts >= since && *ts <= until)
                .collect();

            let actual: Vec<i64> = store.window(since, until).map(|s| s.timestamp).collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn prop_page_is_contiguous_newest_first(
            capacity in 1usize..32,
            appends in 0usize..100,
            offset in 0usize..40,
            limit in 1usize..20,
        ) {
            let mut store = RingStore::new(capacity).unwrap();
            for n in 0..appends {
                store.append(sample(n as i64));
            }

            let ts: Vec<i64> = store.page(offset, limit).map(|s| s.timestamp).collect();
            prop_assert!(ts.len() <= limit);
            for pair in ts.windows(2) {
                prop_assert_eq!(pair[0], pair[1] + 1);
            }
            if store.len() >= limit {
                // Clamping guarantees a full page whenever enough history exists
                prop_assert_eq!(ts.len(), limit);
            }
        }
    }
}
