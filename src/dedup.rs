/*
    AaruFormat
    https://github.com/dbalsom/fluxfox

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------
*/

//! The content-addressed deduplication store (C4): a `SHA-256(sector bytes) -> DDT entry` map
//! held in memory for the life of a [`Writer`](crate::writer::Writer) session (§4.4).
//!
//! Hashing (and therefore dedup lookup) only happens when `CreateOptions::deduplicate` is set, or
//! unconditionally for an all-zero sector — the all-zero case is cheap to detect without hashing
//! and the spec mandates it regardless of the option (§8 boundary case).

use std::collections::HashMap;

use crate::codec::digest;

/// The outcome of offering a sector to the dedup store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    /// Content already seen; reuse this DDT entry, no bytes need to be written.
    Hit(u64),
    /// New content; the caller must append it to the packer and then call
    /// [`DedupStore::insert`] with the entry it was assigned.
    Miss,
}

/// The in-memory `content hash -> DDT entry` map.
#[derive(Default)]
pub struct DedupStore {
    map: HashMap<[u8; 32], u64>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// True if `data` is all zero bytes — always deduplicated regardless of
    /// `CreateOptions::deduplicate` (§4.4, §8).
    pub fn is_all_zero(data: &[u8]) -> bool {
        data.iter().all(|&b| b == 0)
    }

    /// Look up `data` in the store. `deduplicate_enabled` gates hashing for non-zero sectors;
    /// all-zero sectors are always hashed and deduplicated.
    ///
    /// Returns `None` if hashing was skipped entirely (not deduplicated and not all-zero): the
    /// caller must always treat the sector as a miss without consulting or updating the store.
    pub fn lookup(&self, data: &[u8], deduplicate_enabled: bool) -> Option<DedupOutcome> {
        if !deduplicate_enabled && !Self::is_all_zero(data) {
            return None;
        }
        let hash = digest::sha256(data);
        match self.map.get(&hash) {
            Some(&entry) => Some(DedupOutcome::Hit(entry)),
            None => Some(DedupOutcome::Miss),
        }
    }

    /// Record that `data`'s content hash now maps to `entry`. Only call this after a
    /// [`DedupOutcome::Miss`]; hits never need re-insertion (§4.4 "On hit ... Return").
    pub fn insert(&mut self, data: &[u8], entry: u64) {
        let hash = digest::sha256(data);
        self.map.insert(hash, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_dedup_skips_non_zero_sectors() {
        let store = DedupStore::new();
        assert_eq!(store.lookup(&[1, 2, 3], false), None);
    }

    #[test]
    fn test_disabled_dedup_still_catches_all_zero() {
        let store = DedupStore::new();
        assert_eq!(store.lookup(&[0u8; 512], false), Some(DedupOutcome::Miss));
    }

    #[test]
    fn test_hit_after_insert() {
        let mut store = DedupStore::new();
        let sector = vec![0xAAu8; 512];
        assert_eq!(store.lookup(&sector, true), Some(DedupOutcome::Miss));
        store.insert(&sector, 0x1234);
        assert_eq!(store.lookup(&sector, true), Some(DedupOutcome::Hit(0x1234)));
    }

    #[test]
    fn test_distinct_content_misses() {
        let mut store = DedupStore::new();
        store.insert(&[1u8; 512], 1);
        assert_eq!(store.lookup(&[2u8; 512], true), Some(DedupOutcome::Miss));
    }
}
