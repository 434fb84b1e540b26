//! Category → pixel count tables

use std::collections::BTreeMap;

/// Mapping from category code to the number of pixels holding it.
///
/// Codes that were never seen count zero. Tables are only ever combined by
/// addition, so the tile tables of one raster sum to the table of the whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossTabulation {
    counts: BTreeMap<i64, u64>,
}

impl CrossTabulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for `code`, zero when absent
    pub fn get(&self, code: i64) -> u64 {
        self.counts.get(&code).copied().unwrap_or(0)
    }

    /// Add `count` pixels to `code`
    pub fn add(&mut self, code: i64, count: u64) {
        if count > 0 {
            *self.counts.entry(code).or_insert(0) += count;
        }
    }

    /// Fold another table into this one
    pub fn merge(&mut self, other: &CrossTabulation) {
        for (&code, &count) in &other.counts {
            self.add(code, count);
        }
    }

    /// Total pixels tabulated
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of distinct codes
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `(code, count)` pairs in ascending code order
    pub fn iter(&self) -> impl Iterator<Item = (i64, u64)> + '_ {
        self.counts.iter().map(|(&code, &count)| (code, count))
    }

    pub fn codes(&self) -> impl Iterator<Item = i64> + '_ {
        self.counts.keys().copied()
    }
}

impl FromIterator<(i64, u64)> for CrossTabulation {
    fn from_iter<I: IntoIterator<Item = (i64, u64)>>(iter: I) -> Self {
        let mut table = CrossTabulation::new();
        for (code, count) in iter {
            table.add(code, count);
        }
        table
    }
}
