//! Fixed-bucket histogram for freeze and judder distributions.
//!
//! Each bucket is identified by its inclusive upper bound; a value lands in the
//! first bucket whose bound is greater than or equal to it, and anything past
//! the last bound lands in the last bucket. Besides bucket counts the
//! histogram keeps the raw sum, count, min and max of everything inserted, so
//! averages and rates are exact rather than reconstructed from buckets.

use serde::{Deserialize, Serialize};

/// A counting histogram with a running sum of raw values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    boundaries: Vec<i64>,
    bucket_counts: Vec<u64>,
    sum: i64,
    count: u64,
    min: Option<i64>,
    max: Option<i64>,
}

impl Histogram {
    /// Create a histogram with the given ascending bucket upper bounds.
    pub fn new(boundaries: &[i64]) -> Self {
        let mut histogram = Self::default();
        histogram.setup(boundaries);
        histogram
    }

    /// Install new bucket boundaries and drop everything recorded so far.
    ///
    /// An empty boundary list yields a single catch-all bucket.
    pub fn setup(&mut self, boundaries: &[i64]) {
        self.boundaries = boundaries.to_vec();
        self.bucket_counts = vec![0; boundaries.len().max(1)];
        self.sum = 0;
        self.count = 0;
        self.min = None;
        self.max = None;
    }

    /// Reset all counts while keeping the bucket boundaries.
    pub fn clear(&mut self) {
        self.bucket_counts.iter_mut().for_each(|c| *c = 0);
        self.sum = 0;
        self.count = 0;
        self.min = None;
        self.max = None;
    }

    /// Record a value.
    pub fn insert(&mut self, value: i64) {
        let bucket_idx = self
            .boundaries
            .iter()
            .position(|&b| value <= b)
            .unwrap_or(self.bucket_counts.len() - 1);
        self.bucket_counts[bucket_idx] += 1;

        self.sum = self.sum.saturating_add(value);
        self.count += 1;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.bucket_counts.len()
    }

    /// Count recorded in the bucket at `index`, if it exists.
    pub fn bucket(&self, index: usize) -> Option<u64> {
        self.bucket_counts.get(index).copied()
    }

    /// Per-bucket counts in ascending bucket order.
    pub fn bucket_counts(&self) -> &[u64] {
        &self.bucket_counts
    }

    /// Bucket upper bounds.
    pub fn boundaries(&self) -> &[i64] {
        &self.boundaries
    }

    /// Iterate `(upper bound, count)` pairs. The last bucket also holds
    /// everything above its bound; without boundaries the single catch-all
    /// bucket is reported with a bound of `i64::MAX`.
    pub fn buckets(&self) -> impl Iterator<Item = (i64, u64)> + '_ {
        self.boundaries
            .iter()
            .copied()
            .chain(std::iter::repeat(i64::MAX))
            .zip(self.bucket_counts.iter().copied())
    }

    /// Sum of all raw inserted values.
    pub fn sum(&self) -> i64 {
        self.sum
    }

    /// Number of inserted values.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Smallest inserted value.
    pub fn min(&self) -> Option<i64> {
        self.min
    }

    /// Largest inserted value.
    pub fn max(&self) -> Option<i64> {
        self.max
    }

    /// Integer average of inserted values.
    pub fn average(&self) -> Option<i64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as i64)
        }
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Compact telemetry form: bucket counts joined by commas, e.g. `"2,3,3"`.
    pub fn emit(&self) -> String {
        self.bucket_counts
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Severity score over the buckets.
    ///
    /// For each bucket `i` the counts of bucket `i` and every bucket above it
    /// are divided by `weights[i]` and accumulated, so a long freeze counts
    /// toward every shorter threshold as well. Returns zero when `weights`
    /// does not have one entry per bucket; zero weights contribute nothing.
    pub fn weighted_suffix_score(&self, weights: &[i64]) -> i64 {
        if weights.len() != self.bucket_counts.len() {
            return 0;
        }
        let mut score = 0i64;
        let mut suffix = 0i64;
        for (count, &weight) in self.bucket_counts.iter().zip(weights).rev() {
            suffix += *count as i64;
            if weight != 0 {
                score += suffix / weight;
            }
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_consistent(h: &Histogram) {
        assert_eq!(h.bucket_counts().iter().sum::<u64>(), h.count());
        assert_eq!(h.buckets().map(|(_, c)| c).sum::<u64>(), h.count());
    }

    #[test]
    fn test_insert_lands_in_first_bound_at_or_above() {
        let mut h = Histogram::new(&[10, 20, 30]);
        h.insert(5);
        h.insert(10);
        h.insert(11);
        h.insert(30);
        assert_eq!(h.bucket_counts(), &[2, 1, 1]);
        assert_consistent(&h);
    }

    #[test]
    fn test_values_above_last_bound_go_to_last_bucket() {
        let mut h = Histogram::new(&[10, 20]);
        h.insert(500);
        h.insert(21);
        assert_eq!(h.bucket_counts(), &[0, 2]);
        assert_eq!(h.emit(), "0,2");
    }

    #[test]
    fn test_sum_count_min_max() {
        let mut h = Histogram::new(&[1, 4, 5]);
        for v in [7, 6, 12, 4] {
            h.insert(v);
        }
        assert_eq!(h.sum(), 29);
        assert_eq!(h.count(), 4);
        assert_eq!(h.min(), Some(4));
        assert_eq!(h.max(), Some(12));
        assert_eq!(h.average(), Some(7));
        assert_consistent(&h);
    }

    #[test]
    fn test_empty_histogram() {
        let h = Histogram::new(&[1, 2]);
        assert!(h.is_empty());
        assert_eq!(h.average(), None);
        assert_eq!(h.min(), None);
        assert_eq!(h.emit(), "0,0");
    }

    #[test]
    fn test_clear_keeps_boundaries() {
        let mut h = Histogram::new(&[1, 2]);
        h.insert(2);
        h.clear();
        assert!(h.is_empty());
        assert_eq!(h.boundaries(), &[1, 2]);
        assert_eq!(h.bucket_count(), 2);
        assert_eq!(h, Histogram::new(&[1, 2]));
    }

    #[test]
    fn test_no_boundaries_uses_single_bucket() {
        let mut h = Histogram::new(&[]);
        h.insert(42);
        assert_eq!(h.bucket_count(), 1);
        assert_consistent(&h);
        let pairs: Vec<_> = h.buckets().collect();
        assert_eq!(pairs, vec![(i64::MAX, 1)]);
    }

    #[test]
    fn test_weighted_suffix_score() {
        let mut h = Histogram::new(&[10, 20, 30]);
        h.insert(5);
        h.insert(25);
        h.insert(100);
        // suffixes: bucket0 = 3, bucket1 = 2, bucket2 = 1
        assert_eq!(h.weighted_suffix_score(&[1, 1, 1]), 6);
        assert_eq!(h.weighted_suffix_score(&[3, 2, 2]), 2);
        assert_eq!(h.weighted_suffix_score(&[0, 1, 1]), 3);
    }

    #[test]
    fn test_weighted_suffix_score_length_mismatch() {
        let mut h = Histogram::new(&[10, 20, 30]);
        h.insert(5);
        assert_eq!(h.weighted_suffix_score(&[1, 1]), 0);
        assert_eq!(h.weighted_suffix_score(&[]), 0);
    }

    #[test]
    fn test_buckets_iter() {
        let mut h = Histogram::new(&[10, 20]);
        h.insert(15);
        let pairs: Vec<_> = h.buckets().collect();
        assert_eq!(pairs, vec![(10, 0), (20, 1)]);
    }
}
