// ============================================================
// Layer 3 — Buckets, Examples and DataSets
// ============================================================
// The vocabulary of the data pipeline:
//
//   Bucket   — a (max_source_length, max_target_length) pair.
//              Examples are padded up to their bucket's bounds,
//              so short sentences never pay for long ones.
//   Example  — one aligned (source ids, target ids) pair.
//   DataSet  — one ordered list of Examples per bucket, indexed
//              in the same order as the configured bucket list.
//
// The bucket list is fixed at startup. Its ORDER matters:
// assignment is first-match, and the training sampler builds
// its cumulative distribution in this order.
//
// Reference: Rust Book §5 (Structs), §8 (Vectors)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A length-range category used to batch examples of similar size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub max_source_length: usize,
    pub max_target_length: usize,
}

impl Bucket {
    pub const fn new(max_source_length: usize, max_target_length: usize) -> Self {
        Self { max_source_length, max_target_length }
    }

    /// Training-side fit test: both lengths strictly below the bounds,
    /// which leaves one slot free for the GO / end marker.
    pub fn fits(&self, source_len: usize, target_len: usize) -> bool {
        source_len < self.max_source_length && target_len < self.max_target_length
    }
}

/// `SRC:TGT`, e.g. `6:2`, as given to the `--bucket` flag.
impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (src, tgt) = s
            .split_once(':')
            .ok_or_else(|| format!("bucket '{s}' must look like SRC:TGT"))?;
        let src = src.trim().parse::<usize>()
            .map_err(|e| format!("bad source length in '{s}': {e}"))?;
        let tgt = tgt.trim().parse::<usize>()
            .map_err(|e| format!("bad target length in '{s}': {e}"))?;
        Ok(Self::new(src, tgt))
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.max_source_length, self.max_target_length)
    }
}

/// Index of the first bucket an example fits into, if any.
pub fn assign_bucket(buckets: &[Bucket], source_len: usize, target_len: usize) -> Option<usize> {
    buckets.iter().position(|b| b.fits(source_len, target_len))
}

/// Index of the bucket used at inference time: the smallest bucket
/// whose source bound is strictly greater than the input length.
pub fn inference_bucket(buckets: &[Bucket], source_len: usize) -> Option<usize> {
    buckets.iter().position(|b| b.max_source_length > source_len)
}

// ─── Example ──────────────────────────────────────────────────────────────────
/// One aligned training pair of token-id sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub source: Vec<u32>,
    pub target: Vec<u32>,
}

impl Example {
    pub fn new(source: Vec<u32>, target: Vec<u32>) -> Self {
        Self { source, target }
    }
}

// ─── DataSet ──────────────────────────────────────────────────────────────────
/// Examples grouped by bucket index. Insertion order within a bucket
/// is preserved and nothing is deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSet {
    buckets: Vec<Vec<Example>>,
}

impl DataSet {
    /// An empty data set with one slot per bucket.
    pub fn with_buckets(bucket_count: usize) -> Self {
        Self { buckets: vec![Vec::new(); bucket_count] }
    }

    /// A data set holding exactly one example in `bucket_id`, used to
    /// feed a single sentence through the model at decode time.
    pub fn single(bucket_count: usize, bucket_id: usize, example: Example) -> Self {
        let mut set = Self::with_buckets(bucket_count.max(bucket_id + 1));
        set.buckets[bucket_id].push(example);
        set
    }

    pub fn push(&mut self, bucket_id: usize, example: Example) {
        self.buckets[bucket_id].push(example);
    }

    pub fn bucket(&self, bucket_id: usize) -> Option<&[Example]> {
        self.buckets.get(bucket_id).map(Vec::as_slice)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of examples per bucket, in bucket order.
    pub fn sizes(&self) -> Vec<usize> {
        self.buckets.iter().map(Vec::len).collect()
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        let buckets = [Bucket::new(5, 10), Bucket::new(10, 15)];
        assert_eq!(assign_bucket(&buckets, 3, 4), Some(0));
        assert_eq!(assign_bucket(&buckets, 6, 4), Some(1));
    }

    #[test]
    fn test_bounds_are_strict() {
        let buckets = [Bucket::new(5, 10)];
        // Equal to the bound does not fit
        assert_eq!(assign_bucket(&buckets, 5, 2), None);
        assert_eq!(assign_bucket(&buckets, 2, 10), None);
        assert_eq!(assign_bucket(&buckets, 4, 9), Some(0));
    }

    #[test]
    fn test_inference_bucket_uses_greater_than() {
        let buckets = [Bucket::new(6, 2), Bucket::new(10, 5)];
        assert_eq!(inference_bucket(&buckets, 5), Some(0));
        assert_eq!(inference_bucket(&buckets, 6), Some(1));
        assert_eq!(inference_bucket(&buckets, 10), None);
    }

    #[test]
    fn test_parse_and_display() {
        let b: Bucket = "6:2".parse().unwrap();
        assert_eq!(b, Bucket::new(6, 2));
        assert_eq!(b.to_string(), "6:2");
        assert!("6x2".parse::<Bucket>().is_err());
        assert!("a:2".parse::<Bucket>().is_err());
    }

    #[test]
    fn test_single_example_set() {
        let set = DataSet::single(2, 1, Example::new(vec![4, 5], vec![]));
        assert_eq!(set.sizes(), vec![0, 1]);
        assert_eq!(set.total(), 1);
    }
}
