// ============================================================
// Layer 4 — Bucketer
// ============================================================
// Reads two aligned token-id files and sorts each line pair
// into the first bucket it fits.
//
// Input format (both files):
//   one sentence per line, whitespace-separated integer ids.
//   Line n of the source file is translated by line n of the
//   target file.
//
//   source:  "12 7 9"        target: "4 5"
//            "3 3 3 3 3 3 3"         "8"
//
// With buckets [(5, 10), (10, 15)]:
//   line 1 → bucket 0   (3 < 5  and 2 < 10)
//   line 2 → bucket 1   (7 < 10 and 1 < 15)
//
// Reading stops at the end of the SHORTER file, or after
// max_lines pairs when a limit is set. Pairs that fit no
// bucket are dropped silently; a malformed token is fatal.
//
// Reference: Rust Book §9 (Error Handling), §12 (I/O)

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::domain::bucket::{assign_bucket, Bucket, DataSet, Example};
use crate::domain::error::{TranslateError, TranslateResult};

/// How often the progress callback fires
pub const PROGRESS_INTERVAL: usize = 100_000;

pub struct Bucketer<'a> {
    buckets: &'a [Bucket],
}

impl<'a> Bucketer<'a> {
    pub fn new(buckets: &'a [Bucket]) -> Self {
        Self { buckets }
    }

    /// Bucket two aligned streams. `max_lines` of `None` or `Some(0)`
    /// reads everything. `progress` receives the running line count
    /// every PROGRESS_INTERVAL lines.
    pub fn bucketize<S, T, F>(
        &self,
        source:    S,
        target:    T,
        max_lines: Option<usize>,
        mut progress: F,
    ) -> TranslateResult<DataSet>
    where
        S: BufRead,
        T: BufRead,
        F: FnMut(usize),
    {
        let limit = max_lines.filter(|&n| n > 0);
        let mut data_set = DataSet::with_buckets(self.buckets.len());

        let mut source_lines = source.lines();
        let mut target_lines = target.lines();
        let mut counter = 0usize;

        loop {
            if limit.is_some_and(|max| counter >= max) {
                break;
            }
            // zip-like: stop as soon as either side runs dry
            let (src, tgt) = match (source_lines.next(), target_lines.next()) {
                (Some(s), Some(t)) => (s?, t?),
                _ => break,
            };

            counter += 1;
            if counter % PROGRESS_INTERVAL == 0 {
                progress(counter);
            }

            let source_ids = parse_ids(&src, "source", counter)?;
            let target_ids = parse_ids(&tgt, "target", counter)?;

            if let Some(bucket_id) = assign_bucket(self.buckets, source_ids.len(), target_ids.len()) {
                data_set.push(bucket_id, Example::new(source_ids, target_ids));
            }
        }

        tracing::debug!(
            "Bucketed {} of {} line pairs: {:?}",
            data_set.total(),
            counter,
            data_set.sizes()
        );
        Ok(data_set)
    }

    /// Open two id files and bucket them, logging progress.
    pub fn read_files(
        &self,
        source_path: &Path,
        target_path: &Path,
        max_lines:   Option<usize>,
    ) -> TranslateResult<DataSet> {
        let source = BufReader::new(File::open(source_path)?);
        let target = BufReader::new(File::open(target_path)?);
        self.bucketize(source, target, max_lines, |n| {
            tracing::info!("  reading data line {}", n);
        })
    }
}

/// Parse one whitespace-separated line of token ids.
fn parse_ids(line: &str, stream: &'static str, line_no: usize) -> TranslateResult<Vec<u32>> {
    line.split_whitespace()
        .map(|tok| {
            tok.parse::<u32>().map_err(|_| TranslateError::Parse {
                stream,
                line:  line_no,
                token: tok.to_string(),
            })
        })
        .collect()
}
