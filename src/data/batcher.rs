// ============================================================
// Layer 4 — Bucket Batcher
// ============================================================
// Turns a handful of examples from ONE bucket into a padded,
// time-major batch. Every TranslationModel implementation uses
// this builder, so training, evaluation and decoding all see
// exactly the same layout.
//
// For a bucket (S, T) and batch_size N:
//
//   encoder_inputs  — S rows of N ids
//                     source padded with PAD to S, then REVERSED
//                     (the last real word sits next to the decoder)
//   decoder_inputs  — T rows of N ids
//                     [GO] + target, padded with PAD to T
//   target_weights  — T rows of N weights
//                     0.0 where the next decoder input is PAD, and
//                     always 0.0 on the last row (nothing follows it)
//
// Time-major means row i holds position i of every example:
//
//   batch-major [[a1 a2 a3], [b1 b2 b3]]
//   time-major  [[a1 b1], [a2 b2], [a3 b3]]
//
// Examples are drawn uniformly WITH replacement, so a bucket
// holding a single example always yields that example.
//
// Reference: Sutskever et al. (2014), reversing source sentences

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::bucket::{Bucket, DataSet};
use crate::domain::error::{TranslateError, TranslateResult};
use crate::domain::tokens::{GO_ID, PAD_ID};

/// A padded, time-major batch for one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// `[source_position][batch]`
    pub encoder_inputs: Vec<Vec<u32>>,

    /// `[target_position][batch]`
    pub decoder_inputs: Vec<Vec<u32>>,

    /// `[target_position][batch]`, 1.0 for real targets, 0.0 for padding
    pub target_weights: Vec<Vec<f32>>,
}

impl Batch {
    pub fn batch_size(&self) -> usize {
        self.encoder_inputs.first().map_or(0, Vec::len)
    }

    pub fn source_len(&self) -> usize {
        self.encoder_inputs.len()
    }

    pub fn target_len(&self) -> usize {
        self.decoder_inputs.len()
    }

    /// Training targets: the decoder input one position ahead, or
    /// PAD wherever the weight is zero. `[target_position][batch]`.
    pub fn targets(&self) -> Vec<Vec<u32>> {
        let t = self.target_len();
        (0..t)
            .map(|pos| {
                (0..self.batch_size())
                    .map(|b| {
                        if pos + 1 < t && self.target_weights[pos][b] > 0.0 {
                            self.decoder_inputs[pos + 1][b]
                        } else {
                            PAD_ID
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

/// Draw `batch_size` examples from `bucket_id` and lay them out.
pub fn build_batch<R: Rng + ?Sized>(
    buckets:    &[Bucket],
    batch_size: usize,
    data:       &DataSet,
    bucket_id:  usize,
    rng:        &mut R,
) -> TranslateResult<Batch> {
    let bucket = buckets.get(bucket_id).ok_or(TranslateError::UnknownBucket {
        bucket_id,
        buckets: buckets.len(),
    })?;
    let examples = data
        .bucket(bucket_id)
        .filter(|b| !b.is_empty())
        .ok_or(TranslateError::EmptyBucket { bucket_id })?;

    let (enc_size, dec_size) = (bucket.max_source_length, bucket.max_target_length);

    // ── Batch-major rows ──────────────────────────────────────────────────────
    let mut enc_rows: Vec<Vec<u32>> = Vec::with_capacity(batch_size);
    let mut dec_rows: Vec<Vec<u32>> = Vec::with_capacity(batch_size);

    for _ in 0..batch_size {
        let example = examples.choose(rng).ok_or(TranslateError::EmptyBucket { bucket_id })?;

        let mut enc: Vec<u32> = example.source.iter().copied().take(enc_size).collect();
        enc.resize(enc_size, PAD_ID);
        enc.reverse();
        enc_rows.push(enc);

        let mut dec = Vec::with_capacity(dec_size);
        dec.push(GO_ID);
        dec.extend(example.target.iter().copied());
        dec.truncate(dec_size);
        dec.resize(dec_size, PAD_ID);
        dec_rows.push(dec);
    }

    // ── Re-index to time-major ────────────────────────────────────────────────
    let encoder_inputs: Vec<Vec<u32>> = (0..enc_size)
        .map(|pos| enc_rows.iter().map(|row| row[pos]).collect())
        .collect();

    let decoder_inputs: Vec<Vec<u32>> = (0..dec_size)
        .map(|pos| dec_rows.iter().map(|row| row[pos]).collect())
        .collect();

    let target_weights: Vec<Vec<f32>> = (0..dec_size)
        .map(|pos| {
            dec_rows
                .iter()
                .map(|row| {
                    let is_last = pos + 1 == dec_size;
                    if is_last || row[pos + 1] == PAD_ID { 0.0 } else { 1.0 }
                })
                .collect()
        })
        .collect();

    Ok(Batch { encoder_inputs, decoder_inputs, target_weights })
}
