// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The scheduler, the decoder and the checkpoint manager never
// see a concrete network. They talk to these two traits:
//
//   TranslationModel — batching + one optimisation / inference step
//   Persistable      — saving and restoring parameters
//
// The burn-backed implementation lives in Layer 5 (ml).
// Tests plug in a scripted fake instead, so the whole control
// flow is testable without a GPU.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::batcher::Batch;
use crate::domain::bucket::DataSet;
use crate::domain::error::TranslateResult;

/// Scores for one decoder position: one row of class scores per
/// batch element, `[batch][target_vocab]`.
pub type PositionScores = Vec<Vec<f32>>;

/// What a single `step` call produces.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    /// Global gradient norm, when the implementation computes one
    pub gradient_norm: Option<f64>,

    /// Mean loss over the batch
    pub loss: f64,

    /// Per-position output scores; only filled in forward-only steps
    pub output_logits: Option<Vec<PositionScores>>,
}

// ─── TranslationModel ─────────────────────────────────────────────────────────
/// A bucketed sequence-to-sequence model.
pub trait TranslationModel {
    /// Number of examples drawn per `get_batch` call
    fn batch_size(&self) -> usize;

    fn set_batch_size(&mut self, batch_size: usize);

    /// Number of training steps taken so far
    fn global_step(&self) -> u64;

    fn learning_rate(&self) -> f64;

    /// Multiply the learning rate by the model's decay factor.
    fn decay_learning_rate(&mut self);

    /// Draw a batch from `bucket_id` of `data`.
    fn get_batch(&mut self, data: &DataSet, bucket_id: usize) -> TranslateResult<Batch>;

    /// Run one step. With `forward_only` the parameters are left
    /// untouched and the output scores are returned.
    fn step(
        &mut self,
        batch:        &Batch,
        bucket_id:    usize,
        forward_only: bool,
    ) -> TranslateResult<StepOutput>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Identity of a saved checkpoint, written to the pointer file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub global_step:   u64,
    pub learning_rate: f64,
    /// Path stem handed to `Persistable::save`
    pub stem:          PathBuf,
}

/// A model whose parameters can be written to and read from disk.
pub trait Persistable {
    /// The file that `save(stem)` produces. Implementations whose
    /// serializer appends an extension override this.
    fn checkpoint_file(&self, stem: &Path) -> PathBuf {
        stem.to_path_buf()
    }

    fn save(&self, stem: &Path) -> TranslateResult<()>;

    /// Restore parameters, step counter and learning rate.
    fn restore(&mut self, state: &CheckpointState) -> TranslateResult<()>;
}
