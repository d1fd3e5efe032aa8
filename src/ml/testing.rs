// Scripted stand-in for the network, used by scheduler, decoder and
// checkpoint tests. Losses and decoded ids are fed in by the test;
// every call is recorded for later assertions.

use std::collections::VecDeque;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::data::batcher::{build_batch, Batch};
use crate::domain::bucket::{Bucket, DataSet};
use crate::domain::error::{TranslateError, TranslateResult};
use crate::domain::tokens::EOS_ID;
use crate::domain::traits::{CheckpointState, Persistable, StepOutput, TranslationModel};

pub struct ScriptedModel {
    pub buckets:       Vec<Bucket>,
    pub batch_size:    usize,
    pub global_step:   u64,
    pub learning_rate: f64,
    pub decay_factor:  f64,
    /// Returned by successive training steps; 1.0 once exhausted
    pub train_losses:  VecDeque<f64>,
    pub eval_loss:     f64,
    /// Ids the next forward-only steps decode to, one script per call
    pub decode_script: VecDeque<Vec<u32>>,
    pub target_vocab:  usize,
    /// (bucket_id, forward_only) of every step call
    pub steps:         Vec<(usize, bool)>,
    /// Every batch handed to step
    pub batches:       Vec<Batch>,
    pub decays:        usize,
    pub restored_from: Option<CheckpointState>,
    rng:               StdRng,
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self {
            buckets:       vec![Bucket::new(6, 2)],
            batch_size:    4,
            global_step:   0,
            learning_rate: 0.5,
            decay_factor:  0.5,
            train_losses:  VecDeque::new(),
            eval_loss:     1.0,
            decode_script: VecDeque::new(),
            target_vocab:  16,
            steps:         Vec::new(),
            batches:       Vec::new(),
            decays:        0,
            restored_from: None,
            rng:           StdRng::seed_from_u64(11),
        }
    }
}

impl ScriptedModel {
    pub fn with_buckets(buckets: Vec<Bucket>) -> Self {
        Self { buckets, ..Self::default() }
    }

    /// One score row per position whose arg-max is the scripted id.
    fn scores_for(&self, ids: &[u32], positions: usize) -> Vec<Vec<Vec<f32>>> {
        (0..positions)
            .map(|pos| {
                let winner = ids.get(pos).copied().unwrap_or(EOS_ID) as usize;
                let width = self.target_vocab.max(winner + 1);
                let mut row = vec![0.0f32; width];
                row[winner] = 1.0;
                vec![row]
            })
            .collect()
    }
}

impl TranslationModel for ScriptedModel {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size;
    }

    fn global_step(&self) -> u64 {
        self.global_step
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn decay_learning_rate(&mut self) {
        self.learning_rate *= self.decay_factor;
        self.decays += 1;
    }

    fn get_batch(&mut self, data: &DataSet, bucket_id: usize) -> TranslateResult<Batch> {
        build_batch(&self.buckets, self.batch_size, data, bucket_id, &mut self.rng)
    }

    fn step(&mut self, batch: &Batch, bucket_id: usize, forward_only: bool) -> TranslateResult<StepOutput> {
        self.steps.push((bucket_id, forward_only));
        self.batches.push(batch.clone());

        if forward_only {
            let ids = self.decode_script.pop_front().unwrap_or_default();
            return Ok(StepOutput {
                gradient_norm: None,
                loss:          self.eval_loss,
                output_logits: Some(self.scores_for(&ids, batch.target_len())),
            });
        }

        self.global_step += 1;
        Ok(StepOutput {
            gradient_norm: Some(1.0),
            loss:          self.train_losses.pop_front().unwrap_or(1.0),
            output_logits: None,
        })
    }
}

impl Persistable for ScriptedModel {
    fn save(&self, stem: &Path) -> TranslateResult<()> {
        let body = serde_json::json!({ "global_step": self.global_step });
        std::fs::write(stem, body.to_string())?;
        Ok(())
    }

    fn restore(&mut self, state: &CheckpointState) -> TranslateResult<()> {
        let text = std::fs::read_to_string(&state.stem)?;
        serde_json::from_str::<serde_json::Value>(&text).map_err(|e| {
            TranslateError::CheckpointLoad { path: state.stem.clone(), reason: e.to_string() }
        })?;
        self.global_step = state.global_step;
        self.learning_rate = state.learning_rate;
        self.restored_from = Some(state.clone());
        Ok(())
    }
}
