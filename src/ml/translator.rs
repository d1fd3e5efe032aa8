// ============================================================
// Layer 5 — Burn Translator
// ============================================================
// The TranslationModel + Persistable implementation on top of
// TranslatorNet.
//
// Key Burn 0.20 points:
//   - Training runs on TrainBackend (Autodiff<Wgpu>)
//   - Forward-only steps use net.valid(): the same weights on the
//     inner backend, no autodiff graph, dropout off
//   - optim.step() takes the module by value and hands back the
//     updated one
//   - Batches arrive time-major and are transposed to the
//     batch-major [batch, len] tensors the net expects
//
// Optimiser: plain SGD with global-norm gradient clipping, stepped
// with the current (decaying) learning rate.
//
// Reference: Burn Book §5 (Training), §7 (Records)

use std::path::{Path, PathBuf};

use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use rand::rngs::StdRng;

use crate::application::config::TranslateConfig;
use crate::data::batcher::{build_batch, Batch};
use crate::domain::bucket::{Bucket, DataSet};
use crate::domain::error::{TranslateError, TranslateResult};
use crate::domain::traits::{CheckpointState, Persistable, PositionScores, StepOutput, TranslationModel};
use crate::ml::model::{TranslatorNet, TranslatorNetConfig};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

pub struct BurnTranslator<B: AutodiffBackend, O> {
    net:               TranslatorNet<B>,
    optim:             O,
    device:            B::Device,
    buckets:           Vec<Bucket>,
    batch_size:        usize,
    learning_rate:     f64,
    decay_factor:      f64,
    global_step:       u64,
    source_vocab_size: usize,
    target_vocab_size: usize,
    rng:               StdRng,
}

/// Build a freshly initialised translator for `cfg`.
pub fn build_translator<B: AutodiffBackend>(
    cfg:    &TranslateConfig,
    device: &B::Device,
) -> TranslateResult<BurnTranslator<B, impl Optimizer<TranslatorNet<B>, B>>> {
    if cfg.buckets.is_empty() {
        return Err(TranslateError::model("no buckets configured"));
    }
    if cfg.num_heads == 0 || cfg.size % cfg.num_heads != 0 {
        return Err(TranslateError::model(format!(
            "size {} is not divisible into {} attention heads", cfg.size, cfg.num_heads
        )));
    }

    let max_source_len = cfg.buckets.iter().map(|b| b.max_source_length).max().unwrap_or(1);
    let max_target_len = cfg.buckets.iter().map(|b| b.max_target_length).max().unwrap_or(1);

    let net_cfg = TranslatorNetConfig::new(
        cfg.source_vocab_size, cfg.target_vocab_size,
        max_source_len.max(1), max_target_len.max(1),
        cfg.size, cfg.num_heads, cfg.num_layers, cfg.size * 4,
    );
    let net: TranslatorNet<B> = net_cfg.init(device);

    let optim = SgdConfig::new()
        .with_gradient_clipping(Some(GradientClippingConfig::Norm(cfg.max_gradient_norm as f32)))
        .init();

    tracing::info!(
        "Creating {} layers of {} units ({} heads), buckets {:?}",
        cfg.num_layers, cfg.size, cfg.num_heads, cfg.buckets
    );

    Ok(BurnTranslator {
        net,
        optim,
        device:            device.clone(),
        buckets:           cfg.buckets.clone(),
        batch_size:        cfg.batch_size,
        learning_rate:     cfg.learning_rate,
        decay_factor:      cfg.learning_rate_decay_factor,
        global_step:       0,
        source_vocab_size: cfg.source_vocab_size,
        target_vocab_size: cfg.target_vocab_size,
        rng:               cfg.rng(),
    })
}

impl<B: AutodiffBackend, O> BurnTranslator<B, O> {
    /// Embedding lookups past the table would panic inside the backend.
    fn check_ids(&self, batch: &Batch) -> TranslateResult<()> {
        let out_of_range = |rows: &[Vec<u32>], size: usize| {
            rows.iter().flatten().copied().find(|&id| id as usize >= size)
        };
        if let Some(id) = out_of_range(&batch.encoder_inputs, self.source_vocab_size) {
            return Err(TranslateError::model(format!(
                "source id {id} outside vocabulary of {}", self.source_vocab_size
            )));
        }
        if let Some(id) = out_of_range(&batch.decoder_inputs, self.target_vocab_size) {
            return Err(TranslateError::model(format!(
                "target id {id} outside vocabulary of {}", self.target_vocab_size
            )));
        }
        Ok(())
    }
}

/// Time-major `[pos][batch]` ids → batch-major `[batch, pos]` tensor.
fn batch_major<K: Backend>(rows: &[Vec<u32>], device: &K::Device) -> Tensor<K, 2, Int> {
    let len = rows.len();
    let batch = rows.first().map_or(0, Vec::len);
    let flat: Vec<i32> = (0..batch)
        .flat_map(|b| rows.iter().map(move |row| row[b] as i32))
        .collect();
    Tensor::<K, 1, Int>::from_ints(flat.as_slice(), device).reshape([batch, len])
}

/// logits `[batch, T, V]` → `[T][batch][V]`
fn position_scores<K: Backend>(logits: Tensor<K, 3>) -> TranslateResult<Vec<PositionScores>> {
    let [batch, positions, vocab] = logits.dims();
    let flat: Vec<f32> = logits
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| TranslateError::model(format!("cannot read logits: {e:?}")))?;

    Ok((0..positions)
        .map(|p| {
            (0..batch)
                .map(|b| {
                    let start = (b * positions + p) * vocab;
                    flat[start..start + vocab].to_vec()
                })
                .collect()
        })
        .collect())
}

impl<B, O> TranslationModel for BurnTranslator<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TranslatorNet<B>, B>,
{
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
    }

    fn get_batch(&mut self, data: &DataSet, bucket_id: usize) -> TranslateResult<Batch> {
        build_batch(&self.buckets, self.batch_size, data, bucket_id, &mut self.rng)
    }

    fn step(&mut self, batch: &Batch, bucket_id: usize, forward_only: bool) -> TranslateResult<StepOutput> {
        if bucket_id >= self.buckets.len() {
            return Err(TranslateError::UnknownBucket { bucket_id, buckets: self.buckets.len() });
        }
        self.check_ids(batch)?;
        let target_len = batch.target_len();

        if forward_only {
            let net = self.net.valid();
            let source  = batch_major::<B::InnerBackend>(&batch.encoder_inputs, &self.device);
            let targets = batch_major::<B::InnerBackend>(&batch.targets(), &self.device);
            let (loss, logits) = net.forward_loss(source, target_len, targets);
            return Ok(StepOutput {
                gradient_norm: None,
                loss:          loss.into_scalar().elem::<f64>(),
                output_logits: Some(position_scores(logits)?),
            });
        }

        let source  = batch_major::<B>(&batch.encoder_inputs, &self.device);
        let targets = batch_major::<B>(&batch.targets(), &self.device);
        let (loss, _) = self.net.forward_loss(source, target_len, targets);
        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

        let grads = GradientsParams::from_grads(loss.backward(), &self.net);
        self.net = self.optim.step(self.learning_rate, self.net.clone(), grads);
        self.global_step += 1;

        tracing::debug!("step {} bucket {} loss {:.4}", self.global_step, bucket_id, loss_val);
        Ok(StepOutput { gradient_norm: None, loss: loss_val, output_logits: None })
    }
}

impl<B, O> Persistable for BurnTranslator<B, O>
where
    B: AutodiffBackend,
{
    /// The recorder appends its own extension to the stem.
    fn checkpoint_file(&self, stem: &Path) -> PathBuf {
        stem.with_extension(<CompactRecorder as FileRecorder<B>>::file_extension())
    }

    fn save(&self, stem: &Path) -> TranslateResult<()> {
        CompactRecorder::new()
            .record(self.net.clone().into_record(), stem.to_path_buf())
            .map_err(|e| TranslateError::CheckpointSave {
                path:   stem.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn restore(&mut self, state: &CheckpointState) -> TranslateResult<()> {
        let record = CompactRecorder::new()
            .load(state.stem.clone(), &self.device)
            .map_err(|e| TranslateError::CheckpointLoad {
                path:   self.checkpoint_file(&state.stem),
                reason: e.to_string(),
            })?;
        self.net = self.net.clone().load_record(record);
        self.global_step = state.global_step;
        self.learning_rate = state.learning_rate;
        Ok(())
    }
}
