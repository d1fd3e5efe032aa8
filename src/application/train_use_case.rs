// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Bucket the dev id files         (Layer 4 - data)
//   Step 2: Bucket the train id files       (Layer 4 - data)
//   Step 3: Save the run config             (Layer 6 - infra)
//   Step 4: Build or restore the model      (Layer 5 + 6)
//   Step 5: Run the training scheduler      (Layer 5 - ml)
//
// Also hosts the self-test: a tiny model trained for a few steps
// on a hard-coded data set, to check the whole stack runs.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use rand::Rng;

use crate::application::config::TranslateConfig;
use crate::data::bucketer::Bucketer;
use crate::domain::bucket::{DataSet, Example};
use crate::domain::error::TranslateResult;
use crate::domain::traits::{Persistable, TranslationModel};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::trainer::{TrainingScheduler, TrainingState};
use crate::ml::translator::{build_translator, TrainBackend};

/// Training steps taken by the self-test
const SELF_TEST_STEPS: usize = 5;

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TranslateConfig,
}

impl TrainUseCase {
    pub fn new(config: TranslateConfig) -> Self {
        Self { config }
    }

    /// Build the burn model and train it.
    pub fn execute(&self) -> Result<()> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);

        let model = build_translator::<TrainBackend>(&self.config, &device)?;
        self.train_model(model)?;
        Ok(())
    }

    /// Steps 1–5 for any model. Returns the scheduler's final state
    /// (only reached when `max_steps` is set).
    pub fn train_model<M>(&self, model: M) -> Result<TrainingState>
    where
        M: TranslationModel + Persistable,
    {
        let cfg = &self.config;

        // ── Steps 1–2: Bucket the data ────────────────────────────────────────
        let (dev, train) = self.read_data()?;

        // ── Step 3: Save config for decode / evaluate ─────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.train_dir);
        checkpoints.save_config(cfg)?;

        // ── Step 4: Fresh model or latest checkpoint ──────────────────────────
        let mut model = checkpoints.load_or_init(move || model)?;

        // ── Step 5: Train ─────────────────────────────────────────────────────
        let metrics = MetricsLogger::new(&cfg.train_dir)?;
        let mut scheduler = TrainingScheduler::new(cfg, &mut model, &checkpoints, cfg.rng())
            .with_metrics(&metrics);
        scheduler.run(&train, &dev)?;

        tracing::info!("Training stopped after {} steps", scheduler.state().current_step);
        Ok(scheduler.state().clone())
    }

    /// (dev, train) data sets, bucketed with the configured buckets.
    fn read_data(&self) -> Result<(DataSet, DataSet)> {
        let cfg = &self.config;
        let bucketer = Bucketer::new(&cfg.buckets);

        tracing::info!(
            "Reading development and training data (limit: {})",
            cfg.max_train_data_size
        );

        let (dev_src, dev_tgt) = cfg.ids_paths("dev");
        let dev = bucketer
            .read_files(&dev_src, &dev_tgt, None)
            .with_context(|| format!("Cannot read dev data '{}'", dev_src.display()))?;

        let (train_src, train_tgt) = cfg.ids_paths("train");
        let train = bucketer
            .read_files(&train_src, &train_tgt, cfg.max_train_lines())
            .with_context(|| format!("Cannot read train data '{}'", train_src.display()))?;

        tracing::info!("Train bucket sizes {:?} (total {})", train.sizes(), train.total());
        Ok((dev, train))
    }
}

// ─── Self-test ────────────────────────────────────────────────────────────────
/// Hard-coded pairs for the (3, 3) and (6, 6) buckets.
pub fn self_test_data() -> DataSet {
    let mut data = DataSet::with_buckets(2);
    data.push(0, Example::new(vec![1, 1], vec![2, 2]));
    data.push(0, Example::new(vec![3, 3], vec![4]));
    data.push(0, Example::new(vec![5], vec![6]));
    data.push(1, Example::new(vec![1, 1, 1, 1, 1], vec![2, 2, 2, 2, 2]));
    data.push(1, Example::new(vec![3, 3, 3], vec![5, 6]));
    data
}

/// Train `model` for a few steps on the self-test data, picking the
/// bucket uniformly. Returns the loss of every step.
pub fn run_self_test<M, R>(model: &mut M, rng: &mut R) -> TranslateResult<Vec<f64>>
where
    M: TranslationModel,
    R: Rng + ?Sized,
{
    let data = self_test_data();
    let mut losses = Vec::with_capacity(SELF_TEST_STEPS);
    for step in 0..SELF_TEST_STEPS {
        let bucket_id = rng.gen_range(0..data.bucket_count());
        let batch = model.get_batch(&data, bucket_id)?;
        let out = model.step(&batch, bucket_id, false)?;
        tracing::info!("self-test step {} bucket {} loss {:.4}", step + 1, bucket_id, out.loss);
        losses.push(out.loss);
    }
    Ok(losses)
}

/// Self-test on the real burn model.
pub fn self_test() -> Result<()> {
    tracing::info!("Self-test for neural translation model.");
    let cfg = TranslateConfig::self_test();
    let device = burn::backend::wgpu::WgpuDevice::default();
    let mut model = build_translator::<TrainBackend>(&cfg, &device)?;
    let losses = run_self_test(&mut model, &mut cfg.rng())?;
    anyhow::ensure!(
        losses.iter().all(|l| l.is_finite()),
        "self-test produced a non-finite loss: {losses:?}"
    );
    Ok(())
}
