// ============================================================
// Layer 5 — Training Scheduler
// ============================================================
// Drives the training loop over a bucketed data set.
//
// Every iteration:
//   1. pick a bucket at random, weighted by how many examples
//      it holds (BucketSampler)
//   2. draw a batch from it and take one training step
//   3. fold step time and loss into running averages
//
// Every `steps_per_checkpoint` iterations:
//   4. report perplexity of the averaged loss
//   5. decay the learning rate if the loss is worse than each
//      of the last three checkpoints
//   6. save a checkpoint, reset the averages
//   7. run one forward-only pass per bucket of the dev set
//
// The loop has no natural end: it runs until the process is
// stopped, unless `max_steps` is set.
//
// Reference: Sutskever et al. (2014), Bahdanau et al. (2015)

use std::time::Instant;

use rand::Rng;

use crate::application::config::TranslateConfig;
use crate::domain::bucket::DataSet;
use crate::domain::error::{TranslateError, TranslateResult};
use crate::domain::traits::{Persistable, TranslationModel};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{CheckpointMetrics, MetricsLogger};

/// Losses at or above this are reported as infinite perplexity
pub const MAX_EXP_LOSS: f64 = 300.0;

/// Number of recent checkpoint losses the decay rule looks at
const DECAY_WINDOW: usize = 3;

/// `exp(loss)`, guarded against overflow.
pub fn perplexity(loss: f64) -> f64 {
    if loss < MAX_EXP_LOSS { loss.exp() } else { f64::INFINITY }
}

/// Decay when there are more than two earlier checkpoints and the
/// current loss is above the worst of the last three.
pub fn should_decay(history: &[f64], loss: f64) -> bool {
    if history.len() < DECAY_WINDOW {
        return false;
    }
    let recent_max = history[history.len() - DECAY_WINDOW..]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    loss > recent_max
}

// ─── BucketSampler ────────────────────────────────────────────────────────────
/// Size-weighted bucket choice. `cdf[i]` is the fraction of all
/// examples held by buckets `0..=i`; a uniform draw `u` selects the
/// smallest `i` with `cdf[i] > u`, so empty buckets are never picked.
#[derive(Debug, Clone)]
pub struct BucketSampler {
    cdf: Vec<f64>,
}

impl BucketSampler {
    pub fn new(sizes: &[usize]) -> TranslateResult<Self> {
        let total: usize = sizes.iter().sum();
        if total == 0 {
            return Err(TranslateError::InsufficientData { buckets: sizes.len() });
        }
        let total = total as f64;
        let mut running = 0usize;
        let cdf = sizes
            .iter()
            .map(|&n| {
                running += n;
                running as f64 / total
            })
            .collect();
        Ok(Self { cdf })
    }

    pub fn cdf(&self) -> &[f64] {
        &self.cdf
    }

    /// Bucket for a given uniform variate in [0, 1).
    pub fn pick(&self, u: f64) -> usize {
        self.cdf
            .iter()
            .position(|&c| c > u)
            .unwrap_or(self.cdf.len() - 1)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.pick(rng.gen::<f64>())
    }
}

// ─── TrainingState ────────────────────────────────────────────────────────────
/// Bookkeeping of one training run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingState {
    /// Steps taken by this process (the model keeps the global count)
    pub current_step:    u64,
    /// Mean seconds per step over the current interval
    pub step_time:       f64,
    /// Mean loss over the current interval
    pub loss:            f64,
    /// One entry per checkpoint, append-only
    pub previous_losses: Vec<f64>,
    pub learning_rate:   f64,
}

/// What closing an interval decided.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalSummary {
    pub loss:       f64,
    pub step_time:  f64,
    pub perplexity: f64,
    pub decay:      bool,
}

impl TrainingState {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate, ..Self::default() }
    }

    /// Fold one step into the running averages.
    pub fn record_step(&mut self, step_secs: f64, step_loss: f64, interval: u64) {
        let interval = interval.max(1) as f64;
        self.step_time += step_secs / interval;
        self.loss += step_loss / interval;
        self.current_step += 1;
    }

    pub fn at_checkpoint(&self, interval: u64) -> bool {
        self.current_step % interval.max(1) == 0
    }

    /// Decide on decay, append the loss to the history and reset
    /// the averages for the next interval.
    pub fn close_interval(&mut self) -> IntervalSummary {
        let summary = IntervalSummary {
            loss:       self.loss,
            step_time:  self.step_time,
            perplexity: perplexity(self.loss),
            decay:      should_decay(&self.previous_losses, self.loss),
        };
        self.previous_losses.push(self.loss);
        self.step_time = 0.0;
        self.loss = 0.0;
        summary
    }
}

// ─── TrainingScheduler ────────────────────────────────────────────────────────
pub struct TrainingScheduler<'a, M, R> {
    config:      &'a TranslateConfig,
    model:       &'a mut M,
    checkpoints: &'a CheckpointManager,
    metrics:     Option<&'a MetricsLogger>,
    rng:         R,
    state:       TrainingState,
}

impl<'a, M, R> TrainingScheduler<'a, M, R>
where
    M: TranslationModel + Persistable,
    R: Rng,
{
    pub fn new(
        config:      &'a TranslateConfig,
        model:       &'a mut M,
        checkpoints: &'a CheckpointManager,
        rng:         R,
    ) -> Self {
        let state = TrainingState::new(model.learning_rate());
        Self { config, model, checkpoints, metrics: None, rng, state }
    }

    pub fn with_metrics(mut self, metrics: &'a MetricsLogger) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    /// Train until `max_steps` (or forever when unset).
    pub fn run(&mut self, train: &DataSet, dev: &DataSet) -> TranslateResult<()> {
        let sampler = BucketSampler::new(&train.sizes())?;
        tracing::info!(
            "Bucket scale: {:?}, batch size {}",
            sampler.cdf(),
            self.model.batch_size()
        );

        loop {
            if let Some(max) = self.config.max_steps {
                if self.state.current_step >= max {
                    tracing::info!("Reached {} steps, stopping", max);
                    return Ok(());
                }
            }

            self.train_step(train, &sampler)?;

            if self.state.at_checkpoint(self.config.steps_per_checkpoint) {
                self.checkpoint(dev)?;
            }
        }
    }

    /// One sampled batch, one optimisation step. Returns the step loss.
    pub fn train_step(&mut self, train: &DataSet, sampler: &BucketSampler) -> TranslateResult<f64> {
        let bucket_id = sampler.sample(&mut self.rng);

        let start = Instant::now();
        let batch = self.model.get_batch(train, bucket_id)?;
        let out = self.model.step(&batch, bucket_id, false)?;
        let elapsed = start.elapsed().as_secs_f64();

        if let Some(norm) = out.gradient_norm {
            tracing::debug!("bucket {} gradient norm {:.4}", bucket_id, norm);
        }
        self.state.record_step(elapsed, out.loss, self.config.steps_per_checkpoint);
        Ok(out.loss)
    }

    /// Report, maybe decay, save, reset and evaluate.
    pub fn checkpoint(&mut self, dev: &DataSet) -> TranslateResult<Vec<Option<f64>>> {
        let summary = self.state.close_interval();

        tracing::info!(
            "global step {} learning rate {:.4} step-time {:.2} perplexity {:.2}",
            self.model.global_step(),
            self.model.learning_rate(),
            summary.step_time,
            summary.perplexity,
        );

        if let Some(metrics) = self.metrics {
            let row = CheckpointMetrics {
                global_step:   self.model.global_step(),
                learning_rate: self.model.learning_rate(),
                step_time:     summary.step_time,
                perplexity:    summary.perplexity,
            };
            if let Err(e) = metrics.log(&row) {
                tracing::warn!("Cannot append metrics: {e}");
            }
        }

        if summary.decay {
            self.model.decay_learning_rate();
            tracing::info!("No improvement over 3 checkpoints, learning rate now {:.4}", self.model.learning_rate());
        }
        self.state.learning_rate = self.model.learning_rate();

        self.checkpoints.save(&*self.model)?;

        self.evaluate(dev)
    }

    /// Forward-only pass over one batch of every dev bucket.
    /// Returns per-bucket perplexity, `None` for empty buckets.
    pub fn evaluate(&mut self, dev: &DataSet) -> TranslateResult<Vec<Option<f64>>> {
        let mut report = Vec::with_capacity(dev.bucket_count());
        for bucket_id in 0..dev.bucket_count() {
            if dev.bucket(bucket_id).map_or(true, <[_]>::is_empty) {
                tracing::info!("  eval: empty bucket {}", bucket_id);
                report.push(None);
                continue;
            }
            let batch = self.model.get_batch(dev, bucket_id)?;
            let out = self.model.step(&batch, bucket_id, true)?;
            let ppx = perplexity(out.loss);
            tracing::info!("  eval: bucket {} perplexity {:.2}", bucket_id, ppx);
            report.push(Some(ppx));
        }
        Ok(report)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bucket::{Bucket, Example};
    use crate::ml::testing::ScriptedModel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sampling_follows_bucket_sizes() {
        let sampler = BucketSampler::new(&[10, 30]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let draws = 20_000;
        let ones = (0..draws).filter(|_| sampler.sample(&mut rng) == 1).count();
        let freq = ones as f64 / draws as f64;
        assert!((freq - 0.75).abs() < 0.02, "bucket 1 frequency {freq}");
    }

    #[test]
    fn test_pick_uses_strict_greater_than() {
        let sampler = BucketSampler::new(&[1, 3]).unwrap();
        assert_eq!(sampler.cdf(), &[0.25, 1.0]);
        assert_eq!(sampler.pick(0.0), 0);
        assert_eq!(sampler.pick(0.25), 1);
        assert_eq!(sampler.pick(0.999), 1);
    }

    #[test]
    fn test_empty_buckets_are_never_picked() {
        let sampler = BucketSampler::new(&[0, 5, 0, 5]).unwrap();
        assert_eq!(sampler.pick(0.0), 1);
        assert_eq!(sampler.pick(0.5), 3);
        let mut rng = StdRng::seed_from_u64(9);
        assert!((0..1000).map(|_| sampler.sample(&mut rng)).all(|b| b == 1 || b == 3));
    }

    #[test]
    fn test_all_empty_is_insufficient_data() {
        assert!(matches!(
            BucketSampler::new(&[0, 0]),
            Err(TranslateError::InsufficientData { buckets: 2 })
        ));
    }

    #[test]
    fn test_decay_needs_three_previous_losses() {
        assert!(!should_decay(&[], 1e9));
        assert!(!should_decay(&[1.0, 1.0], 1e9));
        assert!(should_decay(&[1.0, 2.0, 3.0], 3.5));
        // equal is not worse
        assert!(!should_decay(&[1.0, 2.0, 3.0], 3.0));
    }

    #[test]
    fn test_decay_reads_only_last_three() {
        assert!(should_decay(&[9.0, 1.0, 2.0, 3.0], 5.0));
        assert!(!should_decay(&[1.0, 2.0, 3.0, 9.0], 5.0));
    }

    #[test]
    fn test_perplexity_guard() {
        assert_eq!(perplexity(0.0), 1.0);
        assert!(perplexity(299.0).is_finite());
        assert_eq!(perplexity(300.0), f64::INFINITY);
    }

    #[test]
    fn test_running_averages_and_reset() {
        let mut state = TrainingState::new(0.5);
        for loss in [1.0, 2.0, 3.0, 4.0] {
            state.record_step(0.5, loss, 4);
        }
        assert!(state.at_checkpoint(4));
        assert!((state.loss - 2.5).abs() < 1e-12);
        assert!((state.step_time - 0.5).abs() < 1e-12);

        let summary = state.close_interval();
        assert!((summary.loss - 2.5).abs() < 1e-12);
        assert!(!summary.decay);
        assert_eq!(state.loss, 0.0);
        assert_eq!(state.step_time, 0.0);
        assert_eq!(state.previous_losses.len(), 1);
    }

    fn toy_sets() -> (Vec<Bucket>, DataSet, DataSet) {
        let buckets = vec![Bucket::new(3, 3), Bucket::new(6, 6)];
        let mut train = DataSet::with_buckets(2);
        train.push(0, Example::new(vec![4, 5], vec![6]));
        train.push(1, Example::new(vec![4, 5, 6, 7], vec![8, 9]));
        let mut dev = DataSet::with_buckets(2);
        dev.push(0, Example::new(vec![4], vec![5]));
        (buckets, train, dev)
    }

    #[test]
    fn test_run_checkpoints_decays_and_evaluates() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let (buckets, train, dev) = toy_sets();
        let config = TranslateConfig {
            steps_per_checkpoint: 2,
            max_steps: Some(8),
            train_dir: dir.path().to_path_buf(),
            buckets: buckets.clone(),
            ..TranslateConfig::default()
        };
        let checkpoints = CheckpointManager::new(dir.path());
        let metrics = MetricsLogger::new(dir.path()).unwrap();

        let mut model = ScriptedModel::with_buckets(buckets);
        model.train_losses = [1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 5.0, 5.0].into_iter().collect();

        let history = {
            let mut scheduler = TrainingScheduler::new(&config, &mut model, &checkpoints, StdRng::seed_from_u64(5))
                .with_metrics(&metrics);
            scheduler.run(&train, &dev).unwrap();
            assert_eq!(scheduler.state().current_step, 8);
            assert_eq!(scheduler.state().learning_rate, 0.25);
            scheduler.state().previous_losses.clone()
        };

        assert_eq!(history, vec![1.0, 2.0, 3.0, 5.0]);
        // only the fourth checkpoint was worse than the three before it
        assert_eq!(model.decays, 1);
        assert_eq!(model.learning_rate, 0.25);

        for step in [2, 4, 6, 8] {
            assert!(checkpoints.stem_for(step).exists(), "checkpoint {step}");
        }
        assert_eq!(checkpoints.latest().unwrap().unwrap().global_step, 8);

        // one eval step per checkpoint; dev bucket 1 is empty and skipped
        let evals: Vec<usize> = model.steps.iter().filter(|(_, fwd)| *fwd).map(|(b, _)| *b).collect();
        assert_eq!(evals, vec![0, 0, 0, 0]);

        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 5);
    }

    #[test]
    fn test_evaluate_reports_per_bucket() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let (buckets, _, dev) = toy_sets();
        let config = TranslateConfig { buckets: buckets.clone(), ..TranslateConfig::default() };
        let checkpoints = CheckpointManager::new(dir.path());
        let mut model = ScriptedModel::with_buckets(buckets);
        model.eval_loss = 0.0;

        let mut scheduler = TrainingScheduler::new(&config, &mut model, &checkpoints, StdRng::seed_from_u64(1));
        let report = scheduler.evaluate(&dev).unwrap();
        assert_eq!(report, vec![Some(1.0), None]);
    }

    #[test]
    fn test_run_without_data_fails() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config = TranslateConfig { max_steps: Some(1), ..TranslateConfig::default() };
        let checkpoints = CheckpointManager::new(dir.path());
        let mut model = ScriptedModel::default();
        let mut scheduler = TrainingScheduler::new(&config, &mut model, &checkpoints, StdRng::seed_from_u64(1));
        let empty = DataSet::with_buckets(1);
        assert!(matches!(
            scheduler.run(&empty, &empty),
            Err(TranslateError::InsufficientData { .. })
        ));
    }
}
