// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// Every tunable of a run in one immutable struct. The CLI layer
// builds it once from flags; every component receives it (or
// the part of it it needs) at construction and never mutates it.
//
// Serialisable so `train` can save it next to the checkpoints
// and `decode` / `evaluate` can rebuild the same architecture.

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::domain::bucket::Bucket;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateConfig {
    pub learning_rate:              f64,
    pub learning_rate_decay_factor: f64,
    /// Gradients are clipped to this global norm
    pub max_gradient_norm:          f64,
    pub batch_size:                 usize,
    /// Hidden size of each model layer
    pub size:                       usize,
    pub num_layers:                 usize,
    pub num_heads:                  usize,
    pub source_vocab_size:          usize,
    pub target_vocab_size:          usize,
    pub buckets:                    Vec<Bucket>,
    pub data_dir:                   PathBuf,
    pub train_dir:                  PathBuf,
    /// 0 = read the whole training file
    pub max_train_data_size:        usize,
    pub steps_per_checkpoint:       u64,
    /// None = train until the process is stopped
    pub max_steps:                  Option<u64>,
    pub seed:                       Option<u64>,
    pub normalize_digits:           bool,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            learning_rate:              0.5,
            learning_rate_decay_factor: 0.99,
            max_gradient_norm:          5.0,
            batch_size:                 500,
            size:                       10,
            num_layers:                 1,
            num_heads:                  2,
            source_vocab_size:          17572,
            target_vocab_size:          9,
            buckets:                    vec![Bucket::new(6, 2)],
            data_dir:                   PathBuf::from("data"),
            train_dir:                  PathBuf::from("train"),
            max_train_data_size:        0,
            steps_per_checkpoint:       200,
            max_steps:                  None,
            seed:                       None,
            normalize_digits:           true,
        }
    }
}

impl TranslateConfig {
    pub fn source_vocab_path(&self) -> PathBuf {
        self.data_dir.join(format!("vocab{}.src", self.source_vocab_size))
    }

    pub fn target_vocab_path(&self) -> PathBuf {
        self.data_dir.join(format!("vocab{}.tgt", self.target_vocab_size))
    }

    /// (source, target) id files for a split such as "train" or "dev"
    pub fn ids_paths(&self, split: &str) -> (PathBuf, PathBuf) {
        (
            self.data_dir.join(format!("{split}.ids{}.src", self.source_vocab_size)),
            self.data_dir.join(format!("{split}.ids{}.tgt", self.target_vocab_size)),
        )
    }

    /// Bucketer limit: None reads everything
    pub fn max_train_lines(&self) -> Option<usize> {
        Some(self.max_train_data_size).filter(|&n| n > 0)
    }

    /// Seeded when `seed` is set, from OS entropy otherwise.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        }
    }

    /// Configuration of the built-in self-test: tiny vocabularies,
    /// two small buckets, two layers of 32 units.
    pub fn self_test() -> Self {
        Self {
            learning_rate:              0.3,
            learning_rate_decay_factor: 0.99,
            batch_size:                 32,
            size:                       32,
            num_layers:                 2,
            num_heads:                  4,
            source_vocab_size:          10,
            target_vocab_size:          10,
            buckets:                    vec![Bucket::new(3, 3), Bucket::new(6, 6)],
            max_steps:                  Some(5),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_layout() {
        let cfg = TranslateConfig::default();
        assert_eq!(cfg.source_vocab_path(), PathBuf::from("data/vocab17572.src"));
        assert_eq!(cfg.target_vocab_path(), PathBuf::from("data/vocab9.tgt"));
        let (src, tgt) = cfg.ids_paths("dev");
        assert_eq!(src, PathBuf::from("data/dev.ids17572.src"));
        assert_eq!(tgt, PathBuf::from("data/dev.ids9.tgt"));
    }

    #[test]
    fn test_zero_means_unlimited() {
        let mut cfg = TranslateConfig::default();
        assert_eq!(cfg.max_train_lines(), None);
        cfg.max_train_data_size = 1000;
        assert_eq!(cfg.max_train_lines(), Some(1000));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        use rand::Rng;
        let cfg = TranslateConfig { seed: Some(7), ..TranslateConfig::default() };
        let a: Vec<u32> = cfg.rng().sample_iter(rand::distributions::Standard).take(4).collect();
        let b: Vec<u32> = cfg.rng().sample_iter(rand::distributions::Standard).take(4).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_saved_json_round_trips() {
        let cfg = TranslateConfig::self_test();
        let json = serde_json::to_string(&cfg).unwrap();
        assert_eq!(serde_json::from_str::<TranslateConfig>(&json).unwrap(), cfg);
    }
}
