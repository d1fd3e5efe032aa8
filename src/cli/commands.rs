// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Four subcommands: `train`, `decode`, `evaluate`, `self-test`.
// The model / data flags are shared through ModelArgs and turned
// into a TranslateConfig at the layer boundary.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::config::TranslateConfig;
use crate::domain::bucket::Bucket;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train on bucketed id files until stopped (or --max-steps)
    Train(TrainArgs),

    /// Translate sentences typed on stdin
    Decode(DecodeArgs),

    /// Write the first decoded token of every window of a file
    Evaluate(EvaluateArgs),

    /// Train a tiny model for a few steps on built-in data
    SelfTest,
}

/// Flags shared by every command that builds a model.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Directory with vocabularies and id files
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory for checkpoints, saved config and metrics
    #[arg(long, default_value = "train")]
    pub train_dir: PathBuf,

    /// Source vocabulary size
    #[arg(long, default_value_t = 17572)]
    pub source_vocab_size: usize,

    /// Target vocabulary size
    #[arg(long, default_value_t = 9)]
    pub target_vocab_size: usize,

    /// Size of each model layer
    #[arg(long, default_value_t = 10)]
    pub size: usize,

    /// Number of layers in the model
    #[arg(long, default_value_t = 1)]
    pub num_layers: usize,

    /// Attention heads; must divide --size
    #[arg(long, default_value_t = 2)]
    pub num_heads: usize,

    /// Bucket as SRC:TGT maximum lengths; repeat for more buckets
    #[arg(long = "bucket", default_values_t = vec![Bucket::new(6, 2)])]
    pub buckets: Vec<Bucket>,

    /// Keep digits as-is instead of mapping them to 0
    #[arg(long)]
    pub keep_digits: bool,

    /// Seed for bucket sampling and batch draws
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Learning rate
    #[arg(long, default_value_t = 0.5)]
    pub learning_rate: f64,

    /// Learning rate decays by this much
    #[arg(long, default_value_t = 0.99)]
    pub learning_rate_decay_factor: f64,

    /// Clip gradients to this norm
    #[arg(long, default_value_t = 5.0)]
    pub max_gradient_norm: f64,

    /// Batch size to use during training
    #[arg(long, default_value_t = 500)]
    pub batch_size: usize,

    /// Limit on the size of training data (0: no limit)
    #[arg(long, default_value_t = 0)]
    pub max_train_data_size: usize,

    /// How many training steps to do per checkpoint
    #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(u64).range(1..))]
    pub steps_per_checkpoint: u64,

    /// Stop after this many steps (default: run until interrupted)
    #[arg(long)]
    pub max_steps: Option<u64>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Sentences to decode, one per line
    #[arg(long, default_value = "input_sentence.txt")]
    pub input: PathBuf,

    /// Where the first-token predictions go
    #[arg(long, default_value = "pred.txt")]
    pub output: PathBuf,
}

impl From<ModelArgs> for TranslateConfig {
    fn from(a: ModelArgs) -> Self {
        TranslateConfig {
            data_dir:          a.data_dir,
            train_dir:         a.train_dir,
            source_vocab_size: a.source_vocab_size,
            target_vocab_size: a.target_vocab_size,
            size:              a.size,
            num_layers:        a.num_layers,
            num_heads:         a.num_heads,
            buckets:           a.buckets,
            normalize_digits:  !a.keep_digits,
            seed:              a.seed,
            ..TranslateConfig::default()
        }
    }
}

impl From<TrainArgs> for TranslateConfig {
    fn from(a: TrainArgs) -> Self {
        TranslateConfig {
            learning_rate:              a.learning_rate,
            learning_rate_decay_factor: a.learning_rate_decay_factor,
            max_gradient_norm:          a.max_gradient_norm,
            batch_size:                 a.batch_size,
            max_train_data_size:        a.max_train_data_size,
            steps_per_checkpoint:       a.steps_per_checkpoint,
            max_steps:                  a.max_steps,
            ..a.model.into()
        }
    }
}
