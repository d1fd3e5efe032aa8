// ============================================================
// Layer 2 — DecodeUseCase
// ============================================================
// Orchestrates inference:
//
//   Step 1: Reuse the config saved by `train`, if any
//           (so the rebuilt network matches the checkpoint)
//   Step 2: Load source + target vocabularies   (Layer 6 - infra)
//   Step 3: Build the model, restore the latest
//           checkpoint                           (Layer 5 + 6)
//   Step 4: Decode: interactively from stdin, or
//           first-token evaluation of a file     (Layer 5 - ml)
//
// Reference: Rust Book §12 (I/O), §9 (Error Handling)

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};

use crate::application::config::TranslateConfig;
use crate::domain::traits::{Persistable, TranslationModel};
use crate::infra::{checkpoint::CheckpointManager, vocabulary::Vocabulary};
use crate::ml::inferencer::Decoder;
use crate::ml::translator::{build_translator, TrainBackend};

pub struct DecodeUseCase {
    config: TranslateConfig,
}

impl DecodeUseCase {
    /// `config` comes from the command line; model shape and vocabulary
    /// settings are replaced by the saved training config when one exists.
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let config = resolve_config(config)?;
        Ok(Self { config })
    }

    /// `> ` prompt on stdout, one sentence per stdin line, until EOF.
    pub fn interactive(&self) -> Result<()> {
        let mut decoder = self.decoder()?;
        let stdin = io::stdin();
        let stdout = io::stdout();
        decoder.interactive(stdin.lock(), stdout.lock())?;
        Ok(())
    }

    /// First decoded token of every window of `input` into `output`.
    pub fn evaluate(&self, input: &Path, output: &Path) -> Result<usize> {
        let mut decoder = self.decoder()?;
        let reader = BufReader::new(
            File::open(input).with_context(|| format!("Cannot open '{}'", input.display()))?,
        );
        let writer = BufWriter::new(
            File::create(output).with_context(|| format!("Cannot create '{}'", output.display()))?,
        );
        let sentences = decoder.evaluate(reader, writer)?;
        tracing::info!("Decoded {} sentences into '{}'", sentences, output.display());
        Ok(sentences)
    }

    fn decoder(&self) -> Result<Decoder<impl TranslationModel + Persistable>> {
        let cfg = &self.config;
        let (source_vocab, target_vocab) = load_vocabularies(cfg)?;

        let device = burn::backend::wgpu::WgpuDevice::default();
        let model = build_translator::<TrainBackend>(cfg, &device)?;
        let model = CheckpointManager::new(&cfg.train_dir).load_or_init(move || model)?;

        Ok(Decoder::new(model, cfg.buckets.clone(), source_vocab, target_vocab))
    }
}

/// Saved training config with the caller's directories, or the
/// caller's config unchanged when nothing was saved.
pub fn resolve_config(cli: TranslateConfig) -> Result<TranslateConfig> {
    let checkpoints = CheckpointManager::new(&cli.train_dir);
    if !checkpoints.has_config() {
        tracing::warn!(
            "No saved config in '{}', using command-line settings",
            cli.train_dir.display()
        );
        return Ok(cli);
    }
    let saved = checkpoints.load_config()?;
    tracing::info!("Using config saved in '{}'", cli.train_dir.display());
    Ok(TranslateConfig {
        data_dir:  cli.data_dir,
        train_dir: cli.train_dir,
        seed:      cli.seed,
        ..saved
    })
}

/// (source, target) vocabularies named by the config.
pub fn load_vocabularies(cfg: &TranslateConfig) -> Result<(Vocabulary, Vocabulary)> {
    let source_path = cfg.source_vocab_path();
    let target_path = cfg.target_vocab_path();
    let source = Vocabulary::load(&source_path, cfg.normalize_digits)
        .with_context(|| format!("Cannot load source vocabulary '{}'", source_path.display()))?;
    let target = Vocabulary::load(&target_path, cfg.normalize_digits)
        .with_context(|| format!("Cannot load target vocabulary '{}'", target_path.display()))?;
    Ok((source, target))
}
