// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Decides WHICH checkpoint to load and WHEN to save one. HOW
// parameters are written is up to the model's Persistable impl.
//
// What gets saved per checkpoint:
//   1. Model parameters        — translate-{step}[.ext], written by the model
//   2. checkpoint.json         — pointer to the latest stem, its step and
//                                learning rate
//   3. translate_config.json   — the run configuration (once per run)
//
// Loading rules:
//   - no checkpoint.json                → fresh model, not an error
//   - pointer names a missing file      → fresh model, not an error
//   - pointer or parameters unreadable  → CheckpointLoad, fatal
//
// File layout:
//   train/
//     translate-200.mpk      ← parameters after global step 200
//     translate-400.mpk
//     checkpoint.json        ← {"global_step": 400, ...}
//     translate_config.json
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::application::config::TranslateConfig;
use crate::domain::error::{TranslateError, TranslateResult};
use crate::domain::traits::{CheckpointState, Persistable, TranslationModel};

const POINTER_FILE: &str = "checkpoint.json";
const CONFIG_FILE:  &str = "translate_config.json";
const STEM_PREFIX:  &str = "translate";

/// Manages saving and loading of model checkpoints in one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// The directory is only created by the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn ensure_dir(&self) -> TranslateResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| TranslateError::CheckpointSave {
            path:   self.dir.clone(),
            reason: e.to_string(),
        })
    }

    /// Path stem for the checkpoint taken at `global_step`.
    pub fn stem_for(&self, global_step: u64) -> PathBuf {
        self.dir.join(format!("{STEM_PREFIX}-{global_step}"))
    }

    /// The most recent checkpoint, or `None` when nothing was saved yet.
    pub fn latest(&self) -> TranslateResult<Option<CheckpointState>> {
        let path = self.dir.join(POINTER_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|e| TranslateError::CheckpointLoad {
            path:   path.clone(),
            reason: e.to_string(),
        })?;
        let state = serde_json::from_str(&text).map_err(|e| TranslateError::CheckpointLoad {
            path:   path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(state))
    }

    /// Restore the latest checkpoint into a model built by `init`, or
    /// hand back the freshly initialised model when there is none.
    pub fn load_or_init<M, F>(&self, init: F) -> TranslateResult<M>
    where
        M: Persistable,
        F: FnOnce() -> M,
    {
        let mut model = init();

        match self.latest()? {
            Some(state) if model.checkpoint_file(&state.stem).exists() => {
                tracing::info!("Reading model parameters from {}", state.stem.display());
                model.restore(&state)?;
            }
            Some(state) => {
                tracing::warn!(
                    "Checkpoint pointer names '{}' but the file is gone",
                    state.stem.display()
                );
                tracing::info!("Created model with fresh parameters.");
            }
            None => tracing::info!("Created model with fresh parameters."),
        }
        Ok(model)
    }

    /// Persist the model's parameters tagged with its global step and
    /// point `checkpoint.json` at them.
    pub fn save<M>(&self, model: &M) -> TranslateResult<CheckpointState>
    where
        M: Persistable + TranslationModel,
    {
        let state = CheckpointState {
            global_step:   model.global_step(),
            learning_rate: model.learning_rate(),
            stem:          self.stem_for(model.global_step()),
        };

        self.ensure_dir()?;
        model.save(&state.stem)?;

        let pointer = self.dir.join(POINTER_FILE);
        fs::write(&pointer, serde_json::to_string_pretty(&state)?).map_err(|e| {
            TranslateError::CheckpointSave { path: pointer.clone(), reason: e.to_string() }
        })?;

        tracing::debug!("Saved checkpoint: step {}", state.global_step);
        Ok(state)
    }

    /// Save the run configuration to JSON.
    pub fn save_config(&self, cfg: &TranslateConfig) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(())
    }

    pub fn has_config(&self) -> bool {
        self.dir.join(CONFIG_FILE).exists()
    }

    /// Load the configuration saved by an earlier `train` run.
    pub fn load_config(&self) -> Result<TranslateConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::testing::ScriptedModel;

    #[test]
    fn test_empty_storage_gives_fresh_model() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mgr = CheckpointManager::new(dir.path());
        let model = mgr.load_or_init(ScriptedModel::default).unwrap();
        assert_eq!(model.global_step(), 0);
        assert!(model.restored_from.is_none());
    }

    #[test]
    fn test_save_then_restore() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mgr = CheckpointManager::new(dir.path());

        let mut model = ScriptedModel::default();
        model.global_step = 400;
        model.learning_rate = 0.25;
        let state = mgr.save(&model).unwrap();
        assert_eq!(state.stem, dir.path().join("translate-400"));

        let restored = mgr.load_or_init(ScriptedModel::default).unwrap();
        assert_eq!(restored.global_step(), 400);
        assert_eq!(restored.learning_rate(), 0.25);
        assert_eq!(restored.restored_from, Some(state));
    }

    #[test]
    fn test_latest_pointer_follows_newest_save() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mgr = CheckpointManager::new(dir.path());
        let mut model = ScriptedModel::default();
        for step in [200, 400, 600] {
            model.global_step = step;
            mgr.save(&model).unwrap();
        }
        assert_eq!(mgr.latest().unwrap().unwrap().global_step, 600);
    }

    #[test]
    fn test_missing_parameter_file_falls_back_to_fresh() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mgr = CheckpointManager::new(dir.path());
        let mut model = ScriptedModel::default();
        model.global_step = 200;
        let state = mgr.save(&model).unwrap();
        fs::remove_file(&state.stem).unwrap();

        let fresh = mgr.load_or_init(ScriptedModel::default).unwrap();
        assert_eq!(fresh.global_step(), 0);
    }

    #[test]
    fn test_corrupt_pointer_is_a_load_error() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        fs::write(dir.path().join(POINTER_FILE), "{ not json").unwrap();
        let mgr = CheckpointManager::new(dir.path());
        assert!(matches!(
            mgr.load_or_init(ScriptedModel::default),
            Err(TranslateError::CheckpointLoad { .. })
        ));
    }

    #[test]
    fn test_corrupt_parameters_are_a_load_error() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mgr = CheckpointManager::new(dir.path());
        let mut model = ScriptedModel::default();
        model.global_step = 200;
        let state = mgr.save(&model).unwrap();
        fs::write(&state.stem, "garbage").unwrap();
        assert!(matches!(
            mgr.load_or_init(ScriptedModel::default),
            Err(TranslateError::CheckpointLoad { .. })
        ));
    }

    #[test]
    fn test_directory_created_on_first_save() {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let dir = root.path().join("train");
        let mgr = CheckpointManager::new(&dir);

        // reading never creates the directory
        assert!(mgr.load_or_init(ScriptedModel::default).is_ok());
        assert!(!mgr.has_config());
        assert!(!dir.exists());

        mgr.save(&ScriptedModel::default()).unwrap();
        assert!(dir.join(POINTER_FILE).exists());
    }

    #[test]
    fn test_unwritable_directory_is_a_save_error() {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let blocker = root.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let mgr = CheckpointManager::new(blocker.join("train"));
        assert!(matches!(
            mgr.save(&ScriptedModel::default()),
            Err(TranslateError::CheckpointSave { .. })
        ));
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mgr = CheckpointManager::new(dir.path());
        let cfg = TranslateConfig::default();
        assert!(!mgr.has_config());
        mgr.save_config(&cfg).unwrap();
        assert!(mgr.has_config());
        assert_eq!(mgr.load_config().unwrap(), cfg);
    }
}
