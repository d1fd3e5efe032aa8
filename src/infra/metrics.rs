// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per checkpoint so learning curves can be
// plotted after (or during) a run.
//
// Output file: {train_dir}/metrics.csv
//
//   global_step,learning_rate,step_time,perplexity
//   200,0.500000,0.031200,912.440000
//   400,0.500000,0.030900,301.270000
//   ...
//
// Perplexity is written as "inf" once the smoothed loss passes
// the overflow guard.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// Statistics of one checkpoint interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    pub global_step:   u64,
    pub learning_rate: f64,
    /// Mean wall-clock seconds per training step
    pub step_time:     f64,
    pub perplexity:    f64,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so a
    /// resumed run keeps appending to the same file.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "global_step,learning_rate,step_time,perplexity")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &CheckpointMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6}",
            m.global_step, m.learning_rate, m.step_time, m.perplexity,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&CheckpointMetrics {
            global_step: 200, learning_rate: 0.5, step_time: 0.25, perplexity: f64::INFINITY,
        }).unwrap();

        // A second logger on the same directory must not rewrite the header
        let again = MetricsLogger::new(dir.path()).unwrap();
        again.log(&CheckpointMetrics {
            global_step: 400, learning_rate: 0.495, step_time: 0.2, perplexity: 12.0,
        }).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "global_step,learning_rate,step_time,perplexity");
        assert_eq!(lines[1], "200,0.500000,0.250000,inf");
        assert!(lines[2].starts_with("400,0.495000"));
    }
}
