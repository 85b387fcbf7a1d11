// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records epoch metrics of a run to a CSV file.
//
// Metrics recorded per epoch:
//   - epoch:         the epoch number (1, 2, 3, ...)
//   - loss:          mean categorical cross-entropy, training set
//   - accuracy:      fraction of training images classified right
//   - val_loss:      mean categorical cross-entropy, test set
//   - val_accuracy:  fraction of test images classified right
//   - learning_rate: decayed rate at the last step of the epoch
//
// Output file: runs/<run-id>/metrics.csv
//
// Example CSV output:
//   epoch,loss,accuracy,val_loss,val_accuracy,learning_rate
//   1,0.812300,0.701200,0.602100,0.778400,0.009982
//   2,0.541900,0.803100,0.498700,0.821100,0.009963
//
// A resumed run appends to the same file, so the history stays
// one continuous table.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::run::EpochMetrics;

const HEADER: &str = "epoch,loss,accuracy,val_loss,val_accuracy,learning_rate";

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.loss,
            m.accuracy,
            m.val_loss,
            m.val_accuracy,
            m.learning_rate,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.loss,
            m.val_loss,
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(epoch: usize) -> EpochMetrics {
        EpochMetrics {
            epoch, loss: 0.5, accuracy: 0.75, val_loss: 0.25, val_accuracy: 0.875, learning_rate: 0.01,
        }
    }

    #[test]
    fn test_writes_header_and_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&metrics(1)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(HEADER));
        assert_eq!(lines.next(), Some("1,0.500000,0.750000,0.250000,0.875000,0.010000"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::new(dir.path()).unwrap().log(&metrics(1)).unwrap();
        MetricsLogger::new(dir.path()).unwrap().log(&metrics(2)).unwrap();

        let text = fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.lines().filter(|l| l.starts_with(HEADER)).count(), 1);
    }
}
