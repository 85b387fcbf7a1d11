// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The two external collaborators of the training driver:
//
//   DatasetProvider → hands out the fixed train / test split
//   Tracker         → the run session: effective config, run
//                     state, artifacts, per-epoch logging
//
// The tracker is an explicit session value. Everything that
// reads the config or emits metrics receives it as an argument.

use std::path::PathBuf;

use anyhow::Result;

use crate::domain::config::RunConfig;
use crate::domain::images::RawDataset;
use crate::domain::run::{EpochMetrics, ExamplePrediction, RunState};

// ─── DatasetProvider ──────────────────────────────────────────────────────────
/// Any component that can produce the labelled image split.
///
/// Implementations:
///   - FashionMnist → gzip IDX files on disk, downloaded on demand
pub trait DatasetProvider {
    fn load(&self) -> Result<RawDataset>;
}

// ─── Tracker ──────────────────────────────────────────────────────────────────
/// An experiment-tracking session for one run.
///
/// Implementations:
///   - LocalTracker → run directories on the local filesystem
pub trait Tracker {
    /// Identity and progress of the run.
    fn state(&self) -> &RunState;

    /// The effective configuration, fixed for the rest of the run.
    fn config(&self) -> &RunConfig;

    /// Local path of a previously saved artifact of this run.
    fn restore(&self, name: &str) -> Result<PathBuf>;

    /// Where an artifact called `name` has to be written to be kept
    /// with the run.
    fn artifact_path(&self, name: &str) -> Result<PathBuf>;

    /// Append one epoch to the run history and advance `step`.
    fn log_epoch(&mut self, metrics: &EpochMetrics) -> Result<()>;

    /// Record sample predictions for an epoch.
    fn log_examples(&mut self, epoch: usize, examples: &[ExamplePrediction]) -> Result<()>;

    /// Update the run summary with a new best monitored value.
    fn record_best(&mut self, epoch: usize, val_loss: f64) -> Result<()>;

    /// Mark the run as completed.
    fn finish(&mut self) -> Result<()>;
}
