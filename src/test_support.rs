// Test doubles shared by the unit tests of several layers.

use anyhow::Result;
use std::{
    cell::Cell,
    path::PathBuf,
};
use tempfile::TempDir;

use crate::domain::config::RunConfig;
use crate::domain::images::{LabeledImages, RawDataset, IMG_HEIGHT, IMG_WIDTH};
use crate::domain::run::{EpochMetrics, ExamplePrediction, RunState, BEST_MODEL_ARTIFACT};
use crate::domain::traits::{DatasetProvider, Tracker};

/// Four 28×28 images per split. The test labels reach class 9 so the
/// one-hot width is 10.
pub fn tiny_dataset() -> RawDataset {
    RawDataset {
        train: images(&[1, 2, 9, 0], 3),
        test:  images(&[0, 3, 7, 9], 11),
    }
}

fn images(labels: &[u8], salt: usize) -> LabeledImages {
    let size   = IMG_WIDTH * IMG_HEIGHT;
    let pixels = (0..labels.len() * size)
        .map(|p| ((p * 7 + salt * 31) % 256) as u8)
        .collect();
    LabeledImages::new(IMG_HEIGHT, IMG_WIDTH, pixels, labels.to_vec())
        .expect("valid test images")
}

/// Narrow layers so CPU training in tests stays fast.
pub fn small_config() -> RunConfig {
    RunConfig {
        layer_1_size:      2,
        layer_2_size:      4,
        hidden_layer_size: 8,
        batch_size:        2,
        epochs:            2,
        ..Default::default()
    }
}

// ─── MockProvider ─────────────────────────────────────────────────────────────
#[derive(Default)]
pub struct MockProvider {
    calls: Cell<usize>,
}

impl MockProvider {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl DatasetProvider for MockProvider {
    fn load(&self) -> Result<RawDataset> {
        self.calls.set(self.calls.get() + 1);
        Ok(tiny_dataset())
    }
}

// ─── MockTracker ──────────────────────────────────────────────────────────────
/// In-memory tracker; artifacts go to a private temporary directory.
pub struct MockTracker {
    dir:          TempDir,
    state:        RunState,
    config:       RunConfig,
    checkpoint:   Option<PathBuf>,
    restores:     Cell<usize>,
    pub epochs:   Vec<EpochMetrics>,
    /// (epoch, number of examples) per `log_examples` call
    pub examples: Vec<(usize, usize)>,
    pub bests:    Vec<(usize, f64)>,
    pub finished: bool,
}

impl MockTracker {
    /// A brand-new run.
    pub fn new(config: RunConfig) -> Self {
        Self {
            dir:        tempfile::tempdir().expect("temp dir"),
            state:      RunState::new("mock-run"),
            config,
            checkpoint: None,
            restores:   Cell::new(0),
            epochs:     Vec::new(),
            examples:   Vec::new(),
            bests:      Vec::new(),
            finished:   false,
        }
    }

    /// A run the tracker resumed after `step` logged epochs.
    pub fn resumed_at(config: RunConfig, step: usize) -> Self {
        let mut tracker = Self::new(config);
        tracker.state.resumed = true;
        tracker.state.step    = step;
        tracker
    }

    /// Path returned by `restore` instead of the default artifact path.
    pub fn with_checkpoint(mut self, path: PathBuf) -> Self {
        self.checkpoint = Some(path);
        self
    }

    pub fn with_best(mut self, val_loss: f64) -> Self {
        self.state.best_val_loss = Some(val_loss);
        self
    }

    pub fn restore_calls(&self) -> usize {
        self.restores.get()
    }
}

impl Tracker for MockTracker {
    fn state(&self) -> &RunState {
        &self.state
    }

    fn config(&self) -> &RunConfig {
        &self.config
    }

    fn restore(&self, name: &str) -> Result<PathBuf> {
        self.restores.set(self.restores.get() + 1);
        match &self.checkpoint {
            Some(path) if name == BEST_MODEL_ARTIFACT => Ok(path.clone()),
            _ => Ok(self.dir.path().join("files").join(name)),
        }
    }

    fn artifact_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.dir.path().join("files").join(name))
    }

    fn log_epoch(&mut self, metrics: &EpochMetrics) -> Result<()> {
        self.epochs.push(metrics.clone());
        self.state.step = metrics.epoch;
        Ok(())
    }

    fn log_examples(&mut self, epoch: usize, examples: &[ExamplePrediction]) -> Result<()> {
        self.examples.push((epoch, examples.len()));
        Ok(())
    }

    fn record_best(&mut self, epoch: usize, val_loss: f64) -> Result<()> {
        self.bests.push((epoch, val_loss));
        self.state.best_val_loss = Some(val_loss);
        self.state.best_epoch    = Some(epoch);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
