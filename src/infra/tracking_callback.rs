// ============================================================
// Layer 6 — Tracking Callback
// ============================================================
// Connects the training loop to the experiment tracker. After
// every epoch it:
//
//   1. logs the epoch metrics (advances the run step)
//   2. monitors val_loss (lower is better); on improvement the
//      whole compiled model is saved as the run's best-model
//      artifact and the run summary is updated
//   3. predicts the sample images and logs them as media
//
// The best value starts from the run summary, so a resumed run
// only replaces its best model when it actually beats it.

use anyhow::Result;
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};

use crate::data::dataset::ImageItem;
use crate::domain::run::{EpochMetrics, ExamplePrediction, BEST_MODEL_ARTIFACT};
use crate::domain::traits::Tracker;
use crate::infra::checkpoint;
use crate::ml::inferencer::Inferencer;
use crate::ml::optimizer::Compiled;
use crate::ml::trainer::EpochCallback;

pub struct TrackingCallback<'a, B: AutodiffBackend, T: Tracker + ?Sized> {
    tracker:  &'a mut T,
    examples: Vec<ImageItem>,
    device:   B::Device,
    best:     Option<f64>,
}

impl<'a, B: AutodiffBackend, T: Tracker + ?Sized> TrackingCallback<'a, B, T> {
    /// `examples` are the evaluation images predicted after each epoch.
    pub fn new(tracker: &'a mut T, examples: Vec<ImageItem>, device: B::Device) -> Self {
        let best = tracker.state().best_val_loss;
        Self { tracker, examples, device, best }
    }

    pub fn best_val_loss(&self) -> Option<f64> {
        self.best
    }

    fn log_examples(&mut self, metrics: &EpochMetrics, compiled: &Compiled<B>) -> Result<()> {
        if self.examples.is_empty() {
            return Ok(());
        }

        let model     = compiled.model.valid();
        let predicted = Inferencer::new(&model, self.device.clone()).predict(&self.examples);

        let examples: Vec<ExamplePrediction> = self
            .examples
            .iter()
            .zip(predicted)
            .map(|(item, predicted)| ExamplePrediction {
                rows:   item.rows,
                cols:   item.cols,
                pixels: item.pixels.clone(),
                predicted,
                actual: item.label,
            })
            .collect();

        self.tracker.log_examples(metrics.epoch, &examples)
    }
}

impl<'a, B: AutodiffBackend, T: Tracker + ?Sized> EpochCallback<B> for TrackingCallback<'a, B, T> {
    fn on_fit_start(&mut self, start_epoch: usize, epochs: usize) -> Result<()> {
        tracing::info!(
            "Tracking run {} from epoch {} of {} (best val_loss so far: {:?})",
            self.tracker.state().id, start_epoch, epochs, self.best
        );
        Ok(())
    }

    fn on_epoch_end(
        &mut self,
        _epoch:   usize,
        metrics:  &EpochMetrics,
        compiled: &Compiled<B>,
    ) -> Result<()> {
        self.tracker.log_epoch(metrics)?;

        // ── Best-model checkpoint ─────────────────────────────────────────────
        if metrics.is_improvement(self.best) {
            let path    = self.tracker.artifact_path(BEST_MODEL_ARTIFACT)?;
            let written = checkpoint::save(compiled, &path)?;
            self.tracker.record_best(metrics.epoch, metrics.val_loss)?;
            tracing::info!(
                "val_loss improved from {:?} to {:.4}; saved '{}'",
                self.best, metrics.val_loss, written.display()
            );
            self.best = Some(metrics.val_loss);
        }

        // ── Sample predictions ────────────────────────────────────────────────
        self.log_examples(metrics, compiled)
    }
}
