// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one training run in order:
//
//   Step 1: Check the effective config   (Layer 3 - domain)
//   Step 2: Load the image dataset       (Layer 4 - data)
//   Step 3: Normalise + one-hot encode   (Layer 4 - data)
//   Step 4: Choose Fresh or Resumed      (Layer 3 - domain)
//   Step 5: Compile or restore the model (Layer 5 / 6)
//   Step 6: Fit the remaining epochs     (Layer 5 - ml)
//   Step 7: Persist the fitted model     (Layer 6 - infra)
//   Step 8: Finish the tracked run       (Layer 6 - infra)
//
// The tracker is the run session: it owns the effective
// config and the resume state, and every step that reads the
// config or reports progress goes through it.
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use burn::tensor::backend::AutodiffBackend;
use std::{ffi::OsStr, fmt, path::PathBuf};

use crate::data::{dataset::ImageDataset, preprocessor::prepare};
use crate::domain::run::{EpochMetrics, StartPlan};
use crate::domain::traits::{DatasetProvider, Tracker};
use crate::infra::{checkpoint, settings::Settings, tracking_callback::TrackingCallback};
use crate::ml::optimizer::{compile, Compiled, Origin};
use crate::ml::trainer::{fit, FitOptions};

pub const RESUME_FLAG: &str = "--resume";

/// Resumption is requested only by a trailing literal `--resume`.
/// Every other argument is ignored, valid UTF-8 or not.
pub fn resume_requested<S: AsRef<OsStr>>(args: &[S]) -> bool {
    args.last().is_some_and(|arg| arg.as_ref() == OsStr::new(RESUME_FLAG))
}

// ─── RunReport ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id:        String,
    pub origin:        Origin,
    pub start_epoch:   usize,
    pub epochs_run:    usize,
    pub final_metrics: Option<EpochMetrics>,
    pub artifact:      PathBuf,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = match self.origin {
            Origin::Compiled => "fresh",
            Origin::Restored => "resumed",
        };
        write!(
            f,
            "Run {} ({start} at epoch {}): {} epochs trained",
            self.run_id, self.start_epoch, self.epochs_run
        )?;
        if let Some(m) = &self.final_metrics {
            write!(
                f,
                ", val_loss={:.4}, val_acc={:.2}%",
                m.val_loss, m.val_accuracy * 100.0
            )?;
        }
        write!(f, ". Model saved to '{}'", self.artifact.display())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase<P, T> {
    provider: P,
    tracker:  T,
    settings: Settings,
    resume:   bool,
}

impl<P: DatasetProvider, T: Tracker> TrainUseCase<P, T> {
    pub fn new(provider: P, tracker: T, settings: Settings, resume: bool) -> Self {
        Self { provider, tracker, settings, resume }
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Execute the full training run end to end.
    pub fn execute<B: AutodiffBackend>(&mut self, device: &B::Device) -> Result<RunReport> {
        // ── Step 1: Effective configuration ───────────────────────────────────
        let config = self.tracker.config().clone();
        config.check()?;
        tracing::info!("Run {} config: {:?}", self.tracker.state().id, config);

        // ── Step 2: Load the dataset ──────────────────────────────────────────
        let raw = self.provider.load()?;
        tracing::info!(
            "Loaded {} training and {} evaluation images",
            raw.train.len(), raw.test.len()
        );

        // ── Step 3: Normalise pixels, one-hot encode labels ───────────────────
        let data = prepare(&raw)?;

        // ── Step 4: Fresh or Resumed ──────────────────────────────────────────
        let plan = StartPlan::select(&config, self.resume, &self.tracker)?;

        // ── Step 5: Compile or restore ────────────────────────────────────────
        let (compiled, start_epoch) = build_or_restore::<B>(&plan, data.num_classes, device)?;
        let origin = compiled.origin;

        // ── Step 6: Fit epochs start_epoch..epochs ────────────────────────────
        let train_dataset = ImageDataset::new(data.train);
        let test_dataset  = ImageDataset::new(data.test);
        let examples      = test_dataset.head(self.settings.examples);

        let options = FitOptions {
            epochs:     config.epochs,
            start_epoch,
            batch_size: config.batch_size,
            seed:       self.settings.seed,
        };

        let (fitted, final_metrics) = {
            let mut callback = TrackingCallback::<B, T>::new(&mut self.tracker, examples, device.clone());
            fit(compiled, train_dataset, test_dataset, options, device, &mut [&mut callback])?
        };

        // ── Step 7: Persist the complete fitted model ─────────────────────────
        let artifact = checkpoint::save(&fitted, &self.settings.output)?;
        tracing::info!("Saved fitted model to '{}'", artifact.display());

        // ── Step 8: Close the run ─────────────────────────────────────────────
        self.tracker.finish()?;

        Ok(RunReport {
            run_id:      self.tracker.state().id.clone(),
            origin,
            start_epoch,
            epochs_run:  config.epochs.saturating_sub(start_epoch),
            final_metrics,
            artifact,
        })
    }
}

/// A compiled model and the epoch to start from. The Resumed branch
/// loads everything from the checkpoint and never compiles.
pub fn build_or_restore<B: AutodiffBackend>(
    plan:        &StartPlan,
    num_classes: usize,
    device:      &B::Device,
) -> Result<(Compiled<B>, usize)> {
    match plan {
        StartPlan::Fresh { config } => {
            tracing::info!("Compiling a new model for {} classes", num_classes);
            Ok((compile::<B>(config, num_classes, device), 0))
        }
        StartPlan::Resumed { checkpoint_path, start_epoch } => {
            let compiled = checkpoint::load::<B>(checkpoint_path, device)?;
            let stored   = compiled.manifest.model.num_classes;
            if stored != num_classes {
                bail!(
                    "Checkpoint '{}' predicts {} classes but the dataset has {}",
                    checkpoint_path.display(), stored, num_classes
                );
            }
            Ok((compiled, *start_epoch))
        }
    }
}
