// ============================================================
// Layer 3 — Run State and Start Plan
// ============================================================
// RunState is the tracker's record of a run. StartPlan is the
// decision taken from it before any model exists:
//
//   Fresh   { config }                         → build + compile
//   Resumed { checkpoint_path, start_epoch }   → load, no compile
//
// The artifact "model-best.mpk" is where the tracking callback
// keeps the best checkpoint of a run.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::config::RunConfig;
use crate::domain::traits::Tracker;

pub const BEST_MODEL_ARTIFACT: &str = "model-best.mpk";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub id:            String,
    /// Epochs completed and logged so far.
    pub step:          usize,
    #[serde(skip)]
    pub resumed:       bool,
    pub best_val_loss: Option<f64>,
    pub best_epoch:    Option<usize>,
}

impl RunState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id:            id.into(),
            step:          0,
            resumed:       false,
            best_val_loss: None,
            best_epoch:    None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartPlan {
    Fresh   { config: RunConfig },
    Resumed { checkpoint_path: PathBuf, start_epoch: usize },
}

impl StartPlan {
    /// Decide how training starts.
    ///
    /// Resuming needs both the `--resume` request and a tracker that
    /// actually resumed a previous run with at least one logged epoch.
    /// Anything else starts fresh.
    pub fn select<T: Tracker + ?Sized>(
        config:           &RunConfig,
        resume_requested: bool,
        tracker:          &T,
    ) -> Result<Self> {
        let run = tracker.state();

        if resume_requested && run.resumed && run.step > 0 {
            let checkpoint_path = tracker.restore(BEST_MODEL_ARTIFACT)?;
            tracing::info!(
                "Resuming run {} from epoch {} ({})",
                run.id, run.step, checkpoint_path.display()
            );
            return Ok(StartPlan::Resumed { checkpoint_path, start_epoch: run.step });
        }

        if resume_requested {
            tracing::warn!(
                "--resume requested but run {} has nothing to resume; starting fresh",
                run.id
            );
        }
        Ok(StartPlan::Fresh { config: config.clone() })
    }

    pub fn start_epoch(&self) -> usize {
        match self {
            StartPlan::Fresh { .. }               => 0,
            StartPlan::Resumed { start_epoch, .. } => *start_epoch,
        }
    }
}

/// Loss and accuracy of one finished epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based epoch number, as displayed.
    pub epoch:         usize,
    pub loss:          f64,
    pub accuracy:      f64,
    pub val_loss:      f64,
    pub val_accuracy:  f64,
    /// Learning rate in effect at the last optimizer step of the epoch.
    pub learning_rate: f64,
}

impl EpochMetrics {
    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: Option<f64>) -> bool {
        match best_val_loss {
            None       => !self.val_loss.is_nan(),
            Some(best) => self.val_loss < best,
        }
    }
}

/// One evaluation image with the class the model predicted for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamplePrediction {
    pub rows:      usize,
    pub cols:      usize,
    /// Normalised pixels in [0, 1], row-major.
    pub pixels:    Vec<f32>,
    pub predicted: usize,
    pub actual:    usize,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockTracker;

    fn metrics(val_loss: f64) -> EpochMetrics {
        EpochMetrics {
            epoch: 2, loss: 2.5, accuracy: 0.2, val_loss, val_accuracy: 0.2, learning_rate: 0.01,
        }
    }

    #[test]
    fn test_is_improvement() {
        assert!(metrics(2.3).is_improvement(Some(3.0)));
        assert!(!metrics(2.3).is_improvement(Some(2.0)));
        assert!(metrics(2.3).is_improvement(None));
        assert!(!metrics(f64::NAN).is_improvement(None));
    }

    #[test]
    fn test_fresh_without_resume_flag_ignores_tracker_state() {
        let tracker = MockTracker::resumed_at(RunConfig::default(), 10);
        let plan = StartPlan::select(&RunConfig::default(), false, &tracker).unwrap();
        assert_eq!(plan, StartPlan::Fresh { config: RunConfig::default() });
        assert_eq!(plan.start_epoch(), 0);
        assert_eq!(tracker.restore_calls(), 0);
    }

    #[test]
    fn test_resume_flag_on_new_run_starts_fresh() {
        let tracker = MockTracker::new(RunConfig::default());
        let plan = StartPlan::select(&RunConfig::default(), true, &tracker).unwrap();
        assert!(matches!(plan, StartPlan::Fresh { .. }));
        assert_eq!(tracker.restore_calls(), 0);
    }

    #[test]
    fn test_resumed_run_restores_best_model() {
        let tracker = MockTracker::resumed_at(RunConfig::default(), 10);
        let plan = StartPlan::select(&RunConfig::default(), true, &tracker).unwrap();
        match plan {
            StartPlan::Resumed { checkpoint_path, start_epoch } => {
                assert_eq!(start_epoch, 10);
                assert!(checkpoint_path.ends_with("model-best.mpk"));
            }
            other => panic!("expected Resumed, got {other:?}"),
        }
        assert_eq!(tracker.restore_calls(), 1);
    }
}
