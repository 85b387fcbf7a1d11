// ============================================================
// Layer 3 — Run Configuration
// ============================================================
// Hyperparameters of one training run. The tracker owns the
// effective copy: built-in defaults, optionally overridden by
// `config-defaults.json`, and on resume by the stored config of
// the interrupted run.
//
// Every field has a serde default so configs written by older
// runs (or partial config-defaults.json files) still parse.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Fraction of flattened features zeroed during training, in [0, 1)
    pub dropout:           f64,

    /// Width of the dense layer between the conv stack and the output
    pub hidden_layer_size: usize,

    /// Filters of the first 3×3 convolution
    pub layer_1_size:      usize,

    /// Filters of the second 3×3 convolution
    pub layer_2_size:      usize,

    /// SGD learning rate before decay
    pub learn_rate:        f64,

    /// Inverse-time decay per optimizer step:
    /// lr = learn_rate / (1 + decay * step)
    pub decay:             f64,

    /// Nesterov momentum coefficient
    pub momentum:          f64,

    /// Total epoch budget of the run. A resumed run only trains the
    /// epochs the tracker has not recorded yet.
    pub epochs:            usize,

    /// Images per optimizer step
    pub batch_size:        usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dropout:           0.2,
            hidden_layer_size: 128,
            layer_1_size:      16,
            layer_2_size:      32,
            learn_rate:        0.01,
            decay:             1e-6,
            momentum:          0.9,
            epochs:            27,
            batch_size:        32,
        }
    }
}

impl RunConfig {
    /// Apply the stored configuration of a resumed run on top of `self`.
    ///
    /// Stored values win for everything that shapes the model and the
    /// optimizer. `epochs` is the training budget, not part of the run's
    /// identity, so the current value is kept.
    pub fn merged_with_stored(self, stored: RunConfig) -> RunConfig {
        RunConfig {
            epochs: self.epochs,
            ..stored
        }
    }

    /// Reject values the framework would panic on or silently misuse.
    pub fn check(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        if !(0.0..=1.0).contains(&self.momentum) {
            bail!("momentum must be in [0, 1], got {}", self.momentum);
        }
        if !(self.learn_rate > 0.0) {
            bail!("learn_rate must be positive, got {}", self.learn_rate);
        }
        if !(self.decay >= 0.0) {
            bail!("decay must be non-negative, got {}", self.decay);
        }
        for (name, value) in [
            ("hidden_layer_size", self.hidden_layer_size),
            ("layer_1_size",      self.layer_1_size),
            ("layer_2_size",      self.layer_2_size),
            ("epochs",            self.epochs),
            ("batch_size",        self.batch_size),
        ] {
            if value == 0 {
                bail!("{name} must be a positive integer");
            }
        }
        Ok(())
    }
}
