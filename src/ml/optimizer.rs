// ============================================================
// Layer 5 — Optimizer and Compiled Model
// ============================================================
// A compiled model is the network together with everything the
// training loop needs to keep updating it:
//
//   model      → Cnn weights
//   optimizer  → SGD with Nesterov momentum (velocity per param)
//   iteration  → optimizer steps taken, drives the lr schedule
//   manifest   → architecture + optimizer settings
//
// Learning-rate schedule (inverse time decay, per step t):
//   lr_t = learn_rate / (1 + decay * t)
//
// Nesterov update with momentum m and no dampening:
//   v = m * v + g
//   θ = θ - lr_t * (g + m * v)
//
// Reference: Sutskever et al. (2013) On the importance of
//            initialization and momentum in deep learning

use burn::{
    optim::{adaptor::OptimizerAdaptor, momentum::MomentumConfig, Sgd, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::domain::config::RunConfig;
use crate::ml::model::{Cnn, CnnConfig};

pub type CnnOptimizer<B> =
    OptimizerAdaptor<Sgd<<B as AutodiffBackend>::InnerBackend>, Cnn<B>, B>;

pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SgdSettings {
    pub learn_rate: f64,
    pub decay:      f64,
    pub momentum:   f64,
    pub nesterov:   bool,
}

impl SgdSettings {
    pub fn from_run(cfg: &RunConfig) -> Self {
        Self {
            learn_rate: cfg.learn_rate,
            decay:      cfg.decay,
            momentum:   cfg.momentum,
            nesterov:   true,
        }
    }

    pub fn learning_rate_at(&self, iteration: usize) -> f64 {
        self.learn_rate / (1.0 + self.decay * iteration as f64)
    }

    pub fn init<B: AutodiffBackend>(&self) -> CnnOptimizer<B> {
        let momentum = MomentumConfig::new()
            .with_momentum(self.momentum)
            .with_dampening(0.0)
            .with_nesterov(self.nesterov);

        SgdConfig::new()
            .with_momentum(Some(momentum))
            .init::<B, Cnn<B>>()
    }
}

/// Architecture and optimizer settings stored next to the weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub format_version: u32,
    pub model:          CnnConfig,
    pub optimizer:      SgdSettings,
}

/// How a compiled model came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Compiled,
    Restored,
}

/// A model ready to train: weights plus everything the optimizer
/// needs to continue where it stopped.
pub struct Compiled<B: AutodiffBackend> {
    /// The network being trained
    pub model:     Cnn<B>,

    /// SGD with its per-parameter momentum buffers
    pub optimizer: CnnOptimizer<B>,

    /// Architecture and optimizer settings, stored with every checkpoint
    /// so a restored model never reads the current run config
    pub manifest:  ModelManifest,

    /// Optimizer steps taken so far; drives the learning-rate decay
    pub iteration: usize,

    /// Whether this model was compiled in this process or restored
    pub origin:    Origin,
}

impl<B: AutodiffBackend> Compiled<B> {
    pub fn learning_rate(&self) -> f64 {
        self.manifest.optimizer.learning_rate_at(self.iteration)
    }
}

/// Build a fresh model from the run configuration and attach a new
/// optimizer. This is the only place a model is compiled.
pub fn compile<B: AutodiffBackend>(
    cfg:         &RunConfig,
    num_classes: usize,
    device:      &B::Device,
) -> Compiled<B> {
    let model_cfg = CnnConfig::from_run(cfg, num_classes);
    let settings  = SgdSettings::from_run(cfg);

    let model     = model_cfg.init::<B>(device);
    let optimizer = settings.init::<B>();
    tracing::info!(
        "Model compiled: conv {}→{}, hidden {}, {} classes, lr={} momentum={} (nesterov)",
        model_cfg.layer_1_size, model_cfg.layer_2_size, model_cfg.hidden_layer_size,
        num_classes, settings.learn_rate, settings.momentum,
    );

    Compiled {
        model,
        optimizer,
        manifest: ModelManifest {
            format_version: MANIFEST_VERSION,
            model:          model_cfg,
            optimizer:      settings,
        },
        iteration: 0,
        origin:    Origin::Compiled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_learning_rate_decays_with_iterations() {
        let s = SgdSettings { learn_rate: 0.01, decay: 0.5, momentum: 0.9, nesterov: true };
        assert_eq!(s.learning_rate_at(0), 0.01);
        assert_eq!(s.learning_rate_at(2), 0.005);
    }

    #[test]
    fn test_zero_decay_keeps_rate() {
        let s = SgdSettings { learn_rate: 0.1, decay: 0.0, momentum: 0.0, nesterov: true };
        assert_eq!(s.learning_rate_at(1_000_000), 0.1);
    }

    #[test]
    fn test_compile_records_manifest() {
        let cfg      = RunConfig { layer_1_size: 4, layer_2_size: 8, hidden_layer_size: 16, ..Default::default() };
        let compiled = compile::<TestBackend>(&cfg, 10, &Default::default());

        assert_eq!(compiled.origin, Origin::Compiled);
        assert_eq!(compiled.iteration, 0);
        assert_eq!(compiled.manifest.model.layer_2_size, 8);
        assert_eq!(compiled.manifest.model.num_classes, 10);
        assert_eq!(compiled.manifest.optimizer, SgdSettings::from_run(&cfg));
        assert_eq!(compiled.learning_rate(), cfg.learn_rate);
    }
}
