// ============================================================
// Layer 6 — Checkpoints
// ============================================================
// Saves and restores a whole compiled model as ONE Burn record
// file (named MessagePack, full precision):
//
//   model      → Cnn weights
//   optimizer  → SGD momentum state per parameter
//   iteration  → optimizer steps taken (lr schedule position)
//   manifest   → JSON: format version, CnnConfig, SgdSettings
//
// Loading rebuilds the architecture and the optimizer from the
// manifest, so a restored model never depends on the current
// run configuration.
//
// The recorder sets the `.mpk` extension on every path.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{bail, Context, Result};
use burn::{
    module::Module,
    optim::Optimizer,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Record, Recorder},
    tensor::backend::AutodiffBackend,
};
use std::path::{Path, PathBuf};

use crate::ml::model::{Cnn, CnnRecord};
use crate::ml::optimizer::{Compiled, CnnOptimizer, ModelManifest, Origin, MANIFEST_VERSION};

pub const EXTENSION: &str = "mpk";

#[derive(Record)]
pub struct SnapshotRecord<B: AutodiffBackend> {
    /// Cnn weights
    pub model:     CnnRecord<B>,

    /// Momentum state per parameter
    pub optimizer: <CnnOptimizer<B> as Optimizer<Cnn<B>, B>>::Record,

    /// Optimizer steps taken, so the lr schedule continues on restore
    pub iteration: usize,

    /// ModelManifest as JSON; records only carry plain fields
    pub manifest:  String,
}

fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

/// Write architecture, weights and optimizer state to `path`
/// (extension replaced by `.mpk`). Returns the written path.
pub fn save<B: AutodiffBackend>(compiled: &Compiled<B>, path: &Path) -> Result<PathBuf> {
    let manifest = serde_json::to_string(&compiled.manifest)?;
    let record   = SnapshotRecord::<B> {
        model:     compiled.model.clone().into_record(),
        optimizer: compiled.optimizer.to_record(),
        iteration: compiled.iteration,
        manifest,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }

    recorder()
        .record(record, path.to_path_buf())
        .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

    let written = path.with_extension(EXTENSION);
    tracing::debug!("Saved checkpoint '{}' (step {})", written.display(), compiled.iteration);
    Ok(written)
}

/// Restore a compiled model from a file written by [`save`].
pub fn load<B: AutodiffBackend>(path: &Path, device: &B::Device) -> Result<Compiled<B>> {
    let record: SnapshotRecord<B> = recorder()
        .load(path.to_path_buf(), device)
        .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

    let manifest: ModelManifest = serde_json::from_str(&record.manifest)
        .with_context(|| format!("Checkpoint '{}' has an unreadable manifest", path.display()))?;
    if manifest.format_version != MANIFEST_VERSION {
        bail!(
            "Checkpoint '{}' has format version {}, expected {}",
            path.display(), manifest.format_version, MANIFEST_VERSION
        );
    }

    let model     = manifest.model.init::<B>(device).load_record(record.model);
    let optimizer = manifest.optimizer.init::<B>().load_record(record.optimizer);

    tracing::info!(
        "Restored model from '{}' at optimizer step {}",
        path.display(), record.iteration
    );

    Ok(Compiled {
        model,
        optimizer,
        manifest,
        iteration: record.iteration,
        origin:    Origin::Restored,
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::RunConfig;
    use crate::ml::optimizer::compile;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;
    use burn::prelude::*;

    type TestBackend = Autodiff<NdArray>;

    fn config() -> RunConfig {
        RunConfig { layer_1_size: 2, layer_2_size: 3, hidden_layer_size: 5, learn_rate: 0.05, ..Default::default() }
    }

    #[test]
    fn test_restore_keeps_architecture_and_step() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();

        let mut compiled = compile::<TestBackend>(&config(), 10, &device);
        compiled.iteration = 42;
        let written = save(&compiled, &dir.path().join("snap")).unwrap();
        assert_eq!(written, dir.path().join("snap.mpk"));
        assert!(written.exists());

        let restored = load::<TestBackend>(&written, &device).unwrap();
        assert_eq!(restored.origin, Origin::Restored);
        assert_eq!(restored.iteration, 42);
        assert_eq!(restored.manifest.model.layer_2_size, 3);
        assert_eq!(restored.manifest.optimizer.learn_rate, 0.05);

        // Same weights → same outputs
        let images = Tensor::<TestBackend, 4>::ones([1, 1, 28, 28], &device);
        let before: Vec<f32> = compiled.model.valid().forward(images.clone().inner()).into_data().iter().collect();
        let after:  Vec<f32> = restored.model.valid().forward(images.inner()).into_data().iter().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load::<TestBackend>(&dir.path().join("absent.mpk"), &Default::default()).is_err());
    }
}
