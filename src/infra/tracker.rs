// ============================================================
// Layer 6 — Local Experiment Tracker
// ============================================================
// A filesystem implementation of the Tracker session.
//
//   runs/
//     resume.json                ← id of the last unfinished run
//     <run-id>/
//       config.json              ← effective run configuration
//       run.json                 ← step, best val_loss, best epoch
//       metrics.csv              ← one row per epoch
//       files/model-best.mpk     ← artifacts
//       media/epoch_001/         ← sample predictions (PGM)
//         00.pgm ... examples.json
//
// Run identity on init:
//   resume requested AND resume.json names a run with a run.json
//     → that run is resumed, its stored config wins over the
//       defaults (except `epochs`), step continues
//   otherwise
//     → a new run with a fresh id
//
// The effective config is range-checked before anything is
// written. A stored config that fails the check is not resumed.
//
// `finish` removes resume.json, so a run that completed cannot
// be resumed again.

use anyhow::{bail, Context, Result};
use rand::{distributions::Alphanumeric, Rng};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::config::RunConfig;
use crate::domain::images::label_name;
use crate::domain::run::{EpochMetrics, ExamplePrediction, RunState};
use crate::domain::traits::Tracker;
use crate::infra::metrics::MetricsLogger;

const RESUME_FILE: &str = "resume.json";
const CONFIG_FILE: &str = "config.json";
const STATE_FILE:  &str = "run.json";
const ID_LEN:      usize = 8;

#[derive(Debug, Serialize, Deserialize)]
struct ResumeMarker {
    run_id: String,
}

#[derive(Debug, Serialize)]
struct ExampleEntry<'a> {
    file:            String,
    predicted:       usize,
    predicted_label: &'a str,
    actual:          usize,
    actual_label:    &'a str,
}

pub struct LocalTracker {
    root:    PathBuf,
    run_dir: PathBuf,
    state:   RunState,
    config:  RunConfig,
    metrics: MetricsLogger,
}

impl LocalTracker {
    /// Establish or resume a run under `root`.
    pub fn init(
        root:     &Path,
        defaults: RunConfig,
        resume:   bool,
        run_id:   Option<&str>,
    ) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("Cannot create tracker directory '{}'", root.display()))?;

        let previous = if resume { find_resumable(root)? } else { None };

        // Nothing is written for a config that can't train.
        let previous = previous.and_then(|(state, stored)| {
            let merged = defaults.clone().merged_with_stored(stored);
            match merged.check() {
                Ok(())   => Some((state, merged)),
                Err(err) => {
                    tracing::warn!("Run {} has an unusable stored config ({err}); not resuming", state.id);
                    None
                }
            }
        });

        let (state, config) = match previous {
            Some((mut state, config)) => {
                state.resumed = true;
                tracing::info!("Resuming run {} at step {}", state.id, state.step);
                (state, config)
            }
            None => {
                defaults.check()?;
                let id = new_run_id(root, run_id)?;
                tracing::info!("Starting run {}", id);
                (RunState::new(id), defaults)
            }
        };

        let run_dir = root.join(&state.id);
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("Cannot create run directory '{}'", run_dir.display()))?;

        write_json(&run_dir.join(CONFIG_FILE), &config)?;
        write_json(&run_dir.join(STATE_FILE), &state)?;
        write_json(&root.join(RESUME_FILE), &ResumeMarker { run_id: state.id.clone() })?;

        let metrics = MetricsLogger::new(&run_dir)?;

        Ok(Self { root: root.to_path_buf(), run_dir, state, config, metrics })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn save_state(&self) -> Result<()> {
        write_json(&self.run_dir.join(STATE_FILE), &self.state)
    }
}

impl Tracker for LocalTracker {
    fn state(&self) -> &RunState {
        &self.state
    }

    fn config(&self) -> &RunConfig {
        &self.config
    }

    fn restore(&self, name: &str) -> Result<PathBuf> {
        let path = self.run_dir.join("files").join(name);
        if !path.exists() {
            bail!("Artifact '{}' not found in run {}", name, self.state.id);
        }
        Ok(path)
    }

    fn artifact_path(&self, name: &str) -> Result<PathBuf> {
        let dir = self.run_dir.join("files");
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;
        Ok(dir.join(name))
    }

    fn log_epoch(&mut self, metrics: &EpochMetrics) -> Result<()> {
        self.metrics.log(metrics)?;
        self.state.step = metrics.epoch;
        self.save_state()
    }

    fn log_examples(&mut self, epoch: usize, examples: &[ExamplePrediction]) -> Result<()> {
        if examples.is_empty() {
            return Ok(());
        }

        let dir = self.run_dir.join("media").join(format!("epoch_{epoch:03}"));
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let mut entries = Vec::with_capacity(examples.len());
        for (i, example) in examples.iter().enumerate() {
            let file = format!("{i:02}.pgm");
            write_pgm(&dir.join(&file), example)?;
            entries.push(ExampleEntry {
                file,
                predicted:       example.predicted,
                predicted_label: label_name(example.predicted),
                actual:          example.actual,
                actual_label:    label_name(example.actual),
            });
        }

        write_json(&dir.join("examples.json"), &entries)?;
        tracing::debug!("Logged {} examples to '{}'", entries.len(), dir.display());
        Ok(())
    }

    fn record_best(&mut self, epoch: usize, val_loss: f64) -> Result<()> {
        self.state.best_val_loss = Some(val_loss);
        self.state.best_epoch    = Some(epoch);
        self.save_state()
    }

    fn finish(&mut self) -> Result<()> {
        let marker = self.root.join(RESUME_FILE);
        let ours = read_json::<ResumeMarker>(&marker)
            .map(|m| m.run_id == self.state.id)
            .unwrap_or(false);
        if ours {
            fs::remove_file(&marker)
                .with_context(|| format!("Cannot remove '{}'", marker.display()))?;
        }
        tracing::info!("Run {} finished at step {}", self.state.id, self.state.step);
        Ok(())
    }
}

/// The run named by resume.json, if it exists on disk.
fn find_resumable(root: &Path) -> Result<Option<(RunState, RunConfig)>> {
    let marker = root.join(RESUME_FILE);
    if !marker.exists() {
        return Ok(None);
    }

    let ResumeMarker { run_id } = read_json(&marker)?;
    let run_dir = root.join(&run_id);
    if !run_dir.join(STATE_FILE).exists() {
        tracing::warn!("resume.json names run {} but it has no state; not resuming", run_id);
        return Ok(None);
    }

    let state  = read_json::<RunState>(&run_dir.join(STATE_FILE))?;
    let stored = read_json::<RunConfig>(&run_dir.join(CONFIG_FILE))?;
    Ok(Some((state, stored)))
}

fn new_run_id(root: &Path, fixed: Option<&str>) -> Result<String> {
    if let Some(id) = fixed {
        if root.join(id).join(STATE_FILE).exists() {
            bail!("Run {id} already exists in '{}'; use --resume to continue it", root.display());
        }
        return Ok(id.to_string());
    }

    loop {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ID_LEN)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect();
        if !root.join(&id).exists() {
            return Ok(id);
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed JSON in '{}'", path.display()))
}

/// Binary PGM (P5), one byte per pixel.
fn write_pgm(path: &Path, example: &ExamplePrediction) -> Result<()> {
    let mut bytes = format!("P5\n{} {}\n255\n", example.cols, example.rows).into_bytes();
    bytes.extend(
        example
            .pixels
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8),
    );
    fs::write(path, bytes).with_context(|| format!("Cannot write '{}'", path.display()))
}
