//! Process settings and run-config defaults.
//!
//! Uses `figment` for layered configuration:
//!   settings:   built-in defaults -> `FASHION_CNN_*` environment
//!   run config: built-in defaults -> `config-defaults.json`
//!
//! The command line stays reserved for the trailing `--resume`.

use anyhow::{anyhow, Result};
use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::config::RunConfig;

pub const ENV_PREFIX: &str = "FASHION_CNN_";
pub const CONFIG_DEFAULTS_FILE: &str = "config-defaults.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding (or receiving) the Fashion-MNIST IDX files.
    pub data_dir:    PathBuf,
    /// Root of the local tracker's run directories.
    pub tracker_dir: PathBuf,
    /// Final model file; the recorder sets the `.mpk` extension.
    pub output:      PathBuf,
    /// Fixed id for a new run instead of a random one.
    pub run_id:      Option<String>,
    /// Sample predictions logged per epoch.
    pub examples:    usize,
    /// Seed of the training-set shuffle.
    pub seed:        u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir:    PathBuf::from("data/fashion-mnist"),
            tracker_dir: PathBuf::from("runs"),
            output:      PathBuf::from("cnn"),
            run_id:      None,
            examples:    36,
            seed:        42,
        }
    }
}

impl Settings {
    /// Defaults overridden by `FASHION_CNN_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::extract(Self::figment(ENV_PREFIX))
    }

    fn figment(prefix: &str) -> Figment {
        Figment::from(Serialized::defaults(Settings::default())).merge(Env::prefixed(prefix))
    }

    fn extract(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| anyhow!("Invalid settings: {e}"))
    }
}

/// Built-in hyperparameters, overridden by `path` when it exists.
pub fn run_defaults(path: &Path) -> Result<RunConfig> {
    Figment::from(Serialized::defaults(RunConfig::default()))
        .merge(Json::file(path))
        .extract()
        .map_err(|e| anyhow!("Invalid run defaults in '{}': {e}", path.display()))
}
