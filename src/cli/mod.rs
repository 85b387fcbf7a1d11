// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// The entry point for all user interaction. The command line
// carries a single switch: a trailing literal `--resume`.
// Everything else is accepted and ignored. Paths, run id and
// the sample count come from `FASHION_CNN_*` variables, the
// hyperparameter defaults from config-defaults.json.
//
// Wiring:
//   Settings + run defaults  → LocalTracker::init (run session)
//   FashionMnist             → dataset provider
//   TrainUseCase::execute    → RunReport, printed as a summary
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

use anyhow::Result;
use clap::Parser;
use std::{ffi::OsString, path::Path};

use crate::application::train_use_case::{resume_requested, TrainUseCase};
use crate::data::loader::FashionMnist;
use crate::infra::{
    settings::{run_defaults, Settings, CONFIG_DEFAULTS_FILE},
    tracker::LocalTracker,
};

#[cfg(not(feature = "wgpu"))]
type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;

#[cfg(feature = "wgpu")]
type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

#[derive(Parser, Debug)]
#[command(
    name = "fashion-cnn",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// Free arguments; only a trailing `--resume` has a meaning.
    /// Kept as raw OS strings so no argument can be rejected.
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        num_args = 0..,
        value_parser = clap::value_parser!(OsString)
    )]
    pub args: Vec<OsString>,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let resume   = resume_requested(&self.args);
        let settings = Settings::load()?;
        let defaults = run_defaults(Path::new(CONFIG_DEFAULTS_FILE))?;

        tracing::info!(
            "Starting training (resume requested: {}, tracker dir: '{}')",
            resume, settings.tracker_dir.display()
        );

        let tracker  = LocalTracker::init(
            &settings.tracker_dir,
            defaults,
            resume,
            settings.run_id.as_deref(),
        )?;
        let provider = FashionMnist::new(settings.data_dir.clone());

        let mut use_case = TrainUseCase::new(provider, tracker, settings, resume);
        let report       = use_case.execute::<TrainBackend>(&Default::default())?;

        println!("{report}");
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_any_arguments() {
        let cli = Cli::try_parse_from(["fashion-cnn", "--resume"]).unwrap();
        assert_eq!(cli.args, vec![OsString::from("--resume")]);

        let cli = Cli::try_parse_from(["fashion-cnn", "extra", "--help", "--resume"]).unwrap();
        assert!(resume_requested(&cli.args));

        let cli = Cli::try_parse_from(["fashion-cnn"]).unwrap();
        assert!(cli.args.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_arguments_are_ignored() {
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(vec![0xff]);
        let cli = Cli::try_parse_from([OsString::from("fashion-cnn"), raw.clone(), OsString::from("--resume")]).unwrap();
        assert!(resume_requested(&cli.args));

        let cli = Cli::try_parse_from([OsString::from("fashion-cnn"), raw]).unwrap();
        assert_eq!(cli.args.len(), 1);
        assert!(!resume_requested(&cli.args));
    }
}
