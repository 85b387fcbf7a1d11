// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Concerns shared by the other layers that don't belong to any
// one of them:
//
//   checkpoint.rs        — Saving and restoring a compiled model
//                          (weights, optimizer state, step and
//                          manifest) as one Burn record file.
//
//   metrics.rs           — Epoch metrics appended to a CSV file.
//
//   settings.rs          — Process settings from the environment
//                          and run-config defaults from
//                          config-defaults.json (figment).
//
//   tracker.rs           — The local experiment tracker: run ids,
//                          resume marker, history, artifacts and
//                          sample-prediction media.
//
//   tracking_callback.rs — Per-epoch hook that feeds the tracker
//                          and keeps the best model.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Compiled-model checkpoints
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Settings and run-config defaults
pub mod settings;

/// Filesystem experiment tracker
pub mod tracker;

/// Epoch callback reporting to the tracker
pub mod tracking_callback;
