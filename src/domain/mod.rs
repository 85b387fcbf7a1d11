// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing a training run:
// hyperparameters, raw images, run state, and the collaborators
// the driver talks to.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls

// Hyperparameters of a run
pub mod config;

// Raw labelled images and the class names
pub mod images;

// Run state, start plan, epoch metrics
pub mod run;

// DatasetProvider and Tracker
pub mod traits;
