// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model and optimisation code lives here.
//
//   model.rs      — the CNN: conv/pool ×2, dropout, two dense
//                   layers, categorical cross-entropy loss
//
//   optimizer.rs  — Nesterov SGD with inverse-time lr decay,
//                   and the Compiled model (weights + optimizer
//                   state + step counter + manifest)
//
//   trainer.rs    — the epoch loop with validation and
//                   per-epoch callbacks
//
//   inferencer.rs — class predictions for sample images
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

/// CNN architecture
pub mod model;

/// SGD configuration and the compiled model
pub mod optimizer;

/// Training loop with validation and callbacks
pub mod trainer;

/// Class predictions for sample images
pub mod inferencer;
