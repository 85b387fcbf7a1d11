// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from IDX files on disk to device tensors:
//
//   IDX .gz files
//       │
//       ▼
//   FashionMnist      → reads (and downloads) the raw split
//       │
//       ▼
//   preprocessor      → [0,1] floats, channel axis, one-hot labels
//       │
//       ▼
//   ImageDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher      → stacks items into NCHW tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Loads Fashion-MNIST IDX files, downloading missing ones
pub mod loader;

/// Normalisation, reshaping and one-hot encoding
pub mod preprocessor;

/// Implements Burn's Dataset trait for preprocessed images
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
