// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between raw files / raw sentences and the model:
//
//   Training                          Inference
//
//   aligned id files                  raw sentence
//       │                                 │
//       ▼                                 ▼
//   Bucketer  → DataSet               Windower → Window per word
//       │                                 │
//       └──────────┐         ┌────────────┘
//                  ▼         ▼
//                 build_batch (shared)
//                       │
//                       ▼
//               TranslationModel::step
//
// Each module is responsible for exactly one step, which makes
// each step independently testable.
//
// Reference: Rust Book §13 (Iterators and Closures)

/// Sorts aligned id files into length buckets
pub mod bucketer;

/// Slides a fixed-width window over a sentence
pub mod windower;

/// Pads and lays out one bucket's examples as a time-major batch
pub mod batcher;
