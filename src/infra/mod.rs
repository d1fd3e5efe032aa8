// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that touch the filesystem:
//
//   checkpoint.rs — which checkpoint to restore, when to save,
//                   the latest-step pointer and the saved run
//                   configuration. Parameter bytes themselves are
//                   written by the model's Persistable impl.
//
//   vocabulary.rs — vocabulary files → tokenizers word-level
//                   tokenizer plus a reverse token list.
//
//   metrics.rs    — per-checkpoint CSV of learning rate, step
//                   time and perplexity.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary files and token <-> id lookups
pub mod vocabulary;

/// Training metrics CSV logger
pub mod metrics;
