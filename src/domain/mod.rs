// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits that define the core
// concepts of the system:
//
//   - buckets, examples and bucketed data sets
//   - the error taxonomy
//   - the model / persistence contracts
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Buckets, aligned examples and bucketed data sets
pub mod bucket;

// Fatal error taxonomy shared by every layer
pub mod error;

// Model and persistence contracts
pub mod traits;

// Reserved ids, sentinel tokens and the window width
pub mod tokens;
