// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Wires the other layers together for one goal: training,
// decoding or evaluating.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

/// Run configuration shared by every use case
pub mod config;

/// The training workflow and the self-test
pub mod train_use_case;

/// Interactive decoding and batch evaluation
pub mod decode_use_case;
