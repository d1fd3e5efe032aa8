// ============================================================
// Layer 3 — Reserved Tokens
// ============================================================
// Ids 0..=3 are reserved at the top of every vocabulary file.
// The window sentinels are plain vocabulary words as far as the
// model is concerned; only the windower gives them meaning.

pub const PAD_ID: u32 = 0;
pub const GO_ID:  u32 = 1;
pub const EOS_ID: u32 = 2;
pub const UNK_ID: u32 = 3;

pub const UNK_TOKEN: &str = "_UNK";

/// Sentinel that fills a window before the first word
pub const BOS_TOKEN: &str = "_BOS";

/// Sentinel that fills a window after the last word
pub const EOS_TOKEN: &str = "_EOS";

/// Number of tokens in every context window
pub const WINDOW_SIZE: usize = 5;
