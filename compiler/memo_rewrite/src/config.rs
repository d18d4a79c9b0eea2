//! Memo pass configuration.

use memo_cache::{MirrorWalkMode, MEMO_CACHE};

/// Settings of one [`MemoPass`](crate::MemoPass) run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoPassConfig {
    /// Cache the collector filled for this pass.
    pub cache_name: String,
    /// Clear that cache once every rewrite is applied.
    pub clear_after_pass: bool,
    /// Mirror mode used by the clone hook while the pass runs.
    pub mirror_mode: MirrorWalkMode,
}

impl Default for MemoPassConfig {
    fn default() -> Self {
        MemoPassConfig {
            cache_name: MEMO_CACHE.to_string(),
            clear_after_pass: true,
            mirror_mode: MirrorWalkMode::Full,
        }
    }
}
