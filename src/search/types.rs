//! Shared search types: scores, limits, and results

use crate::board::Move;

/// Evaluation score type used throughout the search.
///
/// Scores are root-relative: positive always favors the side that was to
/// move when the whole search started, at every depth of the tree.
pub type EvalScore = i32;

/// Upper bound for alpha-beta windows
pub const INFINITY_SCORE: EvalScore = i32::MAX / 4;

/// Base score for forced wins; a mate at ply `p` scores `MATE_SCORE - p`
pub const MATE_SCORE: EvalScore = INFINITY_SCORE - 1000;

/// Scores at or beyond this magnitude encode a mate distance
pub const MATE_THRESHOLD: EvalScore = MATE_SCORE - 512;

pub const DRAW_SCORE: EvalScore = 0;

/// Whether a score encodes a forced win or loss
#[inline]
pub fn is_mate_score(score: EvalScore) -> bool {
    score.abs() >= MATE_THRESHOLD
}

/// Configuration surface for one search run.
#[derive(Debug, Clone)]
pub struct SearchLimits {
    /// Maximum iterative-deepening depth in plies
    pub max_depth: i32,
    /// Maximum node count, 0 = unlimited
    pub max_nodes: u64,
    /// Wall-clock budget in milliseconds, 0 = unlimited
    pub time_limit_ms: u64,
    /// Extra budget granted while in panic mode
    pub panic_extra_time_ms: u64,
    pub enable_null_move: bool,
    pub enable_panic_mode: bool,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_nodes: 0,
            time_limit_ms: 1000,
            panic_extra_time_ms: 300,
            enable_null_move: true,
            enable_panic_mode: true,
        }
    }
}

/// Result of one `search_best_move` run.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    /// Best move found, if any
    pub best_move: Option<Move>,
    /// Root-relative score of the best move
    pub best_score: EvalScore,
    /// Deepest fully completed iteration
    pub depth_reached: i32,
    /// Score encodes a forced win or loss
    pub is_mate: bool,
    /// The time budget expired during the run
    pub is_timeout: bool,
    /// The threat solver certified a forced win at the root
    pub is_forced_win: bool,
    /// Principal variation from the root
    pub principal_variation: Vec<Move>,
    /// Main-search nodes visited
    pub nodes: u64,
    /// Quiescence nodes visited
    pub qnodes: u64,
    /// Transposition-table hits
    pub hash_hits: u64,
}
