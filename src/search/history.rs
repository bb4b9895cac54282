//! Move-ordering history seam
//!
//! The history table is an external collaborator: the engine reports beta
//! cutoffs and principal moves into it and reads back ordering scores. All
//! operations are expected O(1) and are called on every node.

use crate::board::{Move, Player};

/// Move-ordering statistics table.
pub trait HistoryHeuristic {
    /// Ordering score for a move; higher means search it earlier
    fn score(&self, side: Player, mv: Move) -> i32;

    /// A move of `side` caused a beta cutoff at the given remaining depth
    fn record_cutoff(&mut self, side: Player, mv: Move, depth: i32);

    /// A move of `side` became the principal move at the given depth
    fn record_principal(&mut self, side: Player, mv: Move, depth: i32);

    /// Reset all statistics
    fn clear(&mut self);
}
