//! Transposition table for caching search results
//!
//! The table stores search results indexed by position hash, enabling reuse
//! of previous results for positions reached through different move orders.
//! It is direct-mapped: each hash owns exactly one slot, with a
//! depth-preferred replacement policy and no chaining.
//!
//! Collisions are possible and must be detected, never assumed absent:
//! `probe` verifies the stored key and refuses to surface foreign data.
//!
//! Mate scores are stored distance-normalized (see [`TranspositionTable::to_tt_score`])
//! so an entry written at one ply stays correct when read back at another.
//!
//! Not safe for concurrent access; one search run uses the table at a time.

use crate::board::Move;

use super::types::{EvalScore, MATE_THRESHOLD};

/// Bound type for score interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Exact score - the search completed inside the window
    Exact,
    /// Lower bound - true score >= stored value (fail high)
    LowerBound,
    /// Upper bound - true score <= stored value (fail low)
    UpperBound,
}

/// Transposition table entry
#[derive(Debug, Clone, Copy)]
pub struct TTEntry {
    /// Position hash this entry belongs to
    pub key: u64,
    /// Root-relative search score, mate-distance-normalized in storage
    pub value: EvalScore,
    /// Root-relative static evaluation snapshot at storage time
    pub eval: EvalScore,
    /// Remaining search depth when the entry was stored
    pub depth: i32,
    pub node_type: NodeType,
    /// Best move found for this position
    pub best_move: Option<Move>,
}

/// Fixed-capacity transposition table.
pub struct TranspositionTable {
    entries: Vec<Option<TTEntry>>,
    capacity: usize,
}

impl TranspositionTable {
    /// Create a table with the given number of entry slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1024);
        Self {
            entries: vec![None; capacity],
            capacity,
        }
    }

    /// Look up the entry for `key`.
    ///
    /// Returns the slot contents only when the stored key matches exactly;
    /// a slot holding unrelated data reads as a miss.
    #[must_use]
    pub fn probe(&self, key: u64) -> Option<&TTEntry> {
        let entry = self.entries[(key as usize) % self.capacity].as_ref()?;
        if entry.key == key {
            Some(entry)
        } else {
            None
        }
    }

    /// Best move stored for `key`, for move ordering.
    ///
    /// Available even when the stored depth is too shallow to trust the
    /// score.
    #[must_use]
    pub fn best_move(&self, key: u64) -> Option<Move> {
        self.probe(key).and_then(|e| e.best_move)
    }

    /// Store a result with depth-preferred replacement.
    ///
    /// Writes when the slot is empty or the existing entry is no deeper
    /// than the incoming one (ties favor the newer entry); otherwise a
    /// no-op. `value` must already be normalized with `to_tt_score`.
    pub fn store(
        &mut self,
        key: u64,
        value: EvalScore,
        eval: EvalScore,
        depth: i32,
        node_type: NodeType,
        best_move: Option<Move>,
    ) {
        let idx = (key as usize) % self.capacity;
        let should_replace = match &self.entries[idx] {
            None => true,
            Some(e) => depth >= e.depth,
        };
        if should_replace {
            self.entries[idx] = Some(TTEntry {
                key,
                value,
                eval,
                depth,
                node_type,
                best_move,
            });
        }
    }

    /// Clear all entries.
    pub fn clear(&mut self) {
        self.entries.fill(None);
    }

    /// Convert a root-relative score into the stored form.
    ///
    /// A winning mate `MATE_SCORE - d` found `d` plies from the root, stored
    /// at a node `ply` plies from the root, is rewritten in
    /// distance-from-this-node form `MATE_SCORE - (d - ply)`. Losing mates
    /// mirror. Ordinary scores pass through unchanged. Without this, a mate
    /// score cached at one ply distance is wrong when reused at another.
    #[inline]
    #[must_use]
    pub fn to_tt_score(score: EvalScore, ply: i32) -> EvalScore {
        if score >= MATE_THRESHOLD {
            score + ply
        } else if score <= -MATE_THRESHOLD {
            score - ply
        } else {
            score
        }
    }

    /// Inverse of `to_tt_score`: rebase a stored mate score onto the
    /// probing node's ply, so "mate in 3 from here" reads as
    /// "mate in 3 + ply" from the root.
    #[inline]
    #[must_use]
    pub fn from_tt_score(score: EvalScore, ply: i32) -> EvalScore {
        if score >= MATE_THRESHOLD {
            score - ply
        } else if score <= -MATE_THRESHOLD {
            score + ply
        } else {
            score
        }
    }
}
