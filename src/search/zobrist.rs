//! Zobrist hashing for position identification
//!
//! Zobrist hashing allows O(1) incremental hash updates when placing or
//! removing stones. The keys are generated from a fixed seed so hashes are
//! deterministic across runs, which is useful for testing and debugging.
//!
//! The table is process-wide immutable state: built once before first use,
//! never mutated afterwards.

use std::sync::OnceLock;

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::board::{Move, Player, TOTAL_CELLS};

/// Fixed seed for reproducible keys.
const ZOBRIST_SEED: u64 = 0x1234_5678_9ABC_DEF0;

/// Zobrist key table for position hashing.
///
/// A position hash is the XOR of one key per occupied (cell, color) pair,
/// XORed with `side_key` when it is White's turn.
#[derive(Debug)]
pub struct ZobristTable {
    /// Keys for each (cell, color) pair
    cells: [[u64; 2]; TOTAL_CELLS],
    /// Key XORed in when White is to move
    white_to_move: u64,
}

static TABLE: OnceLock<ZobristTable> = OnceLock::new();

/// Shared process-wide Zobrist table.
#[inline]
pub fn zobrist() -> &'static ZobristTable {
    TABLE.get_or_init(ZobristTable::build)
}

impl ZobristTable {
    fn build() -> Self {
        let mut rng = SmallRng::seed_from_u64(ZOBRIST_SEED);

        let mut cells = [[0u64; 2]; TOTAL_CELLS];
        for cell in &mut cells {
            cell[0] = rng.next_u64();
            cell[1] = rng.next_u64();
        }

        Self {
            cells,
            white_to_move: rng.next_u64(),
        }
    }

    /// Key for a stone of `player` at `mv`
    #[inline]
    pub fn stone_key(&self, mv: Move, player: Player) -> u64 {
        self.cells[mv.to_index()][player.index()]
    }

    /// Side-to-move key (XORed in when White is to move)
    #[inline]
    pub fn side_key(&self) -> u64 {
        self.white_to_move
    }
}
