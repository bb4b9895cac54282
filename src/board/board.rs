//! Board structure with incremental Zobrist hashing
//!
//! The board owns all position state: occupancy bitboards for both colors,
//! the side to move, and a 64-bit Zobrist hash that is updated incrementally
//! on every mutation. The hash is always exactly the hash of the current
//! (occupancy, side-to-move) pair, so it can be used directly as a
//! transposition-table key.
//!
//! State is mutated only through paired `make_move`/`unmake_move` calls in
//! strict stack order (the most recent move must be undone first), plus a few
//! setup utilities that keep the hash consistent.

use super::bitboard::Bitboard;
use super::{Move, Player, BOARD_SIZE};
use crate::search::zobrist::zobrist;

/// Line directions used by win detection and candidate scans.
const DIRECTIONS: [(i32, i32); 4] = [
    (1, 0),  // Horizontal
    (0, 1),  // Vertical
    (1, 1),  // Diagonal NW-SE
    (1, -1), // Diagonal NE-SW
];

/// Chebyshev radius for candidate move generation.
const CANDIDATE_RADIUS: i32 = 2;

/// Game board with incremental position hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    black: Bitboard,
    white: Bitboard,
    side_to_move: Player,
    hash: u64,
}

impl Board {
    /// Create an empty board, Black to move.
    pub fn new() -> Self {
        Self {
            black: Bitboard::new(),
            white: Bitboard::new(),
            side_to_move: Player::Black,
            hash: 0,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        BOARD_SIZE
    }

    /// Get the stone at a position, `None` when empty
    #[inline]
    pub fn get(&self, mv: Move) -> Option<Player> {
        if self.black.get(mv) {
            Some(Player::Black)
        } else if self.white.get(mv) {
            Some(Player::White)
        } else {
            None
        }
    }

    /// Check if position is occupied by either color
    #[inline]
    pub fn is_occupied(&self, mv: Move) -> bool {
        self.black.get(mv) || self.white.get(mv)
    }

    #[inline]
    pub fn side_to_move(&self) -> Player {
        self.side_to_move
    }

    /// Current Zobrist hash of (occupancy, side-to-move)
    #[inline]
    pub fn hash_key(&self) -> u64 {
        self.hash
    }

    /// Play the side-to-move's stone at `(x, y)`.
    ///
    /// Returns `false` without touching any state when the coordinates are
    /// off the board or the cell is occupied. On success the stone is placed,
    /// the side to move flips, and the hash is updated in O(1).
    pub fn make_move(&mut self, mv: Move) -> bool {
        if !mv.in_bounds() || self.is_occupied(mv) {
            return false;
        }
        let player = self.side_to_move;
        self.stones_mut(player).set(mv);
        self.hash ^= zobrist().stone_key(mv, player);
        self.hash ^= zobrist().side_key();
        self.side_to_move = player.opponent();
        true
    }

    /// Undo the most recent successful `make_move` at `(x, y)`.
    ///
    /// Only well-defined when `mv` was the last move made; callers own the
    /// stack discipline. Returns `false` when the cell does not hold the
    /// previous mover's stone.
    pub fn unmake_move(&mut self, mv: Move) -> bool {
        if !mv.in_bounds() {
            return false;
        }
        let player = self.side_to_move.opponent();
        if self.get(mv) != Some(player) {
            debug_assert!(false, "unmake_move out of order at {mv}");
            return false;
        }
        self.stones_mut(player).clear(mv);
        self.hash ^= zobrist().stone_key(mv, player);
        self.hash ^= zobrist().side_key();
        self.side_to_move = player;
        true
    }

    /// Pass the turn without placing a stone (null-move pruning support).
    /// Flips only the side to move and its hash component, O(1).
    #[inline]
    pub fn make_null_move(&mut self) {
        self.side_to_move = self.side_to_move.opponent();
        self.hash ^= zobrist().side_key();
    }

    /// Exact inverse of `make_null_move`.
    #[inline]
    pub fn unmake_null_move(&mut self) {
        self.side_to_move = self.side_to_move.opponent();
        self.hash ^= zobrist().side_key();
    }

    /// Check whether `player` has five contiguous stones in any direction.
    ///
    /// Pure query, no side effects.
    pub fn check_win(&self, player: Player) -> bool {
        let stones = self.stones(player);
        for mv in stones.iter_ones() {
            for &(dx, dy) in &DIRECTIONS {
                // Only count from the start of a line to avoid rescans
                if let Some(prev) = mv.offset(-dx, -dy) {
                    if stones.get(prev) {
                        continue;
                    }
                }
                let mut count = 1;
                let mut cur = mv;
                while let Some(next) = cur.offset(dx, dy) {
                    if !stones.get(next) {
                        break;
                    }
                    count += 1;
                    cur = next;
                }
                if count >= 5 {
                    return true;
                }
            }
        }
        false
    }

    /// Every empty cell in row-major order.
    ///
    /// This is the exhaustive move list used by full-board scans; the main
    /// search prefers `get_candidate_moves`.
    pub fn get_legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(BOARD_SIZE * BOARD_SIZE);
        for y in 0..BOARD_SIZE as u8 {
            for x in 0..BOARD_SIZE as u8 {
                let mv = Move::new(x, y);
                if !self.is_occupied(mv) {
                    moves.push(mv);
                }
            }
        }
        moves
    }

    /// Empty cells within Chebyshev radius 2 of any existing stone, in
    /// row-major order.
    ///
    /// On an empty board this returns exactly the center cell.
    pub fn get_candidate_moves(&self) -> Vec<Move> {
        if self.is_board_empty() {
            let c = (BOARD_SIZE / 2) as u8;
            return vec![Move::new(c, c)];
        }

        let mut near = [false; BOARD_SIZE * BOARD_SIZE];
        for mv in self.black.iter_ones().chain(self.white.iter_ones()) {
            for dy in -CANDIDATE_RADIUS..=CANDIDATE_RADIUS {
                for dx in -CANDIDATE_RADIUS..=CANDIDATE_RADIUS {
                    if let Some(n) = mv.offset(dx, dy) {
                        near[n.to_index()] = true;
                    }
                }
            }
        }

        let mut moves = Vec::with_capacity(64);
        for y in 0..BOARD_SIZE as u8 {
            for x in 0..BOARD_SIZE as u8 {
                let mv = Move::new(x, y);
                if near[mv.to_index()] && !self.is_occupied(mv) {
                    moves.push(mv);
                }
            }
        }
        moves
    }

    /// Number of stones `player` has on the board, O(1) popcount
    #[inline]
    pub fn count_stones(&self, player: Player) -> u32 {
        self.stones(player).count()
    }

    /// Total stones on board
    #[inline]
    pub fn stone_count(&self) -> u32 {
        self.black.count() + self.white.count()
    }

    /// Check if board is empty
    #[inline]
    pub fn is_board_empty(&self) -> bool {
        self.black.is_empty() && self.white.is_empty()
    }

    /// Place a stone of an explicit color without touching the side to move.
    ///
    /// Setup utility only; the hash stays consistent. Use `make_move` for
    /// search moves.
    pub fn place_stone(&mut self, mv: Move, player: Player) -> bool {
        if !mv.in_bounds() || self.is_occupied(mv) {
            return false;
        }
        self.stones_mut(player).set(mv);
        self.hash ^= zobrist().stone_key(mv, player);
        true
    }

    /// Remove a stone of an explicit color. Setup utility only.
    pub fn remove_stone(&mut self, mv: Move, player: Player) -> bool {
        if !mv.in_bounds() || self.get(mv) != Some(player) {
            return false;
        }
        self.stones_mut(player).clear(mv);
        self.hash ^= zobrist().stone_key(mv, player);
        true
    }

    /// Set the side to move directly, keeping the hash consistent.
    pub fn set_side_to_move(&mut self, player: Player) {
        if self.side_to_move != player {
            self.side_to_move = player;
            self.hash ^= zobrist().side_key();
        }
    }

    /// Recompute the Zobrist hash from scratch (diagnostic; the incremental
    /// hash must always equal this).
    pub fn recompute_hash(&self) -> u64 {
        let zt = zobrist();
        let mut h = 0u64;
        for mv in self.black.iter_ones() {
            h ^= zt.stone_key(mv, Player::Black);
        }
        for mv in self.white.iter_ones() {
            h ^= zt.stone_key(mv, Player::White);
        }
        if self.side_to_move == Player::White {
            h ^= zt.side_key();
        }
        h
    }

    #[inline]
    fn stones(&self, player: Player) -> &Bitboard {
        match player {
            Player::Black => &self.black,
            Player::White => &self.white,
        }
    }

    #[inline]
    fn stones_mut(&mut self, player: Player) -> &mut Bitboard {
        match player {
            Player::Black => &mut self.black,
            Player::White => &mut self.white,
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
