//! Iterative-deepening alpha-beta search engine
//!
//! The engine fuses the board, the transposition table, the time manager,
//! and the threat solver into one search:
//!
//! 1. The threat solver is asked for a certified forced win at the root;
//!    a proof short-circuits the whole search.
//! 2. Iterative deepening runs alpha-beta from depth 1 upward, each
//!    completed depth overwriting the stored result, so a mid-depth stop
//!    still returns the deepest completed answer.
//! 3. At each node: transposition probe, threat-solver consultation
//!    (immediate wins, forced-loss detection, defensive-move restriction),
//!    null-move pruning, then the move loop. Depth zero falls into a
//!    quiescence search that only follows forcing placements.
//!
//! All scores are root-relative: positive always favors the side that was
//! to move when `search_best_move` was called, at every node of the tree.
//! The tree maximizes on the root side's turns and minimizes on the
//! opponent's, and the evaluator is always invoked with the root side as
//! its perspective, so scores are comparable across the whole tree.
//!
//! Cancellation is cooperative: the clock is polled at bounded node
//! intervals and every unwind completes its pending undos, leaving the
//! board and solver exactly as they were.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::board::{Board, Move, Player, BOARD_SIZE};

use super::evaluator::Evaluator;
use super::history::HistoryHeuristic;
use super::pattern::ThreatType;
use super::threat::{ThreatSearchLimits, ThreatSolver};
use super::time::TimeManager;
use super::tt::{NodeType, TranspositionTable};
use super::types::{
    is_mate_score, EvalScore, SearchLimits, SearchResult, DRAW_SCORE, INFINITY_SCORE, MATE_SCORE,
};

/// Default transposition table capacity in entries.
const DEFAULT_TT_CAPACITY: usize = 1 << 20;

/// Minimum remaining depth for the defensive-set consultation at a node.
const THREAT_SOLVE_MIN_DEPTH: i32 = 3;

/// Threat-search budget for root certification.
const ROOT_THREAT_NODES: u32 = 20_000;
const ROOT_THREAT_DEPTH: u32 = 12;

/// Threat-search budget at interior nodes.
const NODE_THREAT_NODES: u32 = 2_000;
const NODE_THREAT_DEPTH: u32 = 6;

/// Maximum quiescence extension in plies of forcing moves.
const MAX_QS_DEPTH: i32 = 8;

/// Forcing moves tried per quiescence node.
const MAX_QS_MOVES: usize = 6;

/// Null-move depth reduction.
const NULL_MOVE_REDUCTION_DEEP: i32 = 3;
const NULL_MOVE_REDUCTION: i32 = 2;

/// Score collapse between completed depths that triggers panic mode.
/// Tuned for evaluators in the low-thousands range.
const PANIC_SCORE_DROP: EvalScore = 400;

const MAX_PV_LENGTH: usize = 32;

/// Alpha-beta search engine over pluggable evaluator, history table, and
/// threat solver.
///
/// One instance runs one search at a time; nothing here is safe for
/// concurrent use.
pub struct SearchEngine {
    evaluator: Box<dyn Evaluator>,
    threat: Box<dyn ThreatSolver>,
    history: Box<dyn HistoryHeuristic>,
    tt: TranspositionTable,
    time: TimeManager,
    /// Abort signal handed to in-flight threat searches when the clock stops
    stop_flag: Arc<AtomicBool>,
    limits: SearchLimits,
    board: Board,
    root_side: Player,
    root_restriction: Option<Vec<Move>>,
    in_panic: bool,
    last_result: SearchResult,
    nodes: u64,
    qnodes: u64,
    hash_hits: u64,
}

impl SearchEngine {
    /// Create an engine with the default transposition table size.
    pub fn new(
        evaluator: Box<dyn Evaluator>,
        threat_solver: Box<dyn ThreatSolver>,
        history: Box<dyn HistoryHeuristic>,
    ) -> Self {
        Self::with_tt_capacity(evaluator, threat_solver, history, DEFAULT_TT_CAPACITY)
    }

    /// Create an engine with an explicit transposition table capacity.
    pub fn with_tt_capacity(
        evaluator: Box<dyn Evaluator>,
        threat_solver: Box<dyn ThreatSolver>,
        history: Box<dyn HistoryHeuristic>,
        tt_capacity: usize,
    ) -> Self {
        Self {
            evaluator,
            threat: threat_solver,
            history,
            tt: TranspositionTable::new(tt_capacity),
            time: TimeManager::new(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            limits: SearchLimits::default(),
            board: Board::new(),
            root_side: Player::Black,
            root_restriction: None,
            in_panic: false,
            last_result: SearchResult::default(),
            nodes: 0,
            qnodes: 0,
            hash_hits: 0,
        }
    }

    /// Search the given position for the best move under `limits`.
    ///
    /// The engine works on its own copy of `board`; the argument is left
    /// untouched. The side to move is taken from the position.
    pub fn search_best_move(&mut self, board: &Board, limits: &SearchLimits) -> SearchResult {
        self.board = board.clone();
        self.root_side = board.side_to_move();
        self.limits = limits.clone();
        self.time.start(limits);
        self.stop_flag.store(false, Ordering::Relaxed);
        self.threat.sync_from_board(&self.board);
        self.history.clear();
        self.in_panic = false;
        self.nodes = 0;
        self.qnodes = 0;
        self.hash_hits = 0;
        self.last_result = SearchResult::default();
        self.root_restriction = None;

        let flag = Arc::clone(&self.stop_flag);
        let root_threat_limits = ThreatSearchLimits {
            max_nodes: ROOT_THREAT_NODES,
            max_depth: ROOT_THREAT_DEPTH,
            abort: Some(&*flag),
        };

        // Solver certification first: a proven forcing sequence beats any
        // heuristic search result.
        if let Some(seq) = self
            .threat
            .find_winning_threat_sequence(self.root_side, &root_threat_limits)
        {
            let (best_move, mate_ply) = match seq.attacker_moves.first() {
                Some(&first) => (Some(first), seq.attacker_moves.len() as i32 * 2 - 1),
                // A five already on the board; any reply keeps the win.
                None => (self.board.get_candidate_moves().first().copied(), 0),
            };
            log::debug!(
                "forced win certified for {:?} in {} forcing moves",
                self.root_side,
                seq.attacker_moves.len()
            );
            self.last_result = SearchResult {
                best_move,
                best_score: MATE_SCORE - mate_ply,
                depth_reached: 0,
                is_mate: true,
                is_timeout: false,
                is_forced_win: true,
                principal_variation: seq.attacker_moves,
                nodes: 0,
                qnodes: 0,
                hash_hits: 0,
            };
            return self.last_result.clone();
        }

        // When the opponent threatens a forced win, restrict the root to
        // the moves that survive it.
        let defense = self
            .threat
            .compute_defensive_set(self.root_side, &root_threat_limits);
        if defense.is_lost {
            log::debug!("root position is tactically lost; searching for resistance");
            self.in_panic = self.limits.enable_panic_mode;
        } else if !defense.defensive_moves.is_empty() {
            self.root_restriction = Some(defense.defensive_moves);
        }

        self.iterative_deepening();

        if self.last_result.best_move.is_none() {
            // Stopped before depth 1 finished anything; any candidate beats
            // forfeiting.
            self.last_result.best_move = self.board.get_candidate_moves().first().copied();
        }
        self.last_result.nodes = self.nodes;
        self.last_result.qnodes = self.qnodes;
        self.last_result.hash_hits = self.hash_hits;
        self.last_result.clone()
    }

    /// Result of the most recent `search_best_move` call.
    pub fn last_search_result(&self) -> &SearchResult {
        &self.last_result
    }

    pub fn clear_transposition_table(&mut self) {
        self.tt.clear();
    }

    fn iterative_deepening(&mut self) {
        let max_depth = self.limits.max_depth.max(1);
        let mut prev_score: Option<EvalScore> = None;

        for depth in 1..=max_depth {
            let (best_move, score) = self.search_root(depth);

            if self.time.is_stopped() {
                self.last_result.is_timeout = self.time.stopped_on_time();
                // A partial answer from the interrupted depth is still
                // better than none at all.
                if self.last_result.best_move.is_none() {
                    self.last_result.best_move = best_move;
                    self.last_result.best_score = score;
                }
                break;
            }

            self.last_result.best_move = best_move;
            self.last_result.best_score = score;
            self.last_result.depth_reached = depth;
            self.last_result.is_mate = is_mate_score(score);
            self.last_result.principal_variation =
                self.extract_principal_variation(MAX_PV_LENGTH);

            log::debug!(
                "depth {depth}: score {score} best {best_move:?} nodes {} qnodes {} tt {}",
                self.nodes,
                self.qnodes,
                self.hash_hits
            );

            if is_mate_score(score) {
                break;
            }

            if self.limits.enable_panic_mode {
                if let Some(prev) = prev_score {
                    if score + PANIC_SCORE_DROP <= prev {
                        self.in_panic = true;
                    }
                }
                if self.threat.has_forcing_threat(self.root_side.opponent()) {
                    self.in_panic = true;
                }
            }
            prev_score = Some(score);
        }
    }

    /// Full-window search of the root's moves at the given depth.
    fn search_root(&mut self, depth: i32) -> (Option<Move>, EvalScore) {
        let mut alpha = -INFINITY_SCORE;
        let beta = INFINITY_SCORE;
        let hash = self.board.hash_key();
        let tt_move = self.tt.best_move(hash);

        let candidates = match &self.root_restriction {
            Some(moves) => moves.clone(),
            None => self.board.get_candidate_moves(),
        };
        let moves = self.order_moves(candidates, self.root_side, tt_move);
        if moves.is_empty() {
            return (None, DRAW_SCORE);
        }

        let mut best: EvalScore = -INFINITY_SCORE;
        let mut best_move: Option<Move> = None;

        for (i, &mv) in moves.iter().enumerate() {
            self.make(mv);
            let score = self.search(depth - 1, alpha, beta, 1, true, i == 0);
            self.unmake(mv);

            if self.time.is_stopped() {
                break;
            }
            if score > best {
                best = score;
                best_move = Some(mv);
            }
            alpha = alpha.max(score);
        }

        if !self.time.is_stopped() {
            if let Some(bm) = best_move {
                self.history.record_principal(self.root_side, bm, depth);
                self.tt.store(
                    hash,
                    TranspositionTable::to_tt_score(best, 0),
                    best,
                    depth,
                    NodeType::Exact,
                    Some(bm),
                );
            }
        }
        (best_move, best)
    }

    /// Alpha-beta recursion over root-relative scores.
    fn search(
        &mut self,
        depth: i32,
        mut alpha: EvalScore,
        mut beta: EvalScore,
        ply: i32,
        allow_null: bool,
        in_pv: bool,
    ) -> EvalScore {
        self.nodes += 1;
        self.poll_clock();
        if self.time.is_stopped() {
            return 0;
        }

        let side = self.board.side_to_move();
        let just_moved = side.opponent();
        if self.board.check_win(just_moved) {
            return self.win_score(just_moved, ply);
        }

        let original_alpha = alpha;
        let original_beta = beta;
        let hash = self.board.hash_key();

        if let Some(entry) = self.tt.probe(hash) {
            self.hash_hits += 1;
            if entry.depth >= depth {
                let value = TranspositionTable::from_tt_score(entry.value, ply);
                match entry.node_type {
                    NodeType::Exact if !in_pv => return value,
                    NodeType::Exact => {}
                    NodeType::LowerBound => alpha = alpha.max(value),
                    NodeType::UpperBound => beta = beta.min(value),
                }
                if alpha >= beta {
                    return value;
                }
            }
        }

        // One move to a five: no need to expand children.
        if self.threat.has_immediate_winning_threat(side) {
            return self.win_score(side, ply + 1);
        }

        // Deep nodes consult the full forcing-sequence search; a proven
        // loss cuts immediately, otherwise surviving defenses restrict the
        // children.
        let mut restriction: Option<Vec<Move>> = None;
        if depth >= THREAT_SOLVE_MIN_DEPTH {
            let flag = Arc::clone(&self.stop_flag);
            let node_limits = ThreatSearchLimits {
                max_nodes: NODE_THREAT_NODES,
                max_depth: NODE_THREAT_DEPTH,
                abort: Some(&*flag),
            };
            let defense = self.threat.compute_defensive_set(side, &node_limits);
            if defense.is_lost {
                return self.win_score(just_moved, ply + 2);
            }
            if !defense.defensive_moves.is_empty() {
                restriction = Some(defense.defensive_moves);
            }
        }

        if depth <= 0 {
            return self.quiescence(alpha, beta, ply, 0);
        }

        let maximizing = side == self.root_side;

        if allow_null && restriction.is_none() && self.can_do_null_move(depth) {
            let reduction = if depth >= 5 {
                NULL_MOVE_REDUCTION_DEEP
            } else {
                NULL_MOVE_REDUCTION
            };
            self.board.make_null_move();
            let score = if maximizing {
                self.search(depth - 1 - reduction, beta - 1, beta, ply + 1, false, false)
            } else {
                self.search(depth - 1 - reduction, alpha, alpha + 1, ply + 1, false, false)
            };
            self.board.unmake_null_move();

            if !self.time.is_stopped() {
                if maximizing && score >= beta {
                    return beta;
                }
                if !maximizing && score <= alpha {
                    return alpha;
                }
            }
        }

        let tt_move = self.tt.best_move(hash);
        let candidates = restriction.unwrap_or_else(|| self.board.get_candidate_moves());
        let moves = self.order_moves(candidates, side, tt_move);
        if moves.is_empty() {
            return DRAW_SCORE;
        }

        let mut best: EvalScore = if maximizing {
            -INFINITY_SCORE
        } else {
            INFINITY_SCORE
        };
        let mut best_move: Option<Move> = None;

        for (i, &mv) in moves.iter().enumerate() {
            self.make(mv);
            let score = self.search(depth - 1, alpha, beta, ply + 1, true, in_pv && i == 0);
            self.unmake(mv);

            if self.time.is_stopped() {
                return 0;
            }

            if maximizing {
                if score > best {
                    best = score;
                    best_move = Some(mv);
                }
                alpha = alpha.max(score);
            } else {
                if score < best {
                    best = score;
                    best_move = Some(mv);
                }
                beta = beta.min(score);
            }
            if alpha >= beta {
                self.history.record_cutoff(side, mv, depth);
                break;
            }
        }

        let node_type = if best <= original_alpha {
            NodeType::UpperBound
        } else if best >= original_beta {
            NodeType::LowerBound
        } else {
            NodeType::Exact
        };
        if node_type == NodeType::Exact {
            if let Some(bm) = best_move {
                self.history.record_principal(side, bm, depth);
            }
        }
        self.tt.store(
            hash,
            TranspositionTable::to_tt_score(best, ply),
            best,
            depth,
            node_type,
            best_move,
        );

        best
    }

    /// Forcing-move extension at the horizon.
    ///
    /// Follows fives, must-answer blocks, and four-creating placements
    /// only, bounded in depth, then stands on the static evaluation.
    fn quiescence(
        &mut self,
        mut alpha: EvalScore,
        mut beta: EvalScore,
        ply: i32,
        qs_depth: i32,
    ) -> EvalScore {
        self.qnodes += 1;
        self.poll_clock();
        if self.time.is_stopped() {
            return 0;
        }

        let side = self.board.side_to_move();
        let just_moved = side.opponent();
        if self.board.check_win(just_moved) {
            return self.win_score(just_moved, ply);
        }
        if self.threat.immediate_winning_move(side).is_some() {
            return self.win_score(side, ply + 1);
        }

        let maximizing = side == self.root_side;

        // Opponent five-completions. One stone can only cover one of them.
        let mut block_cells: Vec<Move> = Vec::new();
        for mv in self.board.get_candidate_moves() {
            if self
                .threat
                .threats_at(just_moved, mv)
                .iter()
                .any(|t| *t == ThreatType::Five)
            {
                block_cells.push(mv);
            }
        }
        if block_cells.len() > 1 {
            return self.win_score(just_moved, ply + 2);
        }
        let forced = !block_cells.is_empty();

        let stand_pat = self.evaluator.evaluate(&self.board, self.root_side);
        if !forced {
            if maximizing {
                if stand_pat >= beta {
                    return stand_pat;
                }
                alpha = alpha.max(stand_pat);
            } else {
                if stand_pat <= alpha {
                    return stand_pat;
                }
                beta = beta.min(stand_pat);
            }
        }
        if qs_depth >= MAX_QS_DEPTH {
            return stand_pat;
        }

        let moves: Vec<Move> = if forced {
            block_cells
        } else {
            let mut scored: Vec<(Move, u8)> = Vec::new();
            for mv in self.board.get_candidate_moves() {
                let rank = self
                    .threat
                    .threats_at(side, mv)
                    .iter()
                    .map(|t| t.rank())
                    .max()
                    .unwrap_or(0);
                if rank >= ThreatType::SimpleFour.rank() {
                    scored.push((mv, rank));
                }
            }
            scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            scored.truncate(MAX_QS_MOVES);
            scored.into_iter().map(|(mv, _)| mv).collect()
        };

        if moves.is_empty() {
            return stand_pat;
        }

        let mut best = if forced {
            if maximizing {
                -INFINITY_SCORE
            } else {
                INFINITY_SCORE
            }
        } else {
            stand_pat
        };

        for mv in moves {
            self.make(mv);
            let score = self.quiescence(alpha, beta, ply + 1, qs_depth + 1);
            self.unmake(mv);

            if self.time.is_stopped() {
                return 0;
            }

            if maximizing {
                if score > best {
                    best = score;
                }
                alpha = alpha.max(score);
            } else {
                if score < best {
                    best = score;
                }
                beta = beta.min(score);
            }
            if alpha >= beta {
                break;
            }
        }
        best
    }

    /// Null-move preconditions: enabled, not near the leaves, and no active
    /// opponent forcing threat (the move-skipping assumption breaks under
    /// tactical pressure).
    fn can_do_null_move(&self, depth: i32) -> bool {
        self.limits.enable_null_move
            && depth >= 3
            && !self
                .threat
                .has_forcing_threat(self.board.side_to_move().opponent())
    }

    /// Order candidates: transposition move first, then history score, then
    /// board proximity and centrality.
    fn order_moves(&self, candidates: Vec<Move>, side: Player, tt_move: Option<Move>) -> Vec<Move> {
        let center = (BOARD_SIZE / 2) as i32;
        let mut scored: Vec<((i32, i32, i32), Move)> = candidates
            .into_iter()
            .map(|mv| {
                let is_tt = i32::from(Some(mv) == tt_move);
                let hist = self.history.score(side, mv);
                let mut adjacent = 0;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        if let Some(n) = mv.offset(dx, dy) {
                            if self.board.is_occupied(n) {
                                adjacent += 1;
                            }
                        }
                    }
                }
                let dist = (i32::from(mv.x) - center)
                    .abs()
                    .max((i32::from(mv.y) - center).abs());
                ((is_tt, hist, adjacent * 4 - dist), mv)
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.into_iter().map(|(_, mv)| mv).collect()
    }

    /// Walk transposition-table best moves forward from the root position,
    /// truncating at the first missing, stale, or illegal entry.
    fn extract_principal_variation(&self, max_len: usize) -> Vec<Move> {
        let mut pv = Vec::new();
        let mut board = self.board.clone();
        while pv.len() < max_len {
            let Some(mv) = self.tt.best_move(board.hash_key()) else {
                break;
            };
            if !board.make_move(mv) {
                break;
            }
            pv.push(mv);
        }
        pv
    }

    /// Mate score for `winner` reached at `ply`, root-relative.
    #[inline]
    fn win_score(&self, winner: Player, ply: i32) -> EvalScore {
        if winner == self.root_side {
            MATE_SCORE - ply
        } else {
            -(MATE_SCORE - ply)
        }
    }

    /// Make a search move, keeping the threat solver synchronized.
    #[inline]
    fn make(&mut self, mv: Move) {
        let mover = self.board.side_to_move();
        let made = self.board.make_move(mv);
        debug_assert!(made, "search generated illegal move {mv}");
        self.threat.notify_move(mv, mover);
    }

    /// Undo a search move made by `make`.
    #[inline]
    fn unmake(&mut self, mv: Move) {
        let undone = self.board.unmake_move(mv);
        debug_assert!(undone, "unmake out of order at {mv}");
        self.threat.notify_undo(mv, self.board.side_to_move());
    }

    /// Poll the budget at bounded node intervals; on stop, abort in-flight
    /// threat searches as well.
    #[inline]
    fn poll_clock(&mut self) {
        let visited = self.nodes + self.qnodes;
        if visited & 1023 == 0 && self.time.check_stop_condition(visited, self.in_panic) {
            self.stop_flag.store(true, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::TOTAL_CELLS;
    use crate::search::pattern::Direction;
    use crate::search::threat::{
        DefensiveSet, ThreatAnalysis, ThreatInstance, ThreatSearcher, ThreatSequence,
    };

    /// Evaluator double: prefers stones near the center, symmetric between
    /// the players so root-relative scores stay consistent.
    struct CenterEvaluator;

    impl Evaluator for CenterEvaluator {
        fn evaluate(&mut self, board: &Board, perspective: Player) -> EvalScore {
            let center = (BOARD_SIZE / 2) as i32;
            let mut score = 0;
            for idx in 0..TOTAL_CELLS {
                let mv = Move::from_index(idx);
                let weight = 2 * center
                    - (i32::from(mv.x) - center).abs()
                    - (i32::from(mv.y) - center).abs();
                match board.get(mv) {
                    Some(p) if p == perspective => score += weight,
                    Some(_) => score -= weight,
                    None => {}
                }
            }
            score
        }
    }

    /// Array-backed history table in the shape the engine expects.
    struct ArrayHistory {
        table: [[i32; TOTAL_CELLS]; 2],
    }

    impl ArrayHistory {
        fn new() -> Self {
            Self {
                table: [[0; TOTAL_CELLS]; 2],
            }
        }
    }

    impl HistoryHeuristic for ArrayHistory {
        fn score(&self, side: Player, mv: Move) -> i32 {
            self.table[side.index()][mv.to_index()]
        }

        fn record_cutoff(&mut self, side: Player, mv: Move, depth: i32) {
            self.table[side.index()][mv.to_index()] += depth * depth;
        }

        fn record_principal(&mut self, side: Player, mv: Move, depth: i32) {
            self.table[side.index()][mv.to_index()] += depth;
        }

        fn clear(&mut self) {
            self.table = [[0; TOTAL_CELLS]; 2];
        }
    }

    /// Threat-solver double that reports no tactics at all, so the engine
    /// can be exercised without a real solver.
    struct NullThreatSolver;

    impl ThreatSolver for NullThreatSolver {
        fn sync_from_board(&mut self, _board: &Board) {}
        fn notify_move(&mut self, _mv: Move, _player: Player) {}
        fn notify_undo(&mut self, _mv: Move, _player: Player) {}

        fn analyze_threats(
            &mut self,
            _attacker: Player,
            _limits: &ThreatSearchLimits,
        ) -> ThreatAnalysis {
            ThreatAnalysis::default()
        }

        fn find_winning_threat_sequence(
            &mut self,
            _attacker: Player,
            _limits: &ThreatSearchLimits,
        ) -> Option<ThreatSequence> {
            None
        }

        fn compute_defensive_set(
            &mut self,
            _defender: Player,
            _limits: &ThreatSearchLimits,
        ) -> DefensiveSet {
            DefensiveSet::default()
        }

        fn has_immediate_winning_threat(&self, _attacker: Player) -> bool {
            false
        }

        fn immediate_winning_move(&self, _attacker: Player) -> Option<Move> {
            None
        }

        fn has_forcing_threat(&self, _attacker: Player) -> bool {
            false
        }

        fn collect_current_forcing_threats(&self, _attacker: Player) -> Vec<ThreatInstance> {
            Vec::new()
        }

        fn threat_at(&self, _attacker: Player, _mv: Move, _direction: Direction) -> ThreatType {
            ThreatType::None
        }

        fn threats_at(&self, _attacker: Player, _mv: Move) -> [ThreatType; 4] {
            [ThreatType::None; 4]
        }
    }

    fn board_with(black: &[(u8, u8)], white: &[(u8, u8)]) -> Board {
        let mut board = Board::new();
        for &(x, y) in black {
            assert!(board.place_stone(Move::new(x, y), Player::Black));
        }
        for &(x, y) in white {
            assert!(board.place_stone(Move::new(x, y), Player::White));
        }
        board
    }

    fn engine() -> SearchEngine {
        SearchEngine::with_tt_capacity(
            Box::new(CenterEvaluator),
            Box::new(ThreatSearcher::new(&Board::new())),
            Box::new(ArrayHistory::new()),
            1 << 14,
        )
    }

    fn engine_without_tactics() -> SearchEngine {
        SearchEngine::with_tt_capacity(
            Box::new(CenterEvaluator),
            Box::new(NullThreatSolver),
            Box::new(ArrayHistory::new()),
            1 << 14,
        )
    }

    fn limits(max_depth: i32, max_nodes: u64) -> SearchLimits {
        SearchLimits {
            max_depth,
            max_nodes,
            time_limit_ms: 0,
            ..SearchLimits::default()
        }
    }

    #[test]
    fn completes_own_open_four() {
        let board = board_with(&[(4, 6), (5, 6), (6, 6), (7, 6)], &[]);
        let result = engine().search_best_move(&board, &limits(6, 0));

        assert!(result.is_forced_win);
        assert!(result.is_mate);
        assert!(is_mate_score(result.best_score));
        assert!(result.best_score > 0);

        let mv = result.best_move.expect("winning move");
        assert!(mv == Move::new(3, 6) || mv == Move::new(8, 6));
        assert_eq!(result.principal_variation.first(), Some(&mv));

        let mut replay = board.clone();
        assert!(replay.make_move(mv));
        assert!(replay.check_win(Player::Black));
    }

    #[test]
    fn blocks_opponent_simple_four() {
        // White threatens (7, 3); Black has nothing better than blocking.
        let board = board_with(
            &[(2, 3), (5, 5), (6, 5), (0, 0)],
            &[(3, 3), (4, 3), (5, 3), (6, 3)],
        );
        let result = engine().search_best_move(&board, &limits(4, 200_000));

        assert_eq!(result.best_move, Some(Move::new(7, 3)));
        assert!(!result.is_forced_win);
    }

    #[test]
    fn certified_forced_win_via_double_four() {
        let board = board_with(
            &[(2, 2), (3, 2), (4, 2), (5, 3), (5, 4), (5, 5)],
            &[(1, 2), (5, 6), (9, 9)],
        );
        let result = engine().search_best_move(&board, &limits(6, 0));

        assert!(result.is_forced_win);
        assert_eq!(result.best_move, Some(Move::new(5, 2)));
        assert!(result.principal_variation.len() >= 2);
    }

    #[test]
    fn node_limit_stops_without_timeout_flag() {
        // Quiet midgame: no forced result, so the node cap is what ends the run.
        let board = board_with(
            &[(5, 5), (6, 6), (4, 6), (7, 5)],
            &[(5, 6), (6, 5), (4, 4), (8, 8)],
        );
        let result = engine().search_best_move(
            &board,
            &SearchLimits {
                max_depth: 32,
                max_nodes: 1000,
                time_limit_ms: 0,
                ..SearchLimits::default()
            },
        );

        assert!(!result.is_timeout, "node cap is not a timeout");
        assert!(result.best_move.is_some());
        // The cap is polled at bounded granularity, not per node.
        assert!(
            result.nodes + result.qnodes <= 1000 + 1100,
            "ran {} nodes + {} qnodes past a 1000 node cap",
            result.nodes,
            result.qnodes
        );
    }

    #[test]
    fn engine_works_with_null_tactics_double() {
        let board = board_with(&[(5, 5), (6, 6)], &[(5, 6), (6, 5)]);
        let result = engine_without_tactics().search_best_move(&board, &limits(2, 0));

        assert!(result.best_move.is_some());
        assert_eq!(result.depth_reached, 2);
        assert!(!result.is_forced_win);
        assert!(!result.is_mate);
    }

    #[test]
    fn search_is_deterministic_across_fresh_engines() {
        let board = board_with(&[(5, 5), (6, 6), (7, 7)], &[(5, 6), (6, 5), (4, 4)]);
        let a = engine().search_best_move(&board, &limits(3, 0));
        let b = engine().search_best_move(&board, &limits(3, 0));

        assert_eq!(a.best_move, b.best_move);
        assert_eq!(a.best_score, b.best_score);
        assert_eq!(a.depth_reached, b.depth_reached);
    }

    #[test]
    fn principal_variation_is_playable_and_starts_with_best() {
        let board = board_with(&[(5, 5), (6, 6)], &[(5, 6), (6, 5)]);
        let result = engine().search_best_move(&board, &limits(3, 0));

        assert!(!result.principal_variation.is_empty());
        assert_eq!(result.principal_variation.first(), result.best_move.as_ref());

        let mut replay = board.clone();
        for &mv in &result.principal_variation {
            assert!(replay.make_move(mv), "pv move {mv} must be legal in order");
        }
    }

    #[test]
    fn lost_root_still_produces_a_move() {
        // White owns two independent open threes; Black is tactically lost
        // but must still pick something.
        let board = board_with(
            &[(0, 11), (1, 11), (11, 11)],
            &[(3, 2), (4, 2), (5, 2), (9, 6), (9, 7), (9, 8)],
        );
        let result = engine().search_best_move(&board, &limits(2, 100_000));

        assert!(result.best_move.is_some());
    }

    #[test]
    fn disabled_null_move_still_blocks_threats() {
        let board = board_with(
            &[(2, 3), (5, 5), (6, 5), (0, 0)],
            &[(3, 3), (4, 3), (5, 3), (6, 3)],
        );
        let mut config = limits(4, 200_000);
        config.enable_null_move = false;
        let result = engine().search_best_move(&board, &config);

        assert_eq!(result.best_move, Some(Move::new(7, 3)));
    }

    #[test]
    fn full_board_is_a_draw() {
        // Tiling with period-4 color classes; no five-in-a-row anywhere.
        let mut board = Board::new();
        for idx in 0..TOTAL_CELLS {
            let mv = Move::from_index(idx);
            let player = if (mv.x as usize + 2 * mv.y as usize) % 4 < 2 {
                Player::Black
            } else {
                Player::White
            };
            assert!(board.place_stone(mv, player));
        }
        assert!(!board.check_win(Player::Black));
        assert!(!board.check_win(Player::White));

        let result = engine().search_best_move(&board, &limits(3, 0));
        assert!(result.best_move.is_none());
        assert_eq!(result.best_score, DRAW_SCORE);
    }

    #[test]
    fn timeout_run_still_returns_a_move() {
        let board = board_with(
            &[(5, 5), (6, 6), (4, 6), (7, 5), (3, 3)],
            &[(5, 6), (6, 5), (4, 4), (8, 8), (2, 2)],
        );
        let config = SearchLimits {
            max_depth: 30,
            max_nodes: 0,
            time_limit_ms: 1,
            panic_extra_time_ms: 0,
            ..SearchLimits::default()
        };
        let result = engine().search_best_move(&board, &config);

        assert!(result.best_move.is_some());
        if result.is_timeout {
            assert!(result.depth_reached < 30);
        }
    }

    #[test]
    fn board_argument_is_left_untouched() {
        let board = board_with(&[(5, 5), (6, 6)], &[(5, 6)]);
        let snapshot = board.clone();
        let _ = engine().search_best_move(&board, &limits(3, 5_000));
        assert_eq!(board, snapshot);
    }

    #[test]
    fn clear_transposition_table_is_safe_between_runs() {
        let board = board_with(&[(5, 5)], &[(5, 6)]);
        let mut eng = engine();
        let first = eng.search_best_move(&board, &limits(2, 0));
        eng.clear_transposition_table();
        let second = eng.search_best_move(&board, &limits(2, 0));
        assert_eq!(first.best_move, second.best_move);
    }
}
