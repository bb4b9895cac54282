//! Forcing-sequence threat solver
//!
//! The solver answers two questions for the search engine:
//!
//! - does the attacker have a *forced* win: a chain of forcing threats
//!   (fours and threes the defender must answer) ending in a five or an
//!   open four, valid against every defender reply?
//! - if the opponent has such a win, which defender moves survive it?
//!
//! The forcing-sequence search works under the all-defenses assumption: a
//! sequence only counts as winning if every legal refutation attempt is
//! beaten recursively. A `None` result always means "no proof found under
//! these limits", never "proven safe".
//!
//! The solver keeps its own board copy and an incrementally maintained
//! per-cell, per-direction threat classification, synchronized with the
//! engine's board through `notify_move`/`notify_undo`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::board::{Board, Move, Player, TOTAL_CELLS};

use super::pattern::{
    classify, slot_of, Direction, ThreatType, CELL_ATTACKER, CELL_BLOCKED, CELL_EMPTY,
    WINDOW_RADIUS,
};

/// A concrete threat on the board for one attacker.
#[derive(Debug, Clone)]
pub struct ThreatInstance {
    pub threat_type: ThreatType,
    pub attacker: Player,
    pub direction: Direction,
    /// Attacker stones forming the pattern
    pub stones: Vec<Move>,
    /// Cells that must stay empty for the threat to hold
    pub required_empty: Vec<Move>,
    /// Cells where the defender can legally refute this threat
    pub defense_points: Vec<Move>,
    /// Cells the attacker can play to upgrade or complete the threat
    pub finishing_moves: Vec<Move>,
}

/// A forcing sequence ending in a winning threat.
#[derive(Debug, Clone)]
pub struct ThreatSequence {
    pub attacker: Player,
    /// Threats in play order along the principal line
    pub threats: Vec<ThreatInstance>,
    /// Attacker moves of the principal line, in play order
    pub attacker_moves: Vec<Move>,
    /// Defender replies examined along the principal line
    pub defender_moves: Vec<Move>,
}

/// Outcome of defending against an opponent's forcing-sequence search.
///
/// An empty move list with `is_lost == false` means "no restriction", not
/// "no moves".
#[derive(Debug, Clone, Default)]
pub struct DefensiveSet {
    /// No defender reply survives every discovered winning sequence
    pub is_lost: bool,
    pub defensive_moves: Vec<Move>,
}

/// Condensed solver verdict for one attacker.
#[derive(Debug, Clone, Default)]
pub struct ThreatAnalysis {
    pub attacker_has_forced_win: bool,
    pub first_winning_move: Option<Move>,
    pub winning_line: Vec<Move>,
    pub defensive_moves: Vec<Move>,
}

/// Limits for a single threat-search call.
#[derive(Debug, Clone, Copy)]
pub struct ThreatSearchLimits<'a> {
    /// Maximum explored branch points
    pub max_nodes: u32,
    /// Maximum forcing layers
    pub max_depth: u32,
    /// Externally owned abort flag, checked at every branch
    pub abort: Option<&'a AtomicBool>,
}

impl Default for ThreatSearchLimits<'_> {
    fn default() -> Self {
        Self {
            max_nodes: 200_000,
            max_depth: 20,
            abort: None,
        }
    }
}

/// Tactical solver capability consumed by the search engine.
///
/// One production implementation ([`ThreatSearcher`]) exists; tests use
/// doubles so the engine can run without real tactics.
pub trait ThreatSolver {
    /// Rebuild all internal state from a position snapshot
    fn sync_from_board(&mut self, board: &Board);

    /// A stone of `player` was just placed at `mv` on the tracked position
    fn notify_move(&mut self, mv: Move, player: Player);

    /// The stone of `player` at `mv` was just removed
    fn notify_undo(&mut self, mv: Move, player: Player);

    /// Forced-win verdict plus first winning move for `attacker`
    fn analyze_threats(&mut self, attacker: Player, limits: &ThreatSearchLimits)
        -> ThreatAnalysis;

    /// Search for a forcing sequence winning for `attacker`.
    ///
    /// `None` means no sequence was found under the limits - it never
    /// proves safety.
    fn find_winning_threat_sequence(
        &mut self,
        attacker: Player,
        limits: &ThreatSearchLimits,
    ) -> Option<ThreatSequence>;

    /// Moves of `defender` that survive every discovered winning sequence
    /// of the opponent
    fn compute_defensive_set(
        &mut self,
        defender: Player,
        limits: &ThreatSearchLimits,
    ) -> DefensiveSet;

    /// `attacker` has a five on the board or completes one in a single move
    fn has_immediate_winning_threat(&self, attacker: Player) -> bool;

    /// A move completing a five for `attacker`, if one exists
    fn immediate_winning_move(&self, attacker: Player) -> Option<Move>;

    /// `attacker` has at least one winning or forcing placement available
    fn has_forcing_threat(&self, attacker: Player) -> bool;

    /// Winning and forcing patterns currently on the board, no recursion
    fn collect_current_forcing_threats(&self, attacker: Player) -> Vec<ThreatInstance>;

    /// Raw placement classification for one direction; `None` when occupied
    fn threat_at(&self, attacker: Player, mv: Move, direction: Direction) -> ThreatType;

    /// All four directional classifications at `mv`
    fn threats_at(&self, attacker: Player, mv: Move) -> [ThreatType; 4];
}

/// Node/depth/abort bookkeeping for one search call.
struct Budget<'a> {
    nodes: u32,
    limits: &'a ThreatSearchLimits<'a>,
}

impl Budget<'_> {
    #[inline]
    fn aborted(&self) -> bool {
        self.limits
            .abort
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    /// Account for one branch point; `false` means give up (no proof).
    #[inline]
    fn spend(&mut self) -> bool {
        self.nodes += 1;
        self.nodes <= self.limits.max_nodes && !self.aborted()
    }
}

/// Production threat solver backed by the pattern classification table.
#[derive(Debug, Clone)]
pub struct ThreatSearcher {
    board: Board,
    /// Placement classification per cell, player, and direction
    classes: [[[ThreatType; 4]; 2]; TOTAL_CELLS],
}

impl ThreatSearcher {
    /// Build a solver tracking the given position.
    pub fn new(board: &Board) -> Self {
        let mut solver = Self {
            board: board.clone(),
            classes: [[[ThreatType::None; 4]; 2]; TOTAL_CELLS],
        };
        solver.rebuild();
        solver
    }

    fn rebuild(&mut self) {
        for idx in 0..TOTAL_CELLS {
            self.refresh_cell(Move::from_index(idx));
        }
    }

    #[inline]
    fn class_at(&self, mv: Move, player: Player, dir: Direction) -> ThreatType {
        self.classes[mv.to_index()][player.index()][dir.index()]
    }

    fn best_class(&self, mv: Move, player: Player) -> ThreatType {
        let mut best = ThreatType::None;
        for t in self.classes[mv.to_index()][player.index()] {
            if t.rank() > best.rank() {
                best = t;
            }
        }
        best
    }

    fn window_key(&self, mv: Move, player: Player, dir: Direction) -> u16 {
        let (dx, dy) = dir.step();
        let mut key = 0u16;
        for offset in -WINDOW_RADIUS..=WINDOW_RADIUS {
            if offset == 0 {
                continue;
            }
            let code = match mv.offset(dx * offset, dy * offset) {
                None => CELL_BLOCKED,
                Some(cell) => match self.board.get(cell) {
                    None => CELL_EMPTY,
                    Some(p) if p == player => CELL_ATTACKER,
                    Some(_) => CELL_BLOCKED,
                },
            };
            key |= code << (2 * slot_of(offset));
        }
        key
    }

    fn refresh_cell(&mut self, mv: Move) {
        let idx = mv.to_index();
        if self.board.is_occupied(mv) {
            self.classes[idx] = [[ThreatType::None; 4]; 2];
            return;
        }
        for player in [Player::Black, Player::White] {
            for dir in Direction::ALL {
                self.classes[idx][player.index()][dir.index()] =
                    classify(self.window_key(mv, player, dir));
            }
        }
    }

    /// A stone change at `mv` only affects windows within WINDOW_RADIUS
    /// along each line through it.
    fn refresh_around(&mut self, mv: Move) {
        self.refresh_cell(mv);
        for dir in Direction::ALL {
            let (dx, dy) = dir.step();
            for offset in 1..=WINDOW_RADIUS {
                if let Some(cell) = mv.offset(dx * offset, dy * offset) {
                    self.refresh_cell(cell);
                }
                if let Some(cell) = mv.offset(-dx * offset, -dy * offset) {
                    self.refresh_cell(cell);
                }
            }
        }
    }

    fn apply(&mut self, mv: Move, player: Player) {
        let placed = self.board.place_stone(mv, player);
        debug_assert!(placed, "threat search placed on occupied cell {mv}");
        self.refresh_around(mv);
    }

    fn revert(&mut self, mv: Move, player: Player) {
        let removed = self.board.remove_stone(mv, player);
        debug_assert!(removed, "threat search removed missing stone {mv}");
        self.refresh_around(mv);
    }

    /// Attacker placements creating a winning or forcing threat, strongest
    /// class first, row-major within a class.
    fn forcing_candidates(&self, attacker: Player) -> Vec<(Move, ThreatType)> {
        let mut out: Vec<(Move, ThreatType)> = Vec::new();
        for idx in 0..TOTAL_CELLS {
            let mv = Move::from_index(idx);
            if self.board.is_occupied(mv) {
                continue;
            }
            let best = self.best_class(mv, attacker);
            if best.is_winning() || best.is_forcing() {
                out.push((mv, best));
            }
        }
        out.sort_by(|a, b| b.1.rank().cmp(&a.1.rank()).then(a.0.cmp(&b.0)));
        out
    }

    /// Stones and empty cells of the max-stone viable windows through `mv`,
    /// counting the center as an attacker stone. Works identically before
    /// and after the stone at `mv` is actually placed.
    fn window_details(
        &self,
        mv: Move,
        player: Player,
        dir: Direction,
    ) -> (Vec<Move>, Vec<Move>) {
        let (dx, dy) = dir.step();
        let mut windows: Vec<(u32, Vec<Move>, Vec<Move>)> = Vec::new();

        for w in 0..=WINDOW_RADIUS {
            let mut stones = vec![mv];
            let mut empties: Vec<Move> = Vec::new();
            let mut viable = true;
            for offset in (w - WINDOW_RADIUS)..=w {
                if offset == 0 {
                    continue;
                }
                match mv.offset(dx * offset, dy * offset) {
                    None => {
                        viable = false;
                        break;
                    }
                    Some(cell) => match self.board.get(cell) {
                        None => empties.push(cell),
                        Some(p) if p == player => stones.push(cell),
                        Some(_) => {
                            viable = false;
                            break;
                        }
                    },
                }
            }
            if viable {
                windows.push((stones.len() as u32, stones, empties));
            }
        }

        let best = windows.iter().map(|w| w.0).max().unwrap_or(0);
        let mut stones_out: BTreeSet<Move> = BTreeSet::new();
        let mut empties_out: BTreeSet<Move> = BTreeSet::new();
        for (count, stones, empties) in windows {
            if count == best {
                stones_out.extend(stones);
                empties_out.extend(empties);
            }
        }
        (
            stones_out.into_iter().collect(),
            empties_out.into_iter().collect(),
        )
    }

    /// Instance describing the threat created by playing `mv`, taken along
    /// the strongest direction.
    fn placement_instance(&self, mv: Move, player: Player) -> ThreatInstance {
        let mut dir = Direction::Horizontal;
        let mut best = ThreatType::None;
        for d in Direction::ALL {
            let t = self.class_at(mv, player, d);
            if t.rank() > best.rank() {
                best = t;
                dir = d;
            }
        }
        let (stones, empties) = self.window_details(mv, player, dir);
        ThreatInstance {
            threat_type: best,
            attacker: player,
            direction: dir,
            stones,
            required_empty: empties.clone(),
            defense_points: empties.clone(),
            finishing_moves: empties,
        }
    }

    /// Defender replies that might refute the forcing move just played at
    /// `mv`: refutation cells of every forcing direction plus the defender's
    /// own four-or-better placements. A superset of the truly surviving
    /// replies; each is verified recursively.
    fn defender_replies(&self, mv: Move, attacker: Player, forcing_dirs: &[Direction]) -> Vec<Move> {
        let defender = attacker.opponent();
        let mut replies: BTreeSet<Move> = BTreeSet::new();

        for &dir in forcing_dirs {
            let (_, empties) = self.window_details(mv, attacker, dir);
            replies.extend(empties);
        }

        for idx in 0..TOTAL_CELLS {
            let cell = Move::from_index(idx);
            if self.board.is_occupied(cell) {
                continue;
            }
            if self.best_class(cell, defender).rank() >= ThreatType::SimpleFour.rank() {
                replies.insert(cell);
            }
        }

        replies.retain(|cell| !self.board.is_occupied(*cell));
        replies.into_iter().collect()
    }

    /// Depth-first all-defenses forcing search.
    ///
    /// On success the principal line (first examined defense at each layer)
    /// is left in `path`/`threats`/`replies`; on failure they are restored.
    fn search_forcing(
        &mut self,
        attacker: Player,
        depth: u32,
        budget: &mut Budget,
        path: &mut Vec<Move>,
        threats: &mut Vec<ThreatInstance>,
        replies_out: &mut Vec<Move>,
    ) -> bool {
        if depth >= budget.limits.max_depth {
            return false;
        }
        let defender = attacker.opponent();

        for (mv, class) in self.forcing_candidates(attacker) {
            if !budget.spend() {
                return false;
            }

            let path_mark = path.len();
            let threat_mark = threats.len();
            let reply_mark = replies_out.len();

            path.push(mv);
            threats.push(self.placement_instance(mv, attacker));

            if class == ThreatType::Five {
                return true;
            }

            let forcing_dirs: Vec<Direction> = Direction::ALL
                .into_iter()
                .filter(|d| self.class_at(mv, attacker, *d).is_forcing())
                .collect();

            self.apply(mv, attacker);

            // Whatever we threaten, a defender five lands first.
            if self.immediate_winning_move(defender).is_some() {
                self.revert(mv, attacker);
                path.truncate(path_mark);
                threats.truncate(threat_mark);
                continue;
            }

            if class == ThreatType::OpenFour {
                self.revert(mv, attacker);
                return true;
            }

            let defenses = self.defender_replies(mv, attacker, &forcing_dirs);
            if defenses.is_empty() {
                self.revert(mv, attacker);
                return true;
            }

            let mut all_beaten = true;
            for (k, defense) in defenses.iter().enumerate() {
                if !budget.spend() {
                    all_beaten = false;
                    break;
                }
                self.apply(*defense, defender);
                let beaten = if k == 0 {
                    replies_out.push(*defense);
                    self.search_forcing(attacker, depth + 1, budget, path, threats, replies_out)
                } else {
                    // Sideline: verified but not recorded
                    let mut scratch_path = Vec::new();
                    let mut scratch_threats = Vec::new();
                    let mut scratch_replies = Vec::new();
                    self.search_forcing(
                        attacker,
                        depth + 1,
                        budget,
                        &mut scratch_path,
                        &mut scratch_threats,
                        &mut scratch_replies,
                    )
                };
                self.revert(*defense, defender);
                if !beaten {
                    all_beaten = false;
                    break;
                }
            }

            self.revert(mv, attacker);
            if all_beaten {
                return true;
            }
            path.truncate(path_mark);
            threats.truncate(threat_mark);
            replies_out.truncate(reply_mark);
        }

        false
    }

    fn is_subset(smaller: &[Move], larger: &[Move]) -> bool {
        smaller.iter().all(|m| larger.contains(m))
    }
}

impl ThreatSolver for ThreatSearcher {
    fn sync_from_board(&mut self, board: &Board) {
        self.board = board.clone();
        self.rebuild();
    }

    fn notify_move(&mut self, mv: Move, player: Player) {
        self.apply(mv, player);
    }

    fn notify_undo(&mut self, mv: Move, player: Player) {
        self.revert(mv, player);
    }

    fn analyze_threats(
        &mut self,
        attacker: Player,
        limits: &ThreatSearchLimits,
    ) -> ThreatAnalysis {
        match self.find_winning_threat_sequence(attacker, limits) {
            Some(seq) => ThreatAnalysis {
                attacker_has_forced_win: true,
                first_winning_move: seq.attacker_moves.first().copied(),
                winning_line: seq.attacker_moves,
                defensive_moves: Vec::new(),
            },
            None => ThreatAnalysis::default(),
        }
    }

    fn find_winning_threat_sequence(
        &mut self,
        attacker: Player,
        limits: &ThreatSearchLimits,
    ) -> Option<ThreatSequence> {
        if self.board.check_win(attacker) {
            return Some(ThreatSequence {
                attacker,
                threats: Vec::new(),
                attacker_moves: Vec::new(),
                defender_moves: Vec::new(),
            });
        }

        let mut budget = Budget { nodes: 0, limits };
        let mut path = Vec::new();
        let mut threats = Vec::new();
        let mut replies = Vec::new();

        if self.search_forcing(attacker, 0, &mut budget, &mut path, &mut threats, &mut replies) {
            log::trace!(
                "forcing win for {:?}: {} attacker moves, {} nodes",
                attacker,
                path.len(),
                budget.nodes
            );
            Some(ThreatSequence {
                attacker,
                threats,
                attacker_moves: path,
                defender_moves: replies,
            })
        } else {
            None
        }
    }

    fn compute_defensive_set(
        &mut self,
        defender: Player,
        limits: &ThreatSearchLimits,
    ) -> DefensiveSet {
        let attacker = defender.opponent();
        let Some(seq) = self.find_winning_threat_sequence(attacker, limits) else {
            return DefensiveSet::default();
        };

        // A five already on the board cannot be defended.
        let Some(&first_move) = seq.attacker_moves.first() else {
            return DefensiveSet {
                is_lost: true,
                defensive_moves: Vec::new(),
            };
        };

        // Candidate refutations: the sequence's entry move, every
        // refutation cell it relied on, and defender counter-fours. Each is
        // verified by replaying it and re-running the attacker's search.
        let mut candidates: BTreeSet<Move> = BTreeSet::new();
        candidates.insert(first_move);
        for threat in &seq.threats {
            candidates.extend(threat.defense_points.iter().copied());
        }
        for idx in 0..TOTAL_CELLS {
            let cell = Move::from_index(idx);
            if !self.board.is_occupied(cell)
                && self.best_class(cell, defender).rank() >= ThreatType::SimpleFour.rank()
            {
                candidates.insert(cell);
            }
        }
        candidates.retain(|cell| !self.board.is_occupied(*cell));

        let aborted =
            |l: &ThreatSearchLimits| l.abort.map_or(false, |f| f.load(Ordering::Relaxed));

        let mut survivors: Vec<Move> = Vec::new();
        for candidate in candidates {
            if aborted(limits) {
                // No verdict under these limits; leave the caller unrestricted.
                return DefensiveSet::default();
            }
            self.apply(candidate, defender);
            let survives = self.board.check_win(defender)
                || self
                    .find_winning_threat_sequence(attacker, limits)
                    .is_none();
            self.revert(candidate, defender);
            if survives {
                survivors.push(candidate);
            }
        }

        if survivors.is_empty() {
            DefensiveSet {
                is_lost: true,
                defensive_moves: Vec::new(),
            }
        } else {
            DefensiveSet {
                is_lost: false,
                defensive_moves: survivors,
            }
        }
    }

    fn has_immediate_winning_threat(&self, attacker: Player) -> bool {
        self.board.check_win(attacker) || self.immediate_winning_move(attacker).is_some()
    }

    fn immediate_winning_move(&self, attacker: Player) -> Option<Move> {
        for idx in 0..TOTAL_CELLS {
            let mv = Move::from_index(idx);
            if self.board.is_occupied(mv) {
                continue;
            }
            if self.classes[idx][attacker.index()]
                .iter()
                .any(|t| *t == ThreatType::Five)
            {
                return Some(mv);
            }
        }
        None
    }

    fn has_forcing_threat(&self, attacker: Player) -> bool {
        for idx in 0..TOTAL_CELLS {
            let mv = Move::from_index(idx);
            if self.board.is_occupied(mv) {
                continue;
            }
            let best = self.best_class(mv, attacker);
            if best.is_winning() || best.is_forcing() {
                return true;
            }
        }
        false
    }

    fn collect_current_forcing_threats(&self, attacker: Player) -> Vec<ThreatInstance> {
        // Group viable five-windows by the attacker stones they contain;
        // (stones, window count) yields the board-level class.
        let mut groups: BTreeMap<(usize, Vec<Move>), Vec<Vec<Move>>> = BTreeMap::new();

        for dir in Direction::ALL {
            let (dx, dy) = dir.step();
            for idx in 0..TOTAL_CELLS {
                let start = Move::from_index(idx);
                let mut stones: Vec<Move> = Vec::new();
                let mut empties: Vec<Move> = Vec::new();
                let mut viable = true;
                for step in 0..5 {
                    match start.offset(dx * step, dy * step) {
                        None => {
                            viable = false;
                            break;
                        }
                        Some(cell) => match self.board.get(cell) {
                            None => empties.push(cell),
                            Some(p) if p == attacker => stones.push(cell),
                            Some(_) => {
                                viable = false;
                                break;
                            }
                        },
                    }
                }
                if !viable || stones.len() < 3 {
                    continue;
                }
                stones.sort();
                groups
                    .entry((dir.index(), stones))
                    .or_default()
                    .push(empties);
            }
        }

        let mut out: Vec<ThreatInstance> = Vec::new();
        for ((dir_idx, stones), windows) in groups {
            let threat_type =
                ThreatType::from_counts(stones.len() as u32, windows.len() as u32);
            let relevant = threat_type.is_winning() || threat_type.is_forcing();
            if !relevant {
                continue;
            }
            let direction = Direction::ALL[dir_idx];
            let mut required_empty: BTreeSet<Move> = BTreeSet::new();
            for window in &windows {
                required_empty.extend(window.iter().copied());
            }
            let required_empty: Vec<Move> = required_empty.into_iter().collect();
            let finishing_moves: Vec<Move> = required_empty
                .iter()
                .copied()
                .filter(|cell| self.class_at(*cell, attacker, direction).is_winning())
                .collect();
            let defense_points = if stones.len() >= 4 {
                // Only the completion cells refute a four
                finishing_moves.clone()
            } else {
                required_empty.clone()
            };
            out.push(ThreatInstance {
                threat_type,
                attacker,
                direction,
                stones,
                required_empty,
                defense_points,
                finishing_moves,
            });
        }

        // Drop weaker instances fully contained in a stronger one on the
        // same line (window subsets of a four read as threes otherwise).
        let mut keep = vec![true; out.len()];
        for i in 0..out.len() {
            for j in 0..out.len() {
                if i != j
                    && keep[i]
                    && out[i].direction == out[j].direction
                    && out[i].threat_type.rank() < out[j].threat_type.rank()
                    && Self::is_subset(&out[i].stones, &out[j].stones)
                {
                    keep[i] = false;
                }
            }
        }
        let mut kept: Vec<ThreatInstance> = out
            .into_iter()
            .zip(keep)
            .filter_map(|(inst, k)| k.then_some(inst))
            .collect();
        kept.sort_by(|a, b| {
            b.threat_type
                .rank()
                .cmp(&a.threat_type.rank())
                .then(a.stones.cmp(&b.stones))
        });
        kept
    }

    fn threat_at(&self, attacker: Player, mv: Move, direction: Direction) -> ThreatType {
        if !mv.in_bounds() || self.board.is_occupied(mv) {
            return ThreatType::None;
        }
        self.class_at(mv, attacker, direction)
    }

    fn threats_at(&self, attacker: Player, mv: Move) -> [ThreatType; 4] {
        if !mv.in_bounds() || self.board.is_occupied(mv) {
            return [ThreatType::None; 4];
        }
        self.classes[mv.to_index()][attacker.index()]
    }
}
