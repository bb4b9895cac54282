//! Line-local threat pattern classification
//!
//! A threat class describes what placing a stone on an empty cell would
//! create along one direction. Classes are ranked by the pair
//! (stones toward five, distinct ways to complete a five):
//!
//! - `Five`, `OpenFour` are winning (unstoppable in one reply)
//! - `SimpleFour`, `OpenThree`, `BrokenThree` are forcing (the defender must
//!   answer or lose next move)
//! - the remaining classes are non-forcing but useful for evaluation
//!
//! Classification inspects the four cells on each side of the candidate cell
//! along the direction. Each of the eight cells is encoded as empty,
//! attacker, or blocked (defender stone or board edge), giving a 16-bit key
//! into a table built once and shared process-wide. The table is pure data:
//! no mutable shared state beyond the one-time build.

use once_cell::sync::Lazy;

/// Directions in which threats can appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Along a row (x changes, y fixed)
    Horizontal,
    /// Along a column (y changes, x fixed)
    Vertical,
    /// NW-SE diagonal
    DiagNwse,
    /// NE-SW diagonal
    DiagNesw,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Horizontal,
        Direction::Vertical,
        Direction::DiagNwse,
        Direction::DiagNesw,
    ];

    /// Unit step vector for this direction
    #[inline]
    pub fn step(self) -> (i32, i32) {
        match self {
            Direction::Horizontal => (1, 0),
            Direction::Vertical => (0, 1),
            Direction::DiagNwse => (1, 1),
            Direction::DiagNesw => (1, -1),
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Direction::Horizontal => 0,
            Direction::Vertical => 1,
            Direction::DiagNwse => 2,
            Direction::DiagNesw => 3,
        }
    }
}

/// Threat classification (a, b): `a` stones toward five, `b` ways to
/// complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ThreatType {
    #[default]
    None = 0,

    // Winning
    /// (5,1) - completes five in a row
    Five,
    /// (4,2) - two winning continuations
    OpenFour,

    // Forcing (opponent must respond or lose)
    /// (4,1) - one winning continuation
    SimpleFour,
    /// (3,3) - three ways to reach a four
    OpenThree,
    /// (3,2)
    BrokenThree,

    // Non-forcing
    /// (3,1)
    SimpleThree,
    /// (2,4)
    TwoFourWays,
    /// (2,3)
    TwoThreeWays,
    /// (2,2)
    TwoTwoWays,
    /// (2,1)
    TwoOneWay,
    /// (1,5)
    OneFiveWays,
    /// (1,4)
    OneFourWays,
    /// (1,3)
    OneThreeWays,
    /// (1,2)
    OneTwoWays,
    /// (1,1)
    OneOneWay,
}

impl ThreatType {
    /// Unstoppable in one reply
    #[inline]
    pub fn is_winning(self) -> bool {
        matches!(self, ThreatType::Five | ThreatType::OpenFour)
    }

    /// The defender must answer immediately or lose next move
    #[inline]
    pub fn is_forcing(self) -> bool {
        matches!(
            self,
            ThreatType::SimpleFour | ThreatType::OpenThree | ThreatType::BrokenThree
        )
    }

    /// Strength rank for ordering; higher is stronger
    #[inline]
    pub fn rank(self) -> u8 {
        match self {
            ThreatType::None => 0,
            ThreatType::OneOneWay => 1,
            ThreatType::OneTwoWays => 2,
            ThreatType::OneThreeWays => 3,
            ThreatType::OneFourWays => 4,
            ThreatType::OneFiveWays => 5,
            ThreatType::TwoOneWay => 6,
            ThreatType::TwoTwoWays => 7,
            ThreatType::TwoThreeWays => 8,
            ThreatType::TwoFourWays => 9,
            ThreatType::SimpleThree => 10,
            ThreatType::BrokenThree => 11,
            ThreatType::OpenThree => 12,
            ThreatType::SimpleFour => 13,
            ThreatType::OpenFour => 14,
            ThreatType::Five => 15,
        }
    }

    /// Map a (stones, ways) pair onto its class
    pub(crate) fn from_counts(stones: u32, ways: u32) -> ThreatType {
        match (stones, ways) {
            (5.., _) => ThreatType::Five,
            (4, 2..) => ThreatType::OpenFour,
            (4, _) => ThreatType::SimpleFour,
            (3, 3..) => ThreatType::OpenThree,
            (3, 2) => ThreatType::BrokenThree,
            (3, _) => ThreatType::SimpleThree,
            (2, 4..) => ThreatType::TwoFourWays,
            (2, 3) => ThreatType::TwoThreeWays,
            (2, 2) => ThreatType::TwoTwoWays,
            (2, _) => ThreatType::TwoOneWay,
            (1, 5..) => ThreatType::OneFiveWays,
            (1, 4) => ThreatType::OneFourWays,
            (1, 3) => ThreatType::OneThreeWays,
            (1, 2) => ThreatType::OneTwoWays,
            (1, _) => ThreatType::OneOneWay,
            _ => ThreatType::None,
        }
    }
}

/// Cells inspected on each side of the candidate cell.
pub const WINDOW_RADIUS: i32 = 4;

/// Window cell codes (2 bits each in the lookup key).
pub const CELL_EMPTY: u16 = 0;
pub const CELL_ATTACKER: u16 = 1;
pub const CELL_BLOCKED: u16 = 2;

/// Key slot for a window offset (`-4..=-1` then `1..=4`, center excluded).
#[inline]
pub fn slot_of(offset: i32) -> usize {
    debug_assert!(offset != 0 && offset.abs() <= WINDOW_RADIUS);
    if offset < 0 {
        (offset + WINDOW_RADIUS) as usize
    } else {
        (offset + WINDOW_RADIUS - 1) as usize
    }
}

/// Classify a window key. `key` packs the eight surrounding cell codes,
/// 2 bits per cell, in `slot_of` order.
#[inline]
pub fn classify(key: u16) -> ThreatType {
    CLASSIFY_TABLE[key as usize]
}

static CLASSIFY_TABLE: Lazy<Vec<ThreatType>> = Lazy::new(build_table);

fn build_table() -> Vec<ThreatType> {
    let mut table = vec![ThreatType::None; 1 << 16];
    'keys: for key in 0..(1u32 << 16) {
        let mut cells = [CELL_EMPTY; 8];
        for (slot, cell) in cells.iter_mut().enumerate() {
            let code = ((key >> (2 * slot)) & 0b11) as u16;
            if code > CELL_BLOCKED {
                // Unused encoding; leave as None
                continue 'keys;
            }
            *cell = code;
        }
        table[key as usize] = classify_cells(&cells);
    }
    table
}

/// Compute (max stones over viable five-windows, windows achieving the max)
/// with the hypothetical attacker stone on the center cell.
fn classify_cells(cells: &[u16; 8]) -> ThreatType {
    let mut best_stones = 0u32;
    let mut ways = 0u32;

    // Five-cell windows containing the center: offsets (w-4)..=w
    for w in 0..=WINDOW_RADIUS {
        let mut stones = 1u32; // the placed stone
        let mut viable = true;
        for offset in (w - WINDOW_RADIUS)..=w {
            if offset == 0 {
                continue;
            }
            match cells[slot_of(offset)] {
                CELL_ATTACKER => stones += 1,
                CELL_BLOCKED => {
                    viable = false;
                    break;
                }
                _ => {}
            }
        }
        if !viable {
            continue;
        }
        if stones > best_stones {
            best_stones = stones;
            ways = 1;
        } else if stones == best_stones {
            ways += 1;
        }
    }

    if best_stones == 0 {
        ThreatType::None
    } else {
        ThreatType::from_counts(best_stones, ways)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a key from window cells listed from offset -4 to +4, center
    /// excluded: [-4, -3, -2, -1, 1, 2, 3, 4].
    fn key(cells: [u16; 8]) -> u16 {
        let mut k = 0u16;
        for (slot, &c) in cells.iter().enumerate() {
            k |= c << (2 * slot);
        }
        k
    }

    const E: u16 = CELL_EMPTY;
    const A: u16 = CELL_ATTACKER;
    const B: u16 = CELL_BLOCKED;

    #[test]
    fn lone_stone_with_full_room() {
        assert_eq!(classify(key([E, E, E, E, E, E, E, E])), ThreatType::OneFiveWays);
    }

    #[test]
    fn fully_blocked_cell_is_no_threat() {
        assert_eq!(classify(key([B, B, B, B, B, B, B, B])), ThreatType::None);
        // One open neighbor is not enough room for a five
        assert_eq!(classify(key([B, B, B, E, B, B, B, B])), ThreatType::None);
    }

    #[test]
    fn five_completion() {
        // X X X X . -> placing completes five
        assert_eq!(classify(key([A, A, A, A, E, E, E, E])), ThreatType::Five);
        // Split four X X . X X around the center
        assert_eq!(classify(key([E, E, A, A, A, A, E, E])), ThreatType::Five);
    }

    #[test]
    fn open_four() {
        // . X X X * . with room on both sides
        assert_eq!(classify(key([E, A, A, A, E, E, E, E])), ThreatType::OpenFour);
    }

    #[test]
    fn simple_four_blocked_end() {
        // B X X X * . -> four with a single completion
        assert_eq!(classify(key([B, A, A, A, E, E, E, E])), ThreatType::SimpleFour);
        // Gapped four: X X . X * -> completion only in the gap window
        assert_eq!(classify(key([A, A, E, A, E, B, B, B])), ThreatType::SimpleFour);
    }

    #[test]
    fn open_three() {
        // . . X * X . . -> three with three complete-to-five windows
        assert_eq!(classify(key([E, E, E, A, A, E, E, E])), ThreatType::OpenThree);
    }

    #[test]
    fn broken_three_near_edge() {
        // B . X X * . . : windows through the blocked side die
        assert_eq!(classify(key([B, E, A, A, E, E, E, E])), ThreatType::BrokenThree);
    }

    #[test]
    fn simple_three_boxed_in() {
        // B X X * . B -> single viable window
        assert_eq!(classify(key([B, A, A, E, E, B, E, E])), ThreatType::SimpleThree);
    }

    #[test]
    fn two_with_varying_room() {
        // X * with wide room on both sides: windows containing both stones = 4
        assert_eq!(classify(key([E, E, E, A, E, E, E, E])), ThreatType::TwoFourWays);
        // . B . X * . . : the two left windows die at the block
        assert_eq!(classify(key([E, B, E, A, E, E, E, E])), ThreatType::TwoTwoWays);
    }

    #[test]
    fn winning_and_forcing_predicates() {
        assert!(ThreatType::Five.is_winning());
        assert!(ThreatType::OpenFour.is_winning());
        assert!(!ThreatType::SimpleFour.is_winning());
        assert!(ThreatType::SimpleFour.is_forcing());
        assert!(ThreatType::OpenThree.is_forcing());
        assert!(ThreatType::BrokenThree.is_forcing());
        assert!(!ThreatType::SimpleThree.is_forcing());
        assert!(!ThreatType::None.is_forcing());
    }

    #[test]
    fn rank_orders_by_strength() {
        assert!(ThreatType::Five.rank() > ThreatType::OpenFour.rank());
        assert!(ThreatType::OpenFour.rank() > ThreatType::SimpleFour.rank());
        assert!(ThreatType::SimpleFour.rank() > ThreatType::OpenThree.rank());
        assert!(ThreatType::OpenThree.rank() > ThreatType::BrokenThree.rank());
        assert!(ThreatType::BrokenThree.rank() > ThreatType::SimpleThree.rank());
        assert!(ThreatType::SimpleThree.rank() > ThreatType::None.rank());
    }
}
