//! Board unit tests

use super::{Board, Move, Player, BOARD_SIZE, TOTAL_CELLS};

#[test]
fn empty_board_has_144_legal_moves_and_no_winner() {
    let board = Board::new();
    assert_eq!(board.get_legal_moves().len(), TOTAL_CELLS);
    assert!(!board.check_win(Player::Black));
    assert!(!board.check_win(Player::White));
    assert_eq!(board.side_to_move(), Player::Black);
}

#[test]
fn legal_moves_are_row_major() {
    let board = Board::new();
    let moves = board.get_legal_moves();
    assert_eq!(moves[0], Move::new(0, 0));
    assert_eq!(moves[1], Move::new(1, 0));
    assert_eq!(moves[BOARD_SIZE], Move::new(0, 1));
    let mut sorted = moves.clone();
    sorted.sort();
    assert_eq!(moves, sorted);
}

#[test]
fn make_move_rejects_out_of_range_and_occupied() {
    let mut board = Board::new();
    let before = board.clone();

    assert!(!board.make_move(Move::new(12, 0)));
    assert!(!board.make_move(Move::new(0, 200)));
    assert_eq!(board, before, "failed make_move must not change state");

    assert!(board.make_move(Move::new(5, 5)));
    let after_first = board.clone();
    assert!(!board.make_move(Move::new(5, 5)));
    assert_eq!(board, after_first);
}

#[test]
fn make_move_places_stone_and_flips_side() {
    let mut board = Board::new();
    let mv = Move::new(3, 4);
    assert!(board.make_move(mv));
    assert_eq!(board.get(mv), Some(Player::Black));
    assert_eq!(board.side_to_move(), Player::White);
    assert!(board.make_move(Move::new(4, 4)));
    assert_eq!(board.get(Move::new(4, 4)), Some(Player::White));
    assert_eq!(board.side_to_move(), Player::Black);
}

#[test]
fn make_unmake_restores_state_bit_identically() {
    let mut board = Board::new();
    board.make_move(Move::new(6, 6));
    board.make_move(Move::new(5, 6));
    let snapshot = board.clone();
    let hash = board.hash_key();

    let mv = Move::new(7, 7);
    assert!(board.make_move(mv));
    assert_ne!(board.hash_key(), hash);
    assert!(board.unmake_move(mv));

    assert_eq!(board, snapshot);
    assert_eq!(board.hash_key(), hash);
    assert_eq!(board.side_to_move(), snapshot.side_to_move());
}

#[test]
fn replayed_hash_matches_scratch_recomputation() {
    let mut board = Board::new();
    let line = [
        Move::new(6, 6),
        Move::new(5, 5),
        Move::new(7, 6),
        Move::new(4, 4),
        Move::new(0, 11),
        Move::new(11, 0),
    ];
    for &mv in &line {
        assert!(board.make_move(mv));
        assert_eq!(board.hash_key(), board.recompute_hash());
    }
    // and back down
    for &mv in line.iter().rev() {
        assert!(board.unmake_move(mv));
        assert_eq!(board.hash_key(), board.recompute_hash());
    }
    assert_eq!(board.hash_key(), 0);
}

#[test]
fn hash_is_path_independent() {
    let mut a = Board::new();
    a.place_stone(Move::new(2, 2), Player::Black);
    a.place_stone(Move::new(9, 9), Player::White);

    let mut b = Board::new();
    b.place_stone(Move::new(9, 9), Player::White);
    b.place_stone(Move::new(2, 2), Player::Black);

    assert_eq!(a.hash_key(), b.hash_key());
}

#[test]
fn side_to_move_changes_hash() {
    let mut board = Board::new();
    let h_black = board.hash_key();
    board.set_side_to_move(Player::White);
    assert_ne!(board.hash_key(), h_black);
    board.set_side_to_move(Player::Black);
    assert_eq!(board.hash_key(), h_black);
}

#[test]
fn null_move_is_its_own_inverse() {
    let mut board = Board::new();
    board.make_move(Move::new(6, 6));
    let snapshot = board.clone();

    board.make_null_move();
    assert_eq!(board.side_to_move(), snapshot.side_to_move().opponent());
    assert_ne!(board.hash_key(), snapshot.hash_key());
    assert_eq!(board.hash_key(), board.recompute_hash());

    board.unmake_null_move();
    assert_eq!(board, snapshot);
}

#[test]
fn check_win_horizontal() {
    let mut board = Board::new();
    for x in 2..7 {
        board.place_stone(Move::new(x, 5), Player::Black);
    }
    assert!(board.check_win(Player::Black));
    assert!(!board.check_win(Player::White));
}

#[test]
fn check_win_vertical_and_diagonals() {
    let mut v = Board::new();
    for y in 0..5 {
        v.place_stone(Move::new(11, y), Player::White);
    }
    assert!(v.check_win(Player::White));

    let mut d1 = Board::new();
    for i in 0..5 {
        d1.place_stone(Move::new(3 + i, 3 + i), Player::Black);
    }
    assert!(d1.check_win(Player::Black));

    let mut d2 = Board::new();
    for i in 0..5 {
        d2.place_stone(Move::new(2 + i, 8 - i), Player::Black);
    }
    assert!(d2.check_win(Player::Black));
}

#[test]
fn four_in_a_row_is_not_a_win() {
    let mut board = Board::new();
    for x in 0..4 {
        board.place_stone(Move::new(x, 0), Player::Black);
    }
    assert!(!board.check_win(Player::Black));
}

#[test]
fn candidate_moves_on_empty_board_is_center() {
    let board = Board::new();
    assert_eq!(board.get_candidate_moves(), vec![Move::new(6, 6)]);
}

#[test]
fn candidate_moves_stay_within_radius_two() {
    let mut board = Board::new();
    board.place_stone(Move::new(6, 6), Player::Black);
    let candidates = board.get_candidate_moves();

    assert!(!candidates.contains(&Move::new(6, 6)), "occupied cell excluded");
    assert!(candidates.contains(&Move::new(4, 4)));
    assert!(candidates.contains(&Move::new(8, 8)));
    assert!(!candidates.contains(&Move::new(9, 6)));
    assert!(!candidates.contains(&Move::new(0, 0)));
    // Chebyshev radius 2 around a single interior stone: 5x5 - 1
    assert_eq!(candidates.len(), 24);
}

#[test]
fn candidate_moves_clip_at_edges() {
    let mut board = Board::new();
    board.place_stone(Move::new(0, 0), Player::White);
    let candidates = board.get_candidate_moves();
    // 3x3 corner neighborhood minus the stone itself
    assert_eq!(candidates.len(), 8);
    assert!(candidates.contains(&Move::new(2, 2)));
}

#[test]
fn count_stones_matches_placements() {
    let mut board = Board::new();
    assert_eq!(board.count_stones(Player::Black), 0);
    board.place_stone(Move::new(1, 1), Player::Black);
    board.place_stone(Move::new(2, 1), Player::Black);
    board.place_stone(Move::new(3, 1), Player::White);
    assert_eq!(board.count_stones(Player::Black), 2);
    assert_eq!(board.count_stones(Player::White), 1);
    assert_eq!(board.stone_count(), 3);
}

#[test]
fn setup_utilities_keep_hash_consistent() {
    let mut board = Board::new();
    board.place_stone(Move::new(4, 9), Player::White);
    board.set_side_to_move(Player::White);
    assert_eq!(board.hash_key(), board.recompute_hash());
    board.remove_stone(Move::new(4, 9), Player::White);
    assert_eq!(board.hash_key(), board.recompute_hash());
}

#[test]
fn clone_is_deep() {
    let mut board = Board::new();
    board.make_move(Move::new(6, 6));
    let copy = board.clone();
    board.make_move(Move::new(7, 7));
    assert_eq!(copy.stone_count(), 1);
    assert_ne!(board.hash_key(), copy.hash_key());
}

#[test]
fn move_ordering_is_row_major() {
    assert!(Move::new(11, 0) < Move::new(0, 1));
    assert!(Move::new(3, 5) < Move::new(4, 5));
    assert_eq!(Move::from_index(Move::new(7, 3).to_index()), Move::new(7, 3));
}
