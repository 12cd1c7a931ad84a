//! Tests for pure shot resolution against a board.

use broadside::{
    Board, Coord, Orientation, Ship, ShipKind, Shot, ShotResult, all_ships_sunk, resolve_shot,
};
use chrono::Utc;

fn board() -> Board {
    Board::new(vec![
        Ship::new(ShipKind::Carrier, Coord::new(0, 0), Orientation::Horizontal),
        Ship::new(ShipKind::Battleship, Coord::new(0, 2), Orientation::Horizontal),
        Ship::new(ShipKind::Cruiser, Coord::new(0, 4), Orientation::Horizontal),
        Ship::new(ShipKind::Submarine, Coord::new(0, 6), Orientation::Horizontal),
        Ship::new(ShipKind::Destroyer, Coord::new(0, 8), Orientation::Horizontal),
    ])
}

fn shot(coord: Coord, result: ShotResult) -> Shot {
    Shot {
        coord,
        result,
        timestamp: Utc::now(),
    }
}

#[test]
fn shot_at_open_water_misses() {
    assert_eq!(resolve_shot(&board(), Coord::new(9, 9)), ShotResult::Miss);
}

#[test]
fn shot_at_ship_cell_hits() {
    assert_eq!(resolve_shot(&board(), Coord::new(0, 0)), ShotResult::Hit);
}

#[test]
fn final_cell_sinks_the_ship() {
    let mut board = board();
    // Destroyer at (0, 8)-(1, 8); one cell already hit.
    board
        .shots_received
        .push(shot(Coord::new(0, 8), ShotResult::Hit));

    let result = resolve_shot(&board, Coord::new(1, 8));
    assert_eq!(
        result,
        ShotResult::Sunk {
            kind: ShipKind::Destroyer,
            cells: vec![Coord::new(0, 8), Coord::new(1, 8)],
        }
    );
}

#[test]
fn resolution_does_not_mutate_the_board() {
    let board = board();
    let before = board.clone();
    let _ = resolve_shot(&board, Coord::new(0, 0));
    let _ = resolve_shot(&board, Coord::new(9, 9));
    assert_eq!(board, before);
}

#[test]
fn prior_misses_do_not_count_toward_sinking() {
    let mut board = board();
    board
        .shots_received
        .push(shot(Coord::new(0, 8), ShotResult::Miss));
    // Only one real hit would land on the destroyer.
    assert_eq!(resolve_shot(&board, Coord::new(1, 8)), ShotResult::Hit);
}

#[test]
fn fleet_destruction_requires_every_cell() {
    let mut board = board();
    assert!(!all_ships_sunk(&board));

    let all_cells: Vec<Coord> = board.ships.iter().flat_map(|s| s.cells()).collect();
    for (i, &coord) in all_cells.iter().enumerate() {
        board.shots_received.push(shot(coord, ShotResult::Hit));
        if i + 1 < all_cells.len() {
            assert!(!all_ships_sunk(&board));
        }
    }
    assert!(all_ships_sunk(&board));
}

#[test]
fn redacted_board_hides_ships_and_keeps_shots() {
    let mut board = board();
    board
        .shots_received
        .push(shot(Coord::new(3, 3), ShotResult::Miss));

    let redacted = board.redacted();
    assert!(redacted.ships.is_empty());
    assert_eq!(redacted.shots_received, board.shots_received);
}

#[test]
fn has_shot_at_tracks_history() {
    let mut board = board();
    assert!(!board.has_shot_at(Coord::new(5, 5)));
    board
        .shots_received
        .push(shot(Coord::new(5, 5), ShotResult::Miss));
    assert!(board.has_shot_at(Coord::new(5, 5)));
}

#[test]
fn hit_or_sunk_counts_as_hit() {
    assert!(!ShotResult::Miss.is_hit());
    assert!(ShotResult::Hit.is_hit());
    assert!(
        ShotResult::Sunk {
            kind: ShipKind::Destroyer,
            cells: vec![Coord::new(0, 8), Coord::new(1, 8)],
        }
        .is_hit()
    );
}
