//! Per-player board state and the pure shot-resolution rules.

use crate::grid::Coord;
use crate::ships::{Ship, ShipKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of resolving a single shot against a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum ShotResult {
    /// No ship at the target cell.
    Miss,
    /// A ship occupies the cell but still has unhit cells.
    Hit,
    /// The shot completed a ship. Carries the full cell set so targeting
    /// logic can permanently exclude the dead ship.
    Sunk {
        /// Class of the sunk ship.
        kind: ShipKind,
        /// Every cell the sunk ship occupied.
        cells: Vec<Coord>,
    },
}

impl ShotResult {
    /// Whether the shot struck a ship (hit or sunk).
    pub fn is_hit(&self) -> bool {
        !matches!(self, ShotResult::Miss)
    }
}

/// A resolved shot recorded on the defender's board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shot {
    /// Target cell.
    pub coord: Coord,
    /// Resolution outcome.
    pub result: ShotResult,
    /// When the shot was resolved.
    pub timestamp: DateTime<Utc>,
}

/// One player's board: their own (hidden) fleet layout plus the ordered
/// history of shots the opponent has fired at it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    /// The owner's fleet. Empty in redacted views.
    pub ships: Vec<Ship>,
    /// Shots received, in firing order.
    pub shots_received: Vec<Shot>,
}

impl Board {
    /// Creates a board with the given fleet and no shots.
    pub fn new(ships: Vec<Ship>) -> Self {
        Self {
            ships,
            shots_received: Vec::new(),
        }
    }

    /// Whether a shot has already been fired at the given cell.
    pub fn has_shot_at(&self, coord: Coord) -> bool {
        self.shots_received.iter().any(|s| s.coord == coord)
    }

    /// Coordinates of every shot that struck a ship.
    pub fn hit_cells(&self) -> HashSet<Coord> {
        self.shots_received
            .iter()
            .filter(|s| s.result.is_hit())
            .map(|s| s.coord)
            .collect()
    }

    /// A copy of this board with the fleet stripped, safe to show the
    /// opponent.
    pub fn redacted(&self) -> Board {
        Board {
            ships: Vec::new(),
            shots_received: self.shots_received.clone(),
        }
    }
}

/// Resolves a shot at `coord` against `board` without mutating it.
///
/// Returns [`ShotResult::Sunk`] when `coord` plus the prior hits on the
/// board cover every cell of the struck ship; the caller records the shot
/// afterwards, so the history passed in must not yet contain it.
pub fn resolve_shot(board: &Board, coord: Coord) -> ShotResult {
    let Some(ship) = board.ships.iter().find(|s| s.occupies(coord)) else {
        return ShotResult::Miss;
    };
    let mut covered = board.hit_cells();
    covered.insert(coord);
    if ship.cells().iter().all(|c| covered.contains(c)) {
        ShotResult::Sunk {
            kind: ship.kind,
            cells: ship.cells(),
        }
    } else {
        ShotResult::Hit
    }
}

/// Whether every cell of every ship on the board has been hit.
pub fn all_ships_sunk(board: &Board) -> bool {
    let covered = board.hit_cells();
    board
        .ships
        .iter()
        .all(|ship| ship.cells().iter().all(|c| covered.contains(c)))
}
