//! Ship kinds, canonical fleet composition, and ship geometry.

use crate::grid::{BOARD_SIZE, Coord, Orientation};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// The five ship classes of a fleet, each with a canonical length.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ShipKind {
    /// Length 5.
    Carrier,
    /// Length 4.
    Battleship,
    /// Length 3.
    Cruiser,
    /// Length 3.
    Submarine,
    /// Length 2.
    Destroyer,
}

impl ShipKind {
    /// Canonical length of this ship class.
    pub fn length(self) -> u8 {
        match self {
            ShipKind::Carrier => 5,
            ShipKind::Battleship => 4,
            ShipKind::Cruiser => 3,
            ShipKind::Submarine => 3,
            ShipKind::Destroyer => 2,
        }
    }

    /// All five kinds in canonical order.
    pub fn all() -> [ShipKind; 5] {
        [
            ShipKind::Carrier,
            ShipKind::Battleship,
            ShipKind::Cruiser,
            ShipKind::Submarine,
            ShipKind::Destroyer,
        ]
    }
}

/// A placed ship: class, origin cell, orientation, and recorded length.
///
/// `length` is carried in the wire format and must match the canonical
/// length for `kind`; validation rejects mismatches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ship {
    /// Ship class.
    pub kind: ShipKind,
    /// Topmost/leftmost occupied cell.
    pub origin: Coord,
    /// Direction the ship extends from the origin.
    pub orientation: Orientation,
    /// Number of occupied cells.
    pub length: u8,
}

impl Ship {
    /// Creates a ship with the canonical length for its kind.
    pub fn new(kind: ShipKind, origin: Coord, orientation: Orientation) -> Self {
        Self {
            kind,
            origin,
            orientation,
            length: kind.length(),
        }
    }

    /// The cells this ship occupies, starting at the origin.
    ///
    /// Unvalidated origins near the `u8` ceiling saturate rather than wrap;
    /// validation rejects such ships on the bounds check.
    pub fn cells(&self) -> Vec<Coord> {
        (0..self.length)
            .map(|i| match self.orientation {
                Orientation::Horizontal => {
                    Coord::new(self.origin.x.saturating_add(i), self.origin.y)
                }
                Orientation::Vertical => Coord::new(self.origin.x, self.origin.y.saturating_add(i)),
            })
            .collect()
    }

    /// Whether the ship occupies the given cell.
    pub fn occupies(&self, coord: Coord) -> bool {
        match self.orientation {
            Orientation::Horizontal => {
                coord.y == self.origin.y
                    && coord.x >= self.origin.x
                    && (coord.x as u16) < self.origin.x as u16 + self.length as u16
            }
            Orientation::Vertical => {
                coord.x == self.origin.x
                    && coord.y >= self.origin.y
                    && (coord.y as u16) < self.origin.y as u16 + self.length as u16
            }
        }
    }

    /// Whether every occupied cell lies on the board.
    pub fn in_bounds(&self) -> bool {
        let end = match self.orientation {
            Orientation::Horizontal => self.origin.x as u16 + self.length as u16,
            Orientation::Vertical => self.origin.y as u16 + self.length as u16,
        };
        self.origin.in_bounds() && end <= BOARD_SIZE as u16
    }

    /// Clamps the origin so every cell fits on the board, shifting the
    /// minimal distance leftward/upward.
    pub fn clamped(mut self) -> Self {
        let max = BOARD_SIZE.saturating_sub(self.length);
        match self.orientation {
            Orientation::Horizontal => {
                self.origin.x = self.origin.x.min(max);
                self.origin.y = self.origin.y.min(BOARD_SIZE - 1);
            }
            Orientation::Vertical => {
                self.origin.x = self.origin.x.min(BOARD_SIZE - 1);
                self.origin.y = self.origin.y.min(max);
            }
        }
        self
    }
}
