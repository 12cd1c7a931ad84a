//! Board geometry: coordinates, orientation, and the fixed 10×10 grid.

use serde::{Deserialize, Serialize};

/// Side length of the square board.
pub const BOARD_SIZE: u8 = 10;

/// A cell coordinate on the board. `(0, 0)` is the top-left corner;
/// `x` grows rightward, `y` grows downward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_new::new,
)]
pub struct Coord {
    /// Column, `0..BOARD_SIZE`.
    pub x: u8,
    /// Row, `0..BOARD_SIZE`.
    pub y: u8,
}

impl Coord {
    /// Whether this coordinate lies on the board.
    pub fn in_bounds(self) -> bool {
        self.x < BOARD_SIZE && self.y < BOARD_SIZE
    }

    /// The in-bounds 4-directional neighbors of this cell.
    pub fn neighbors4(self) -> Vec<Coord> {
        let mut out = Vec::with_capacity(4);
        if self.x > 0 {
            out.push(Coord::new(self.x - 1, self.y));
        }
        if self.x + 1 < BOARD_SIZE {
            out.push(Coord::new(self.x + 1, self.y));
        }
        if self.y > 0 {
            out.push(Coord::new(self.x, self.y - 1));
        }
        if self.y + 1 < BOARD_SIZE {
            out.push(Coord::new(self.x, self.y + 1));
        }
        out
    }

    /// Manhattan distance to another cell.
    pub fn manhattan(self, other: Coord) -> u32 {
        self.x.abs_diff(other.x) as u32 + self.y.abs_diff(other.y) as u32
    }

    /// Every cell of the board in row-major order (ascending `y`, then `x`).
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..BOARD_SIZE).flat_map(|y| (0..BOARD_SIZE).map(move |x| Coord::new(x, y)))
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Cells extend rightward from the origin.
    Horizontal,
    /// Cells extend downward from the origin.
    Vertical,
}

impl Orientation {
    /// Returns the other orientation.
    pub fn toggled(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}
