//! Fleet placement: validation, random generation, and the deterministic
//! collision resolver used for live drag/rotate previews.
//!
//! Everything here is a pure function. The resolver in particular must be
//! reproducible on both client and server: the same ship list and active
//! ship always yield the same output.

use crate::error::PlacementError;
use crate::grid::{BOARD_SIZE, Coord, Orientation};
use crate::ships::{Ship, ShipKind};
use rand::Rng;
use std::collections::{HashSet, VecDeque};

/// Attempt budget for random fleet generation before giving up.
const MAX_GENERATION_ATTEMPTS: u32 = 1_000;

/// Validates a committed fleet.
///
/// Checks, in order: exactly the five required classes present with no
/// duplicates, recorded lengths canonical, every cell in bounds, and no
/// two ships sharing a cell. Each failure maps to its own
/// [`PlacementError`] category.
pub fn validate_placement(ships: &[Ship]) -> Result<(), PlacementError> {
    for kind in ShipKind::all() {
        let count = ships.iter().filter(|s| s.kind == kind).count();
        if count == 0 {
            return Err(PlacementError::MissingShip { kind });
        }
        if count > 1 {
            return Err(PlacementError::DuplicateShip { kind });
        }
    }
    for ship in ships {
        if ship.length != ship.kind.length() {
            return Err(PlacementError::WrongLength {
                kind: ship.kind,
                expected: ship.kind.length(),
                actual: ship.length,
            });
        }
        if !ship.in_bounds() {
            return Err(PlacementError::OutOfBounds { kind: ship.kind });
        }
    }
    let mut occupied: HashSet<Coord> = HashSet::new();
    for ship in ships {
        for cell in ship.cells() {
            if !occupied.insert(cell) {
                let other = ships
                    .iter()
                    .find(|s| s.kind != ship.kind && s.occupies(cell))
                    .map(|s| s.kind)
                    .unwrap_or(ship.kind);
                return Err(PlacementError::Overlap {
                    first: other,
                    second: ship.kind,
                });
            }
        }
    }
    Ok(())
}

/// Places all five ships at random, retrying any draw that collides with
/// ships already down.
///
/// # Errors
///
/// Returns [`PlacementError::GenerationExhausted`] if the attempt budget
/// runs out, which does not happen in practice on a 10×10 board.
pub fn generate_random_placement<R: Rng>(rng: &mut R) -> Result<Vec<Ship>, PlacementError> {
    let mut ships: Vec<Ship> = Vec::with_capacity(5);
    let mut occupied: HashSet<Coord> = HashSet::new();
    for kind in ShipKind::all() {
        let mut placed = false;
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let orientation = if rng.gen_bool(0.5) {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let max_x = match orientation {
                Orientation::Horizontal => BOARD_SIZE - kind.length(),
                Orientation::Vertical => BOARD_SIZE - 1,
            };
            let max_y = match orientation {
                Orientation::Horizontal => BOARD_SIZE - 1,
                Orientation::Vertical => BOARD_SIZE - kind.length(),
            };
            let origin = Coord::new(rng.gen_range(0..=max_x), rng.gen_range(0..=max_y));
            let candidate = Ship::new(kind, origin, orientation);
            if candidate.cells().iter().all(|c| !occupied.contains(c)) {
                occupied.extend(candidate.cells());
                ships.push(candidate);
                placed = true;
                break;
            }
        }
        if !placed {
            return Err(PlacementError::GenerationExhausted);
        }
    }
    Ok(ships)
}

/// Repositions ships that overlap the active ship after a drag or rotate.
///
/// The active ship's position is fixed and never moved. Each overlapping
/// ship is relocated to the first in-bounds, non-colliding origin when
/// candidates are ordered by ascending Manhattan distance from that ship's
/// own current origin, ties broken by smaller `y` then smaller `x`, with
/// orientation preserved. A relocation that lands on a not-yet-processed
/// ship enqueues that ship in turn. If any ship exhausts all 100 candidate
/// origins, the incremental approach is abandoned for a full repack (see
/// [`repack`]).
pub fn resolve_placement(ships: &[Ship], active_kind: ShipKind) -> Vec<Ship> {
    let Some(active) = ships.iter().find(|s| s.kind == active_kind) else {
        return ships.to_vec();
    };
    let active = active.clone();
    let active_cells: HashSet<Coord> = active.cells().into_iter().collect();

    // Occupancy starts from the active ship only; untouched ships join it
    // lazily through the cascade.
    let mut occupied = active_cells;
    let mut resolved: Vec<Ship> = vec![active.clone()];

    let mut queue: VecDeque<Ship> = VecDeque::new();
    let mut pending: Vec<Ship> = Vec::new();
    for ship in ships.iter().filter(|s| s.kind != active_kind) {
        if ship.cells().iter().any(|c| occupied.contains(c)) {
            queue.push_back(ship.clone());
        } else {
            pending.push(ship.clone());
        }
    }

    while let Some(ship) = queue.pop_front() {
        let mut candidates: Vec<Coord> = Coord::all().collect();
        candidates.sort_by_key(|c| (c.manhattan(ship.origin), c.y, c.x));

        let mut relocated = None;
        for origin in candidates {
            let trial = Ship::new(ship.kind, origin, ship.orientation);
            if trial.in_bounds() && trial.cells().iter().all(|c| !occupied.contains(c)) {
                relocated = Some(trial);
                break;
            }
        }
        let Some(trial) = relocated else {
            return repack(ships, &active);
        };

        occupied.extend(trial.cells());
        // Cascade: displace any untouched ship the relocation landed on.
        let mut i = 0;
        while i < pending.len() {
            if pending[i].cells().iter().any(|c| trial.occupies(*c)) {
                queue.push_back(pending.remove(i));
            } else {
                i += 1;
            }
        }
        resolved.push(trial);
    }

    resolved.extend(pending);
    order_like(ships, resolved)
}

/// Deterministic fallback: keeps the active ship fixed, sorts the rest by
/// class name, and packs each into the first free position scanning
/// row-major from the board origin, orientation preserved.
fn repack(ships: &[Ship], active: &Ship) -> Vec<Ship> {
    let mut occupied: HashSet<Coord> = active.cells().into_iter().collect();
    let mut remaining: Vec<Ship> = ships.iter().filter(|s| s.kind != active.kind).cloned().collect();
    remaining.sort_by_key(|s| s.kind.to_string());

    let mut packed = vec![active.clone()];
    for ship in remaining {
        let mut placed = None;
        for origin in Coord::all() {
            let trial = Ship::new(ship.kind, origin, ship.orientation);
            if trial.in_bounds() && trial.cells().iter().all(|c| !occupied.contains(c)) {
                placed = Some(trial);
                break;
            }
        }
        match placed {
            Some(trial) => {
                occupied.extend(trial.cells());
                packed.push(trial);
            }
            // 17 ship cells cannot fill a 100-cell board; keep the ship
            // where it was rather than lose it.
            None => packed.push(ship),
        }
    }
    order_like(ships, packed)
}

/// Reorders `resolved` to match the ship order of the input list, so the
/// resolver's output is stable regardless of queue processing order.
fn order_like(input: &[Ship], resolved: Vec<Ship>) -> Vec<Ship> {
    let mut out = Vec::with_capacity(resolved.len());
    for ship in input {
        if let Some(r) = resolved.iter().find(|s| s.kind == ship.kind) {
            out.push(r.clone());
        }
    }
    out
}

/// Toggles the active ship's orientation, clamps it onto the board, and
/// resolves any overlaps the rotation created.
pub fn rotate_and_resolve(ships: &[Ship], active_kind: ShipKind) -> Vec<Ship> {
    let mut updated = ships.to_vec();
    let Some(ship) = updated.iter_mut().find(|s| s.kind == active_kind) else {
        return updated;
    };
    ship.orientation = ship.orientation.toggled();
    *ship = ship.clone().clamped();
    resolve_placement(&updated, active_kind)
}

/// Moves the active ship to a new origin, clamps it onto the board, and
/// resolves any overlaps the move created.
pub fn move_and_resolve(ships: &[Ship], active_kind: ShipKind, origin: Coord) -> Vec<Ship> {
    let mut updated = ships.to_vec();
    let Some(ship) = updated.iter_mut().find(|s| s.kind == active_kind) else {
        return updated;
    };
    ship.origin = origin;
    *ship = ship.clone().clamped();
    resolve_placement(&updated, active_kind)
}
