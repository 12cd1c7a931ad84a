//! Bot targeting: hunt mode around unfinished hits, probability-heatmap
//! search otherwise.
//!
//! Stateless by design. Every recommendation is derived from the
//! defender's full shot history plus the caller's RNG, so behavior is
//! reproducible under a seeded generator and survives process restarts.

use crate::board::{Shot, ShotResult};
use crate::grid::{BOARD_SIZE, Coord};
use crate::ships::ShipKind;
use rand::Rng;
use std::collections::HashSet;

/// Number of top-heat cells the search draw is taken from.
const SEARCH_POOL_SIZE: usize = 15;

/// Per-cell placement counts plus the lengths still afloat, exposed for
/// inspection and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heatmap {
    /// Count of valid remaining-ship placements covering each cell,
    /// indexed `[y][x]`.
    pub weights: [[u32; BOARD_SIZE as usize]; BOARD_SIZE as usize],
    /// Lengths of ships not yet confirmed sunk, descending.
    pub remaining_lengths: Vec<u8>,
}

/// Recommends the bot's next target given the shots already fired at the
/// defender's board.
///
/// Returns `None` only once every cell has been fired upon, which a
/// correctly bounded game never reaches.
pub fn recommend_target<R: Rng>(shots: &[Shot], rng: &mut R) -> Option<Coord> {
    let fired = fired_cells(shots);
    let forbidden = forbidden_cells(shots);

    let hunt = hunt_candidates(shots, &fired, &forbidden);
    if !hunt.is_empty() {
        return Some(hunt[rng.gen_range(0..hunt.len())]);
    }

    search_target(shots, &fired, rng)
}

/// Builds the search-mode heatmap from the shot history.
///
/// For every remaining ship length, every horizontal and vertical
/// placement avoiding fired and forbidden cells increments the heat of
/// each cell it would cover.
pub fn heatmap(shots: &[Shot]) -> Heatmap {
    let fired = fired_cells(shots);
    let forbidden = forbidden_cells(shots);
    let blocked: HashSet<Coord> = fired.union(&forbidden).copied().collect();

    let remaining_lengths = remaining_lengths(shots);
    let mut weights = [[0u32; BOARD_SIZE as usize]; BOARD_SIZE as usize];
    for &len in &remaining_lengths {
        for y in 0..BOARD_SIZE {
            for x in 0..=(BOARD_SIZE - len) {
                let cells: Vec<Coord> = (0..len).map(|i| Coord::new(x + i, y)).collect();
                stamp(&mut weights, &cells, &blocked);
            }
        }
        for x in 0..BOARD_SIZE {
            for y in 0..=(BOARD_SIZE - len) {
                let cells: Vec<Coord> = (0..len).map(|i| Coord::new(x, y + i)).collect();
                stamp(&mut weights, &cells, &blocked);
            }
        }
    }
    Heatmap {
        weights,
        remaining_lengths,
    }
}

/// Counts one candidate placement: skipped entirely if any covered cell
/// is blocked, otherwise every covered cell gains one heat.
fn stamp(
    weights: &mut [[u32; BOARD_SIZE as usize]; BOARD_SIZE as usize],
    cells: &[Coord],
    blocked: &HashSet<Coord>,
) {
    if cells.iter().any(|c| blocked.contains(c)) {
        return;
    }
    for c in cells {
        weights[c.y as usize][c.x as usize] += 1;
    }
}

/// Lengths of ships not yet confirmed sunk: the canonical multiset
/// {5, 4, 3, 3, 2} minus the lengths of sunk classes, descending.
pub fn remaining_lengths(shots: &[Shot]) -> Vec<u8> {
    let sunk: HashSet<ShipKind> = shots
        .iter()
        .filter_map(|s| match &s.result {
            ShotResult::Sunk { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect();
    let mut lengths: Vec<u8> = ShipKind::all()
        .into_iter()
        .filter(|k| !sunk.contains(k))
        .map(|k| k.length())
        .collect();
    lengths.sort_unstable_by(|a, b| b.cmp(a));
    lengths
}

/// Eligible hunt-mode targets, pooled across every cluster of active hits
/// and deduplicated. Empty when no active hits exist.
pub fn hunt_candidates(
    shots: &[Shot],
    fired: &HashSet<Coord>,
    forbidden: &HashSet<Coord>,
) -> Vec<Coord> {
    let active = active_hits(shots);
    if active.is_empty() {
        return Vec::new();
    }

    let eligible =
        |c: &Coord| c.in_bounds() && !fired.contains(c) && !forbidden.contains(c);

    let mut pool: Vec<Coord> = Vec::new();
    for cluster in clusters(&active) {
        match alignment(&cluster) {
            Some(Axis::Row(y)) if cluster.len() >= 2 => {
                let min_x = cluster.iter().map(|c| c.x).min().unwrap_or(0);
                let max_x = cluster.iter().map(|c| c.x).max().unwrap_or(0);
                if min_x > 0 {
                    let end = Coord::new(min_x - 1, y);
                    if eligible(&end) {
                        pool.push(end);
                    }
                }
                let end = Coord::new(max_x + 1, y);
                if eligible(&end) {
                    pool.push(end);
                }
            }
            Some(Axis::Column(x)) if cluster.len() >= 2 => {
                let min_y = cluster.iter().map(|c| c.y).min().unwrap_or(0);
                let max_y = cluster.iter().map(|c| c.y).max().unwrap_or(0);
                if min_y > 0 {
                    let end = Coord::new(x, min_y - 1);
                    if eligible(&end) {
                        pool.push(end);
                    }
                }
                let end = Coord::new(x, max_y + 1);
                if eligible(&end) {
                    pool.push(end);
                }
            }
            // Single hits and bent clusters fall back to any open neighbor.
            _ => {
                for cell in &cluster {
                    for n in cell.neighbors4() {
                        if eligible(&n) {
                            pool.push(n);
                        }
                    }
                }
            }
        }
    }
    pool.sort_by_key(|c| (c.y, c.x));
    pool.dedup();
    pool
}

/// Picks a search-mode target: weighted random over the top heat cells,
/// uniform over all unfired cells when every heat is zero.
fn search_target<R: Rng>(shots: &[Shot], fired: &HashSet<Coord>, rng: &mut R) -> Option<Coord> {
    let map = heatmap(shots);

    let mut scored: Vec<(Coord, u32)> = Coord::all()
        .filter(|c| !fired.contains(c))
        .map(|c| (c, map.weights[c.y as usize][c.x as usize]))
        .collect();
    if scored.is_empty() {
        return None;
    }
    // Stable order before truncation keeps the draw reproducible.
    scored.sort_by_key(|(c, w)| (std::cmp::Reverse(*w), c.y, c.x));
    scored.truncate(SEARCH_POOL_SIZE);

    let total: u64 = scored.iter().map(|(_, w)| *w as u64).sum();
    if total == 0 {
        let open: Vec<Coord> = Coord::all().filter(|c| !fired.contains(c)).collect();
        return Some(open[rng.gen_range(0..open.len())]);
    }

    // Cumulative-weight array with a single uniform draw.
    let mut draw = rng.gen_range(0..total);
    for (coord, weight) in &scored {
        let weight = *weight as u64;
        if draw < weight {
            return Some(*coord);
        }
        draw -= weight;
    }
    scored.last().map(|(c, _)| *c)
}

/// Coordinates of every shot fired so far.
fn fired_cells(shots: &[Shot]) -> HashSet<Coord> {
    shots.iter().map(|s| s.coord).collect()
}

/// Cells belonging to confirmed-sunk ships; never re-targeted.
fn forbidden_cells(shots: &[Shot]) -> HashSet<Coord> {
    shots
        .iter()
        .filter_map(|s| match &s.result {
            ShotResult::Sunk { cells, .. } => Some(cells.iter().copied()),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Hits not yet subsumed by a sunk ship's cell set.
fn active_hits(shots: &[Shot]) -> HashSet<Coord> {
    let forbidden = forbidden_cells(shots);
    shots
        .iter()
        .filter(|s| matches!(s.result, ShotResult::Hit))
        .map(|s| s.coord)
        .filter(|c| !forbidden.contains(c))
        .collect()
}

/// Groups active hits into 4-directionally connected clusters.
fn clusters(active: &HashSet<Coord>) -> Vec<Vec<Coord>> {
    let mut seen: HashSet<Coord> = HashSet::new();
    let mut out = Vec::new();
    let mut seeds: Vec<Coord> = active.iter().copied().collect();
    seeds.sort_by_key(|c| (c.y, c.x));
    for seed in seeds {
        if seen.contains(&seed) {
            continue;
        }
        let mut cluster = Vec::new();
        let mut stack = vec![seed];
        seen.insert(seed);
        while let Some(cell) = stack.pop() {
            cluster.push(cell);
            for n in cell.neighbors4() {
                if active.contains(&n) && seen.insert(n) {
                    stack.push(n);
                }
            }
        }
        cluster.sort_by_key(|c| (c.y, c.x));
        out.push(cluster);
    }
    out
}

/// Line a cluster lies on, if it is consistently aligned.
enum Axis {
    Row(u8),
    Column(u8),
}

fn alignment(cluster: &[Coord]) -> Option<Axis> {
    let first = cluster.first()?;
    if cluster.iter().all(|c| c.y == first.y) {
        Some(Axis::Row(first.y))
    } else if cluster.iter().all(|c| c.x == first.x) {
        Some(Axis::Column(first.x))
    } else {
        None
    }
}
