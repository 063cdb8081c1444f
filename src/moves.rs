//! No-move detection and hints.

use crate::grid::{Grid, MIN_RUN};
use crate::token::Position;

/// A candidate swap between two adjacent cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Position,
    pub to: Position,
}

/// Right and down neighbour swaps for every cell, in row-major order.
fn candidate_swaps(grid: &Grid) -> impl Iterator<Item = Move> + '_ {
    grid.positions().flat_map(move |from| {
        let right = (from.col + 1 < grid.cols()).then(|| Position::new(from.row, from.col + 1));
        let down = (from.row + 1 < grid.rows()).then(|| Position::new(from.row + 1, from.col));
        [right, down].into_iter().flatten().map(move |to| Move { from, to })
    })
}

/// True if swapping `mv` would put either endpoint in a run of three.
/// Only the two swapped cells are checked.
pub fn swap_forms_match(grid: &mut Grid, mv: Move) -> bool {
    let (Some(a), Some(b)) = (grid.kind_at(mv.from), grid.kind_at(mv.to)) else {
        return false;
    };
    if a == b {
        return false;
    }
    grid.swap(mv.from, mv.to);
    let forms = [(mv.from, b), (mv.to, a)].into_iter().any(|(pos, kind)| {
        let (h, v) = grid.run_lengths_through(pos, kind);
        h >= MIN_RUN || v >= MIN_RUN
    });
    grid.swap(mv.from, mv.to);
    forms
}

/// First swap (row-major, right before down) that forms a match.
pub fn find_hint(grid: &Grid) -> Option<Move> {
    let mut scratch = grid.clone();
    candidate_swaps(grid).find(|&mv| swap_forms_match(&mut scratch, mv))
}

pub fn has_any_move(grid: &Grid) -> bool {
    find_hint(grid).is_some()
}

/// Every swap that forms a match.
pub fn all_moves(grid: &Grid) -> Vec<Move> {
    let mut scratch = grid.clone();
    candidate_swaps(grid)
        .filter(|&mv| swap_forms_match(&mut scratch, mv))
        .collect()
}

/// 3x3 block around `center`, clipped to the board.
pub fn area_around(grid: &Grid, center: Position) -> Vec<Position> {
    let rows = center.row.saturating_sub(1)..=(center.row + 1).min(grid.rows() - 1);
    rows.flat_map(|row| {
        let cols = center.col.saturating_sub(1)..=(center.col + 1).min(grid.cols() - 1);
        cols.map(move |col| Position::new(row, col))
    })
    .collect()
}
