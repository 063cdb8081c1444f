//! Match detection: maximal horizontal and vertical runs of three or more.

use crate::grid::{Grid, MIN_RUN};
use crate::token::{Position, TokenKind};

/// One maximal run of identical kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub kind: TokenKind,
    pub positions: Vec<Position>,
}

impl Match {
    #[inline]
    pub fn size(&self) -> usize {
        self.positions.len()
    }
}

/// Removal bitmap: each cell is flagged at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellMask {
    cols: usize,
    bits: Vec<bool>,
}

impl CellMask {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            bits: vec![false; rows * cols],
        }
    }

    /// Flags `pos`; returns false if it was already flagged.
    pub fn insert(&mut self, pos: Position) -> bool {
        let idx = pos.row * self.cols + pos.col;
        !std::mem::replace(&mut self.bits[idx], true)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.bits
            .get(pos.row * self.cols + pos.col)
            .copied()
            .unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|b| *b)
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(|(i, _)| Position::new(i / self.cols, i % self.cols))
    }
}

/// Detector output: every qualifying run plus the cells to remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchScan {
    pub matches: Vec<Match>,
    pub marked: CellMask,
}

impl MatchScan {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Scan rows then columns. A cell in both a horizontal and a vertical run is listed
/// in both matches but flagged once in `marked`.
pub fn detect_matches(grid: &Grid) -> MatchScan {
    let (rows, cols) = (grid.rows(), grid.cols());
    let mut matches = Vec::new();
    let mut marked = CellMask::new(rows, cols);

    for row in 0..rows {
        scan_line(grid, cols, |i| Position::new(row, i), &mut matches, &mut marked);
    }
    for col in 0..cols {
        scan_line(grid, rows, |i| Position::new(i, col), &mut matches, &mut marked);
    }

    MatchScan { matches, marked }
}

fn scan_line(
    grid: &Grid,
    len: usize,
    at: impl Fn(usize) -> Position,
    matches: &mut Vec<Match>,
    marked: &mut CellMask,
) {
    let mut start = 0;
    while start < len {
        let Some(kind) = grid.kind_at(at(start)) else {
            start += 1;
            continue;
        };
        let mut end = start + 1;
        while end < len && grid.kind_at(at(end)) == Some(kind) {
            end += 1;
        }
        if end - start >= MIN_RUN {
            let positions: Vec<Position> = (start..end).map(&at).collect();
            for &pos in &positions {
                marked.insert(pos);
            }
            matches.push(Match { kind, positions });
        }
        start = end;
    }
}
