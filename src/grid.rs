//! Grid model: rows x cols matrix of tokens, gravity and refill.

use crate::token::{Position, TokenKind};
use rand::Rng;
use rand::seq::SliceRandom;

/// Smallest run of identical kinds that counts as a match.
pub const MIN_RUN: usize = 3;

/// Single cell: either empty or a token of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Token(TokenKind, bool), // kind, fresh (spawned by the last refill)
}

impl Cell {
    #[inline]
    pub fn kind(self) -> Option<TokenKind> {
        match self {
            Self::Token(kind, _) => Some(kind),
            Self::Empty => None,
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }
}

/// Read-only view handed to opponent policies: `snapshot[row][col]`.
pub type GridSnapshot = Vec<Vec<Option<TokenKind>>>;

/// Board matrix. Row 0 is the top; dimensions never change after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    /// Kinds drawn when filling.
    kinds: &'static [TokenKind],
    /// cells[row][col].
    cells: Vec<Vec<Cell>>,
}

impl Grid {
    /// Empty grid (used as a starting point by tests and by `random`).
    pub fn empty(rows: usize, cols: usize, kinds: &'static [TokenKind]) -> Self {
        Self {
            rows,
            cols,
            kinds,
            cells: vec![vec![Cell::Empty; cols]; rows],
        }
    }

    /// Fill every cell with a random kind that does not complete a run with the two
    /// cells above or the two cells to the left at placement time.
    pub fn random<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        kinds: &'static [TokenKind],
        rng: &mut R,
    ) -> Self {
        let mut grid = Self::empty(rows, cols, kinds);
        for row in 0..rows {
            for col in 0..cols {
                let kind = loop {
                    let kind = grid.random_kind(rng);
                    if !grid.would_complete_run(row, col, kind) {
                        break kind;
                    }
                };
                grid.cells[row][col] = Cell::Token(kind, false);
            }
        }
        grid
    }

    /// Rebuild a grid from a snapshot (opponent look-ahead).
    pub fn from_snapshot(snapshot: &[Vec<Option<TokenKind>>], kinds: &'static [TokenKind]) -> Self {
        let rows = snapshot.len();
        let cols = snapshot.first().map_or(0, Vec::len);
        let mut grid = Self::empty(rows, cols, kinds);
        for (row, line) in snapshot.iter().enumerate() {
            for (col, kind) in line.iter().enumerate().take(cols) {
                grid.cells[row][col] = kind.map_or(Cell::Empty, |k| Cell::Token(k, false));
            }
        }
        grid
    }

    fn would_complete_run(&self, row: usize, col: usize, kind: TokenKind) -> bool {
        let same = |r: usize, c: usize| self.cells[r][c].kind() == Some(kind);
        (col >= 2 && same(row, col - 1) && same(row, col - 2))
            || (row >= 2 && same(row - 1, col) && same(row - 2, col))
    }

    pub fn random_kind<R: Rng + ?Sized>(&self, rng: &mut R) -> TokenKind {
        self.kinds[rng.random_range(0..self.kinds.len())]
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Cell at `pos`. Panics when out of range.
    #[inline]
    pub fn get(&self, pos: Position) -> Cell {
        self.cells[pos.row][pos.col]
    }

    #[inline]
    pub fn kind_at(&self, pos: Position) -> Option<TokenKind> {
        self.get(pos).kind()
    }

    /// Panics when out of range.
    #[inline]
    pub fn set(&mut self, pos: Position, cell: Cell) {
        self.cells[pos.row][pos.col] = cell;
    }

    pub fn swap(&mut self, a: Position, b: Position) {
        let tmp = self.get(a);
        self.set(a, self.get(b));
        self.set(b, tmp);
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Position::new(row, col)))
    }

    /// Gravity: compact tokens toward the bottom of each column, keeping their order.
    /// Returns true if any token moved.
    pub fn apply_gravity(&mut self) -> bool {
        let mut moved = false;
        for col in 0..self.cols {
            let mut write_row = self.rows;
            for row in (0..self.rows).rev() {
                let cell = self.cells[row][col];
                if cell.is_empty() {
                    continue;
                }
                write_row -= 1;
                if write_row != row {
                    self.cells[write_row][col] = cell;
                    self.cells[row][col] = Cell::Empty;
                    moved = true;
                }
            }
        }
        moved
    }

    /// Put a fresh random token in every empty cell. Returns how many were spawned.
    pub fn refill<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let mut spawned = 0;
        for row in 0..self.rows {
            for col in 0..self.cols {
                if self.cells[row][col].is_empty() {
                    self.cells[row][col] = Cell::Token(self.random_kind(rng), true);
                    spawned += 1;
                }
            }
        }
        spawned
    }

    /// Randomly permute the kinds of all occupied cells in place.
    pub fn shuffle_kinds<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let occupied: Vec<Position> = self.positions().filter(|&p| !self.get(p).is_empty()).collect();
        let mut kinds: Vec<TokenKind> = occupied.iter().filter_map(|&p| self.kind_at(p)).collect();
        kinds.shuffle(rng);
        for (pos, kind) in occupied.into_iter().zip(kinds) {
            self.set(pos, Cell::Token(kind, false));
        }
    }

    /// Drop the fresh marker from every token.
    pub fn clear_fresh(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            if let Cell::Token(kind, true) = *cell {
                *cell = Cell::Token(kind, false);
            }
        }
    }

    #[cfg(test)]
    pub fn count_kind(&self, kind: TokenKind) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| c.kind() == Some(kind))
            .count()
    }

    pub fn snapshot(&self) -> GridSnapshot {
        self.cells
            .iter()
            .map(|row| row.iter().map(|c| c.kind()).collect())
            .collect()
    }

    /// Length of the horizontal and vertical runs of `kind` through `pos`,
    /// counting `pos` itself as `kind`.
    pub fn run_lengths_through(&self, pos: Position, kind: TokenKind) -> (usize, usize) {
        let same = |r: usize, c: usize| self.cells[r][c].kind() == Some(kind);
        let mut horiz = 1;
        let mut c = pos.col;
        while c > 0 && same(pos.row, c - 1) {
            horiz += 1;
            c -= 1;
        }
        let mut c = pos.col + 1;
        while c < self.cols && same(pos.row, c) {
            horiz += 1;
            c += 1;
        }
        let mut vert = 1;
        let mut r = pos.row;
        while r > 0 && same(r - 1, pos.col) {
            vert += 1;
            r -= 1;
        }
        let mut r = pos.row + 1;
        while r < self.rows && same(r, pos.col) {
            vert += 1;
            r += 1;
        }
        (horiz, vert)
    }
}

/// Build a grid from letters: F W G E P D B for kinds, '.' for empty.
#[cfg(test)]
pub fn parse_grid(rows: &[&str]) -> Grid {
    let cols = rows.first().map_or(0, |r| r.len());
    let mut grid = Grid::empty(rows.len(), cols, &TokenKind::WITH_BERRY);
    for (r, line) in rows.iter().enumerate() {
        for (c, ch) in line.chars().enumerate() {
            let kind = match ch {
                'F' => Some(TokenKind::Fire),
                'W' => Some(TokenKind::Water),
                'G' => Some(TokenKind::Grass),
                'E' => Some(TokenKind::Electric),
                'P' => Some(TokenKind::Psychic),
                'D' => Some(TokenKind::Dark),
                'B' => Some(TokenKind::Berry),
                _ => None,
            };
            let cell = kind.map_or(Cell::Empty, |k| Cell::Token(k, false));
            grid.set(Position::new(r, c), cell);
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::detect_matches;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_random_grid_has_no_runs() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = Grid::random(7, 8, &TokenKind::ELEMENTS, &mut rng);
            assert!(detect_matches(&grid).is_empty(), "seed {seed}");
            assert!(grid.positions().all(|p| !grid.get(p).is_empty()));
        }
    }

    #[test]
    fn test_gravity_preserves_column_order() {
        let mut grid = parse_grid(&["F.", "W.", "..", "G.", "..", ".E"]);
        assert!(grid.apply_gravity());
        assert_eq!(grid.snapshot(), parse_grid(&["..", "..", "..", "F.", "W.", "GE"]).snapshot());
        assert!(!grid.apply_gravity());
    }

    #[test]
    fn test_refill_marks_fresh_tokens() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut grid = parse_grid(&["..F", "WWG"]);
        assert_eq!(grid.refill(&mut rng), 2);
        assert!(matches!(grid.get(Position::new(0, 0)), Cell::Token(_, true)));
        assert!(matches!(grid.get(Position::new(0, 2)), Cell::Token(_, false)));
        grid.clear_fresh();
        assert!(matches!(grid.get(Position::new(0, 0)), Cell::Token(_, false)));
    }

    #[test]
    fn test_shuffle_keeps_kind_counts() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut grid = parse_grid(&["FWG", "EPD", "FF."]);
        grid.shuffle_kinds(&mut rng);
        assert_eq!(grid.count_kind(TokenKind::Fire), 3);
        assert_eq!(grid.count_kind(TokenKind::Dark), 1);
        assert!(grid.get(Position::new(2, 2)).is_empty());
    }

    #[test]
    fn test_run_lengths_through() {
        let grid = parse_grid(&["FF.F", "...W", "...W"]);
        assert_eq!(grid.run_lengths_through(Position::new(0, 2), TokenKind::Fire), (4, 1));
        assert_eq!(grid.run_lengths_through(Position::new(0, 3), TokenKind::Water), (1, 3));
    }
}
