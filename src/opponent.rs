//! Computer opponent: picks a swap from a read-only board snapshot.

use crate::grid::{Cell, Grid};
use crate::matcher::detect_matches;
use crate::moves::{Move, all_moves};
use crate::token::TokenKind;
use log::trace;
use rand::Rng;
use rand::rngs::StdRng;
use std::cmp::Ordering;

/// Anything that can propose a move for the non-human side.
pub trait OpponentPolicy {
    /// An adjacent swap to play, or None when it sees nothing worth playing.
    fn propose_move(&mut self, snapshot: &[Vec<Option<TokenKind>>], rows: usize, cols: usize) -> Option<Move>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Scored {
    mv: Move,
    /// Cleared tokens × 10.
    score: u32,
    largest: usize,
    /// Points from matches left after one drop, without refill.
    cascade: u32,
}

impl Scored {
    fn total(&self) -> f64 {
        f64::from(self.score) + f64::from(self.cascade) * 0.5
    }

    /// Moves with a run of four or more first, then by total.
    fn rank(a: &Self, b: &Self) -> Ordering {
        let big = |s: &Self| s.largest >= 4;
        big(b)
            .cmp(&big(a))
            .then_with(|| b.total().partial_cmp(&a.total()).unwrap_or(Ordering::Equal))
    }
}

/// Greedy one-ply search with a one-level cascade estimate.
#[derive(Debug)]
pub struct GreedyOpponent {
    /// Probability of playing the best move rather than one of the top three.
    skill: f64,
    rng: StdRng,
}

impl GreedyOpponent {
    pub fn new(skill: f64, rng: StdRng) -> Self {
        Self {
            skill: skill.clamp(0.0, 1.0),
            rng,
        }
    }

    fn evaluate(grid: &Grid, mv: Move) -> Scored {
        let mut work = grid.clone();
        work.swap(mv.from, mv.to);
        let scan = detect_matches(&work);
        let largest = scan.matches.iter().map(|m| m.size()).max().unwrap_or(0);
        let score = scan.marked.count() as u32 * 10;
        for pos in scan.marked.positions() {
            work.set(pos, Cell::Empty);
        }
        work.apply_gravity();
        let cascade = detect_matches(&work).marked.count() as u32 * 10;
        Scored { mv, score, largest, cascade }
    }
}

impl OpponentPolicy for GreedyOpponent {
    fn propose_move(&mut self, snapshot: &[Vec<Option<TokenKind>>], rows: usize, cols: usize) -> Option<Move> {
        let grid = Grid::from_snapshot(snapshot, &TokenKind::WITH_BERRY);
        if grid.rows() != rows || grid.cols() != cols {
            return None;
        }
        let mut scored: Vec<Scored> = all_moves(&grid).into_iter().map(|mv| Self::evaluate(&grid, mv)).collect();
        scored.sort_by(Scored::rank);
        trace!("opponent sees {} moves", scored.len());

        let best = scored.first()?;
        if scored.len() > 1 && !self.rng.random_bool(self.skill) {
            let top = scored.len().min(3);
            return Some(scored[self.rng.random_range(0..top)].mv);
        }
        Some(best.mv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::parse_grid;
    use crate::token::Position;
    use rand::SeedableRng;

    fn opponent(skill: f64) -> GreedyOpponent {
        GreedyOpponent::new(skill, StdRng::seed_from_u64(3))
    }

    #[test]
    fn test_prefers_four_run() {
        // W(0,2)<->F(1,2) completes FFFF on row 0; the other two moves make threes.
        let grid = parse_grid(&["FFWFG", "WGFEP", "GPDEW", "DWGPE"]);
        let mv = opponent(1.0).propose_move(&grid.snapshot(), 4, 5);
        assert_eq!(mv, Some(Move { from: Position::new(0, 2), to: Position::new(1, 2) }));
    }

    #[test]
    fn test_no_move_on_stuck_board() {
        let grid = parse_grid(&["FWGE", "PDFW", "GEPD", "FWGE"]);
        assert_eq!(opponent(1.0).propose_move(&grid.snapshot(), 4, 4), None);
    }

    #[test]
    fn test_low_skill_still_plays_valid_moves() {
        let grid = parse_grid(&["FFWFG", "WGFEP", "GPDEW", "DWGPE"]);
        let valid = all_moves(&grid);
        let mut ai = opponent(0.0);
        for _ in 0..20 {
            let mv = ai.propose_move(&grid.snapshot(), 4, 5).unwrap();
            assert!(valid.contains(&mv));
        }
    }
}
