//! Swap validation and cascade resolution.
//!
//! A [`Board`] holds a committed grid that only changes when a transaction settles.
//! Each swap or power-up opens a [`Transaction`] on a working copy; the driver calls
//! [`Board::advance`] once per phase (flag, remove, drop, refill, rescan) at whatever
//! pace it wants, and the working copy is committed when no match remains.

use crate::grid::{Cell, Grid};
use crate::matcher::{CellMask, Match, MatchScan, detect_matches};
use crate::token::Position;
use log::debug;
use rand::Rng;
use std::time::Duration;

/// Points per matched token, before the combo multiplier.
pub const POINTS_PER_TOKEN: u32 = 10;

/// What happens to a swap that forms no match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapPolicy {
    /// Revert and report an invalid move.
    Strict,
    /// Keep the swap; the move still counts.
    Permissive,
}

/// What started a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Swap(Position, Position),
    PowerUp,
    Unstick,
    Shuffle,
}

/// Phase the in-flight transaction is waiting in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadePhase {
    /// Matched cells are flagged and about to be removed.
    Flagged,
    /// Flagged cells are gone; gravity is next.
    Removed,
    /// Columns compacted; refill is next.
    Dropped,
    /// New tokens placed; rescan is next.
    Refilled,
}

/// Delays the driver waits after each phase before advancing again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeTiming {
    pub flagged: Duration,
    pub removed: Duration,
    pub dropped: Duration,
    pub refilled: Duration,
}

impl CascadeTiming {
    pub const INSTANT: Self = Self {
        flagged: Duration::ZERO,
        removed: Duration::ZERO,
        dropped: Duration::ZERO,
        refilled: Duration::ZERO,
    };

    pub fn delay_for(&self, phase: CascadePhase) -> Duration {
        match phase {
            CascadePhase::Flagged => self.flagged,
            CascadePhase::Removed => self.removed,
            CascadePhase::Dropped => self.dropped,
            CascadePhase::Refilled => self.refilled,
        }
    }
}

impl Default for CascadeTiming {
    fn default() -> Self {
        Self {
            flagged: Duration::from_millis(200),
            removed: Duration::from_millis(100),
            dropped: Duration::ZERO,
            refilled: Duration::from_millis(300),
        }
    }
}

/// One batch of matches found in a cascade iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// 1-based chain index.
    pub combo: u32,
    pub matches: Vec<Match>,
    /// Σ(size × 10) × combo.
    pub points: u32,
    /// +1 per size-4 match, +2 per size ≥5.
    pub energy: u32,
    /// Number of matches of size ≥4.
    pub big_matches: u32,
}

impl Resolution {
    fn from_scan(scan: &MatchScan, combo: u32) -> Self {
        let tokens: u32 = scan.matches.iter().map(|m| m.size() as u32).sum();
        let energy = scan.matches.iter().map(|m| energy_for_size(m.size())).sum();
        let big_matches = scan.matches.iter().filter(|m| m.size() >= 4).count() as u32;
        Self {
            combo,
            matches: scan.matches.clone(),
            points: tokens * POINTS_PER_TOKEN * combo,
            energy,
            big_matches,
        }
    }
}

pub fn energy_for_size(size: usize) -> u32 {
    match size {
        0..=3 => 0,
        4 => 1,
        _ => 2,
    }
}

/// Summary of a finished transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub origin: Origin,
    pub had_match: bool,
    /// Highest chain level reached (0 if nothing matched).
    pub max_combo: u32,
}

/// Result of one call to [`Board::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeStep {
    Resolved(Resolution),
    Removed(usize),
    Dropped,
    Refilled(usize),
    Settled(Settlement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapOutcome {
    /// A transaction is already in flight.
    Busy,
    /// Not adjacent, out of bounds, or an empty cell.
    Rejected,
    /// Strict policy, no match: the swap was reverted.
    Invalid,
    /// Permissive policy, no match: the swap stands and the move is complete.
    Kept,
    /// First batch of matches is flagged; call `advance` to continue.
    Cascading(Resolution),
}

#[derive(Debug, Clone)]
struct Transaction {
    origin: Origin,
    work: Grid,
    phase: CascadePhase,
    flagged: CellMask,
    combo: u32,
    max_combo: u32,
    had_match: bool,
}

/// Committed grid plus at most one in-flight transaction.
#[derive(Debug, Clone)]
pub struct Board {
    committed: Grid,
    txn: Option<Transaction>,
}

impl Board {
    pub fn new(grid: Grid) -> Self {
        Self {
            committed: grid,
            txn: None,
        }
    }

    /// Grid to display: the working copy while animating, else the committed grid.
    pub fn view(&self) -> &Grid {
        self.txn.as_ref().map_or(&self.committed, |t| &t.work)
    }

    /// The last settled grid.
    pub fn committed(&self) -> &Grid {
        &self.committed
    }

    #[inline]
    pub fn is_animating(&self) -> bool {
        self.txn.is_some()
    }

    pub fn phase(&self) -> Option<CascadePhase> {
        self.txn.as_ref().map(|t| t.phase)
    }

    /// Cells flagged for removal in the current phase.
    pub fn flagged(&self) -> Option<&CellMask> {
        self.txn
            .as_ref()
            .filter(|t| t.phase == CascadePhase::Flagged)
            .map(|t| &t.flagged)
    }

    pub fn combo(&self) -> u32 {
        self.txn.as_ref().map_or(0, |t| t.combo)
    }

    fn open(&self, origin: Origin) -> Transaction {
        let mut work = self.committed.clone();
        work.clear_fresh();
        Transaction {
            origin,
            flagged: CellMask::new(work.rows(), work.cols()),
            work,
            phase: CascadePhase::Flagged,
            combo: 0,
            max_combo: 0,
            had_match: false,
        }
    }

    pub fn try_swap(&mut self, a: Position, b: Position, policy: SwapPolicy) -> SwapOutcome {
        if self.is_animating() {
            return SwapOutcome::Busy;
        }
        let grid = &self.committed;
        if !grid.contains(a) || !grid.contains(b) || !a.is_adjacent(b) {
            return SwapOutcome::Rejected;
        }
        if grid.get(a).is_empty() || grid.get(b).is_empty() {
            return SwapOutcome::Rejected;
        }

        let mut txn = self.open(Origin::Swap(a, b));
        txn.work.swap(a, b);
        let scan = detect_matches(&txn.work);
        if scan.is_empty() {
            return match policy {
                SwapPolicy::Strict => {
                    debug!("swap {:?}<->{:?} reverted: no match", a, b);
                    SwapOutcome::Invalid
                }
                SwapPolicy::Permissive => {
                    self.committed = txn.work;
                    SwapOutcome::Kept
                }
            };
        }

        let resolution = flag(&mut txn, &scan);
        self.txn = Some(txn);
        SwapOutcome::Cascading(resolution)
    }

    /// Open a transaction that removes `cells` (power-ups and the unstick blast).
    /// Returns false if one is already in flight.
    pub fn begin_clear(&mut self, cells: &[Position], origin: Origin) -> bool {
        if self.is_animating() {
            return false;
        }
        let mut txn = self.open(origin);
        for &pos in cells {
            if txn.work.contains(pos) && !txn.work.get(pos).is_empty() {
                txn.flagged.insert(pos);
            }
        }
        self.txn = Some(txn);
        true
    }

    /// Open a transaction that permutes every token, then rescans.
    pub fn begin_shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.is_animating() {
            return false;
        }
        let mut txn = self.open(Origin::Shuffle);
        txn.work.shuffle_kinds(rng);
        txn.phase = CascadePhase::Refilled;
        self.txn = Some(txn);
        true
    }

    /// Perform exactly one phase of the in-flight transaction.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<CascadeStep> {
        let txn = self.txn.as_mut()?;
        let step = match txn.phase {
            CascadePhase::Flagged => {
                let removed: Vec<Position> = txn.flagged.positions().collect();
                for &pos in &removed {
                    txn.work.set(pos, Cell::Empty);
                }
                txn.phase = CascadePhase::Removed;
                CascadeStep::Removed(removed.len())
            }
            CascadePhase::Removed => {
                txn.work.apply_gravity();
                txn.phase = CascadePhase::Dropped;
                CascadeStep::Dropped
            }
            CascadePhase::Dropped => {
                let spawned = txn.work.refill(rng);
                txn.phase = CascadePhase::Refilled;
                CascadeStep::Refilled(spawned)
            }
            CascadePhase::Refilled => {
                let scan = detect_matches(&txn.work);
                if scan.is_empty() {
                    return self.commit().map(CascadeStep::Settled);
                }
                CascadeStep::Resolved(flag(txn, &scan))
            }
        };
        debug!("cascade step {:?}", step_name(&step));
        Some(step)
    }

    #[cfg(test)]
    /// Run the transaction to completion, returning every step taken.
    pub fn settle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<CascadeStep> {
        let mut steps = Vec::new();
        while let Some(step) = self.advance(rng) {
            steps.push(step);
        }
        steps
    }

    fn commit(&mut self) -> Option<Settlement> {
        let txn = self.txn.take()?;
        self.committed = txn.work;
        Some(Settlement {
            origin: txn.origin,
            had_match: txn.had_match,
            max_combo: txn.max_combo,
        })
    }
}

fn flag(txn: &mut Transaction, scan: &MatchScan) -> Resolution {
    txn.combo += 1;
    txn.max_combo = txn.max_combo.max(txn.combo);
    txn.had_match = true;
    txn.flagged = scan.marked.clone();
    txn.phase = CascadePhase::Flagged;
    Resolution::from_scan(scan, txn.combo)
}

fn step_name(step: &CascadeStep) -> &'static str {
    match step {
        CascadeStep::Resolved(_) => "resolved",
        CascadeStep::Removed(_) => "removed",
        CascadeStep::Dropped => "dropped",
        CascadeStep::Refilled(_) => "refilled",
        CascadeStep::Settled(_) => "settled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::parse_grid;
    use crate::token::TokenKind;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn board(rows: &[&str]) -> Board {
        Board::new(parse_grid(rows))
    }

    #[test]
    fn test_strict_swap_without_match_reverts() {
        let mut b = board(&["FWG", "EPD", "WGF"]);
        let before = b.committed().clone();
        let out = b.try_swap(Position::new(0, 0), Position::new(0, 1), SwapPolicy::Strict);
        assert_eq!(out, SwapOutcome::Invalid);
        assert_eq!(b.committed(), &before);
        assert!(!b.is_animating());
    }

    #[test]
    fn test_permissive_swap_without_match_is_kept() {
        let mut b = board(&["FWG", "EPD", "WGF"]);
        let out = b.try_swap(Position::new(0, 0), Position::new(0, 1), SwapPolicy::Permissive);
        assert_eq!(out, SwapOutcome::Kept);
        assert_eq!(b.committed().kind_at(Position::new(0, 0)), Some(TokenKind::Water));
        assert!(!b.is_animating());
    }

    #[test]
    fn test_non_adjacent_and_out_of_bounds_rejected() {
        let mut b = board(&["FWG", "EPD", "WGF"]);
        let far = b.try_swap(Position::new(0, 0), Position::new(2, 2), SwapPolicy::Strict);
        assert_eq!(far, SwapOutcome::Rejected);
        let out = b.try_swap(Position::new(2, 2), Position::new(2, 3), SwapPolicy::Strict);
        assert_eq!(out, SwapOutcome::Rejected);
    }

    #[test]
    fn test_swap_cascades_and_settles_clean() {
        let mut rng = StdRng::seed_from_u64(11);
        // Swapping (0,2)<->(1,2) completes FFF on row 1.
        let mut b = board(&["WGFE", "FFPD", "GWEP", "DPWG"]);
        let out = b.try_swap(Position::new(0, 2), Position::new(1, 2), SwapPolicy::Strict);
        let SwapOutcome::Cascading(first) = out else {
            panic!("expected cascade, got {out:?}");
        };
        assert_eq!(first.combo, 1);
        assert_eq!(first.points, 30);
        assert!(b.is_animating());
        assert_eq!(
            b.try_swap(Position::new(3, 0), Position::new(3, 1), SwapPolicy::Strict),
            SwapOutcome::Busy
        );

        let steps = b.settle(&mut rng);
        let Some(CascadeStep::Settled(done)) = steps.last() else {
            panic!("transaction did not settle");
        };
        assert!(done.had_match);
        assert!(done.max_combo >= 1);
        assert!(!b.is_animating());
        assert!(detect_matches(b.committed()).is_empty());
        assert!(b.committed().positions().all(|p| !b.committed().get(p).is_empty()));
    }

    #[test]
    fn test_phase_order() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut b = board(&["WGFE", "FFPD", "GWEP", "DPWG"]);
        b.try_swap(Position::new(0, 2), Position::new(1, 2), SwapPolicy::Strict);
        assert_eq!(b.phase(), Some(CascadePhase::Flagged));
        assert_eq!(b.flagged().map(|m| m.count()), Some(3));
        assert_eq!(b.advance(&mut rng), Some(CascadeStep::Removed(3)));
        assert_eq!(b.advance(&mut rng), Some(CascadeStep::Dropped));
        assert_eq!(b.advance(&mut rng), Some(CascadeStep::Refilled(3)));
        assert_eq!(b.phase(), Some(CascadePhase::Refilled));
    }

    #[test]
    fn test_shared_cell_removed_once() {
        let mut rng = StdRng::seed_from_u64(2);
        // E(2,2)<->F(2,3) forms row 2 FFF and column 2 FFF sharing (2,2).
        let mut b = board(&["WGFD", "PDWE", "FFEF", "GWFP", "EPFG"]);
        let out = b.try_swap(Position::new(2, 2), Position::new(2, 3), SwapPolicy::Strict);
        let SwapOutcome::Cascading(res) = out else {
            panic!("expected cascade, got {out:?}");
        };
        assert_eq!(res.matches.len(), 2);
        assert_eq!(res.points, 60);
        assert_eq!(b.flagged().map(|m| m.count()), Some(5));
        assert_eq!(b.advance(&mut rng), Some(CascadeStep::Removed(5)));
    }

    #[test]
    fn test_energy_per_match_size() {
        assert_eq!(energy_for_size(3), 0);
        assert_eq!(energy_for_size(4), 1);
        assert_eq!(energy_for_size(5), 2);
        assert_eq!(energy_for_size(7), 2);
    }

    #[test]
    fn test_begin_clear_refills_and_settles() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut b = board(&["FWG", "EPD", "WGF"]);
        assert!(b.begin_clear(&[Position::new(1, 1), Position::new(0, 1)], Origin::PowerUp));
        assert!(!b.begin_clear(&[Position::new(0, 0)], Origin::PowerUp));
        let steps = b.settle(&mut rng);
        assert_eq!(steps.first(), Some(&CascadeStep::Removed(2)));
        assert!(matches!(
            steps.last(),
            Some(CascadeStep::Settled(Settlement { origin: Origin::PowerUp, .. }))
        ));
        assert!(detect_matches(b.committed()).is_empty());
    }
}
