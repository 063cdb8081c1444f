//! Energy meter and power-up effects.

use crate::grid::Grid;
use crate::moves::area_around;
use crate::token::Position;
use rand::Rng;

/// Energy needed to earn a power-up.
pub const MAX_ENERGY: u32 = 4;

pub const AREA_BONUS: u32 = 50;
pub const CROSS_BONUS: u32 = 100;
pub const COLOR_CLEAR_PER_CELL: u32 = 15;
/// Flat bonus for the forced 3x3 blast on a stuck board.
pub const STUCK_BONUS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpKind {
    /// 3x3 around the target.
    Area,
    /// Whole row and column of the target.
    Cross,
    /// Every token of the target's kind.
    ColorClear,
    /// Permute every token; needs no target.
    Shuffle,
}

impl PowerUpKind {
    pub const ALL: [Self; 4] = [Self::Area, Self::Cross, Self::ColorClear, Self::Shuffle];

    pub fn needs_target(self) -> bool {
        self != Self::Shuffle
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Area => "Bomb",
            Self::Cross => "Lightning",
            Self::ColorClear => "Rainbow",
            Self::Shuffle => "Shuffle",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Area => "clears a 3x3 area",
            Self::Cross => "clears a row and a column",
            Self::ColorClear => "clears every token of one kind",
            Self::Shuffle => "shuffles the board",
        }
    }

    /// Cells removed when fired at `target`. Empty for `Shuffle`.
    pub fn target_cells(self, grid: &Grid, target: Position) -> Vec<Position> {
        match self {
            Self::Area => area_around(grid, target),
            Self::Cross => grid
                .positions()
                .filter(|p| p.row == target.row || p.col == target.col)
                .collect(),
            Self::ColorClear => match grid.kind_at(target) {
                Some(kind) => grid.positions().filter(|&p| grid.kind_at(p) == Some(kind)).collect(),
                None => Vec::new(),
            },
            Self::Shuffle => Vec::new(),
        }
    }

    /// Flat score for firing this power-up over `cleared` cells.
    pub fn bonus(self, cleared: usize) -> u32 {
        match self {
            Self::Area => AREA_BONUS,
            Self::Cross => CROSS_BONUS,
            Self::ColorClear => cleared as u32 * COLOR_CLEAR_PER_CELL,
            Self::Shuffle => 0,
        }
    }
}

/// Per-side energy with at most one stored power-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnergyMeter {
    energy: u32,
    stored: Option<PowerUpKind>,
}

impl EnergyMeter {
    pub fn energy(&self) -> u32 {
        self.energy
    }

    pub fn stored(&self) -> Option<PowerUpKind> {
        self.stored
    }

    /// Add energy. No-op while a power-up is stored. Returns the kind granted when the
    /// threshold is reached.
    pub fn add<R: Rng + ?Sized>(&mut self, amount: u32, rng: &mut R) -> Option<PowerUpKind> {
        if self.stored.is_some() || amount == 0 {
            return None;
        }
        self.energy = (self.energy + amount).min(MAX_ENERGY);
        if self.energy < MAX_ENERGY {
            return None;
        }
        let kind = PowerUpKind::ALL[rng.random_range(0..PowerUpKind::ALL.len())];
        self.stored = Some(kind);
        Some(kind)
    }

    /// Spend the stored power-up, emptying the meter.
    pub fn consume(&mut self) -> Option<PowerUpKind> {
        let kind = self.stored.take()?;
        self.energy = 0;
        Some(kind)
    }

    pub fn ratio(&self) -> f64 {
        f64::from(self.energy) / f64::from(MAX_ENERGY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::parse_grid;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_energy_caps_and_holds_one_power_up() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut meter = EnergyMeter::default();
        assert_eq!(meter.add(1, &mut rng), None);
        assert_eq!(meter.add(2, &mut rng), None);
        assert_eq!(meter.energy(), 3);
        let granted = meter.add(2, &mut rng);
        assert!(granted.is_some());
        assert_eq!(meter.energy(), MAX_ENERGY);
        assert_eq!(meter.add(2, &mut rng), None);
        assert_eq!(meter.stored(), granted);
        assert_eq!(meter.energy(), MAX_ENERGY);
    }

    #[test]
    fn test_energy_never_exceeds_threshold() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut meter = EnergyMeter::default();
        let mut grants = 0;
        for step in 0..200u32 {
            if meter.add(step % 3, &mut rng).is_some() {
                grants += 1;
            }
            assert!(meter.energy() <= MAX_ENERGY);
            if step % 17 == 0 {
                meter.consume();
            }
        }
        assert!(grants > 1);
    }

    #[test]
    fn test_consume_resets_energy() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut meter = EnergyMeter::default();
        assert_eq!(meter.consume(), None);
        meter.add(MAX_ENERGY, &mut rng);
        assert!(meter.consume().is_some());
        assert_eq!(meter.energy(), 0);
        assert_eq!(meter.stored(), None);
    }

    #[test]
    fn test_target_cells() {
        let grid = parse_grid(&["FWGE", "PFFW", "GEPF", "FWGE"]);
        let center = Position::new(1, 1);
        assert_eq!(PowerUpKind::Area.target_cells(&grid, center).len(), 9);
        assert_eq!(PowerUpKind::Cross.target_cells(&grid, center).len(), 7);
        assert_eq!(PowerUpKind::ColorClear.target_cells(&grid, center).len(), 5);
        assert!(PowerUpKind::Shuffle.target_cells(&grid, center).is_empty());
        assert_eq!(PowerUpKind::ColorClear.bonus(5), 75);
    }
}
