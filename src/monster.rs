//! Monsters, teams, the species catalog and the type chart.

use crate::token::TokenKind;
use rand::Rng;
use rand::seq::IndexedRandom;

/// Same-element match progress needed to evolve.
pub const EVOLUTION_THRESHOLD: u32 = 8;
/// Team HP is shown as the sum of member HP times this factor.
pub const TEAM_HP_SCALE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Species {
    pub id: &'static str,
    pub name: &'static str,
    pub element: TokenKind,
    pub base_hp: u32,
    pub base_attack: u32,
}

const fn species(
    id: &'static str,
    name: &'static str,
    element: TokenKind,
    base_hp: u32,
    base_attack: u32,
) -> Species {
    Species { id, name, element, base_hp, base_attack }
}

/// Two species per element.
pub static CATALOG: [Species; 12] = [
    species("fennekin", "Fennekin", TokenKind::Fire, 18, 12),
    species("charmander", "Charmander", TokenKind::Fire, 20, 10),
    species("riolu", "Riolu", TokenKind::Water, 18, 11),
    species("squirtle", "Squirtle", TokenKind::Water, 22, 8),
    species("snivy", "Snivy", TokenKind::Grass, 16, 13),
    species("bulbasaur", "Bulbasaur", TokenKind::Grass, 20, 9),
    species("pikachu", "Pikachu", TokenKind::Electric, 15, 14),
    species("jolteon", "Jolteon", TokenKind::Electric, 17, 12),
    species("espeon", "Espeon", TokenKind::Psychic, 16, 14),
    species("mew", "Mew", TokenKind::Psychic, 20, 11),
    species("umbreon", "Umbreon", TokenKind::Dark, 24, 9),
    species("absol", "Absol", TokenKind::Dark, 18, 13),
];

#[cfg(test)]
pub fn find_species(id: &str) -> Option<&'static Species> {
    CATALOG.iter().find(|s| s.id == id)
}

/// Damage multiplier for a match of `attack` kind against a defender of `defend` element.
pub fn type_multiplier(attack: TokenKind, defend: TokenKind) -> f64 {
    use TokenKind::*;
    match (attack, defend) {
        (Fire, Grass) | (Water, Fire) | (Grass, Water) | (Electric, Water) => 1.5,
        (Fire, Water)
        | (Water, Grass)
        | (Water, Electric)
        | (Grass, Fire)
        | (Electric, Grass)
        | (Psychic, Dark)
        | (Dark, Psychic) => 0.5,
        _ => 1.0,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Monster {
    pub species: &'static Species,
    pub level: u32,
    pub current_hp: u32,
    pub max_hp: u32,
    pub attack: u32,
    pub evolution_progress: u32,
    pub evolution_threshold: u32,
    pub evolved: bool,
    pub defeated: bool,
}

impl Monster {
    pub fn new(species: &'static Species, level: u32) -> Self {
        let max_hp = species.base_hp + level / 2;
        Self {
            species,
            level,
            current_hp: max_hp,
            max_hp,
            attack: species.base_attack + level * 3 / 10,
            evolution_progress: 0,
            evolution_threshold: EVOLUTION_THRESHOLD,
            evolved: false,
            defeated: false,
        }
    }

    #[inline]
    pub fn element(&self) -> TokenKind {
        self.species.element
    }

    pub fn name(&self) -> &'static str {
        self.species.name
    }

    /// Apply up to `amount` damage; returns the amount actually taken.
    pub fn damage(&mut self, amount: u32) -> u32 {
        if self.defeated {
            return 0;
        }
        let taken = amount.min(self.current_hp);
        self.current_hp -= taken;
        if self.current_hp == 0 {
            self.defeated = true;
        }
        taken
    }

    /// Heal up to max HP; returns the amount actually restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if self.defeated {
            return 0;
        }
        let restored = amount.min(self.max_hp - self.current_hp);
        self.current_hp += restored;
        restored
    }

    /// Add evolution progress. Returns true when the threshold is reached and the
    /// monster evolved.
    pub fn gain_progress(&mut self, amount: u32) -> bool {
        if self.defeated || self.evolved {
            return false;
        }
        self.evolution_progress += amount;
        if self.evolution_progress < self.evolution_threshold {
            return false;
        }
        self.evolve();
        true
    }

    fn evolve(&mut self) {
        self.max_hp = self.max_hp * 3 / 2;
        self.current_hp = self.max_hp;
        self.attack = self.attack * 13 / 10;
        self.evolution_progress = 0;
        self.evolved = true;
    }

    #[cfg(test)]
    pub fn hp_ratio(&self) -> f64 {
        if self.max_hp == 0 {
            return 0.0;
        }
        f64::from(self.current_hp) / f64::from(self.max_hp)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub name: String,
    monsters: Vec<Monster>,
    total_hp: u32,
    current_hp: u32,
}

impl Team {
    pub fn new(name: impl Into<String>, monsters: Vec<Monster>) -> Self {
        let mut team = Self {
            name: name.into(),
            monsters,
            total_hp: 0,
            current_hp: 0,
        };
        team.recompute();
        team
    }

    /// `count` distinct random species at `level`.
    pub fn random<R: Rng + ?Sized>(name: &str, count: usize, level: u32, rng: &mut R) -> Self {
        let monsters = CATALOG
            .choose_multiple(rng, count)
            .map(|s| Monster::new(s, level))
            .collect();
        Self::new(name, monsters)
    }

    fn recompute(&mut self) {
        self.total_hp = self.monsters.iter().map(|m| m.max_hp).sum::<u32>() * TEAM_HP_SCALE;
        self.current_hp = self.monsters.iter().map(|m| m.current_hp).sum::<u32>() * TEAM_HP_SCALE;
    }

    pub fn monsters(&self) -> &[Monster] {
        &self.monsters
    }

    pub fn total_hp(&self) -> u32 {
        self.total_hp
    }

    pub fn current_hp(&self) -> u32 {
        self.current_hp
    }

    pub fn hp_ratio(&self) -> f64 {
        if self.total_hp == 0 {
            return 0.0;
        }
        f64::from(self.current_hp) / f64::from(self.total_hp)
    }

    /// Index of the first monster still standing.
    pub fn active_index(&self) -> Option<usize> {
        self.monsters.iter().position(|m| !m.defeated)
    }

    pub fn active(&self) -> Option<&Monster> {
        self.active_index().map(|i| &self.monsters[i])
    }

    pub fn is_defeated(&self) -> bool {
        self.monsters.iter().all(|m| m.defeated)
    }

    /// Run `f` on the monster at `index`, then refresh the team totals.
    pub fn with_monster<T>(&mut self, index: usize, f: impl FnOnce(&mut Monster) -> T) -> T {
        let out = f(&mut self.monsters[index]);
        self.recompute();
        out
    }

    /// Scale every monster's HP by `mult` (stage difficulty), then refresh totals.
    pub fn scale_hp(&mut self, mult: f64) {
        for m in &mut self.monsters {
            m.max_hp = ((f64::from(m.max_hp) * mult).round() as u32).max(1);
            m.current_hp = m.max_hp;
        }
        self.recompute();
    }
}
