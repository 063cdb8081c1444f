//! Converts match batches into damage, healing and evolution between two teams.

use crate::balance;
use crate::matcher::Match;
use crate::monster::{Team, type_multiplier};
use crate::token::{Side, TokenKind};
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BattleConfig {
    pub damage_per_unit: u32,
    pub heal_per_unit: u32,
    /// Extra damage fraction per combo level above 1.
    pub combo_multiplier: f64,
    /// Reported with each evolution; does not touch HP.
    pub evolution_bonus: u32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            damage_per_unit: 2,
            heal_per_unit: 5,
            combo_multiplier: 0.25,
            evolution_bonus: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effectiveness {
    Super,
    Normal,
    Weak,
}

impl Effectiveness {
    fn from_multiplier(mult: f64) -> Self {
        if mult > 1.0 {
            Self::Super
        } else if mult < 1.0 {
            Self::Weak
        } else {
            Self::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BattleEvent {
    Damage {
        attacker: Side,
        monster: &'static str,
        kind: TokenKind,
        amount: u32,
        effectiveness: Effectiveness,
    },
    Heal {
        side: Side,
        monster: &'static str,
        amount: u32,
    },
    Defeat {
        side: Side,
        monster: &'static str,
    },
    Evolve {
        side: Side,
        monster: &'static str,
        bonus: u32,
    },
}

impl BattleEvent {
    pub fn describe(&self) -> String {
        match self {
            Self::Damage { monster, amount, effectiveness, .. } => match effectiveness {
                Effectiveness::Super => format!("Super effective! {monster} took {amount}"),
                Effectiveness::Weak => format!("Not very effective... {monster} took {amount}"),
                Effectiveness::Normal => format!("{monster} took {amount} damage"),
            },
            Self::Heal { monster, amount, .. } => format!("{monster} healed {amount} HP"),
            Self::Defeat { monster, .. } => format!("{monster} was defeated!"),
            Self::Evolve { monster, bonus, .. } => format!("{monster} evolved! +{bonus} bonus"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BattleReport {
    pub total_damage: u32,
    pub total_heal: u32,
    pub events: Vec<BattleEvent>,
    pub evolutions: Vec<&'static str>,
    pub defeats: Vec<&'static str>,
    /// Set when this batch ended the battle.
    pub winner: Option<Side>,
}

/// Damage before the type multiplier. Each step floors.
pub fn base_damage(config: &BattleConfig, size: usize, combo: u32) -> u32 {
    let mut damage = (size as u32 * config.damage_per_unit) as f64;
    damage = (damage * (1.0 + f64::from(combo.saturating_sub(1)) * config.combo_multiplier)).floor();
    if size >= 4 {
        damage = (damage * 1.5).floor();
    }
    if size >= 5 {
        damage = (damage * 1.3).floor();
    }
    damage as u32
}

#[derive(Debug, Clone)]
pub struct BattleResolver {
    config: BattleConfig,
    stage: u32,
    teams: [Team; 2],
    winner: Option<Side>,
}

impl BattleResolver {
    pub fn new(config: BattleConfig, stage: u32, player: Team, enemy: Team) -> Self {
        Self {
            config,
            stage,
            teams: [player, enemy],
            winner: None,
        }
    }

    pub fn team(&self, side: Side) -> &Team {
        &self.teams[side.index()]
    }

    pub fn stage(&self) -> u32 {
        self.stage
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    #[cfg(test)]
    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    /// Apply one batch of matches made by `acting` at chain level `combo`.
    pub fn process_matches(&mut self, matches: &[Match], combo: u32, acting: Side) -> BattleReport {
        let mut report = BattleReport::default();
        if self.is_over() {
            return report;
        }
        let defending = acting.other();

        for m in matches {
            if m.kind.is_heal() {
                self.heal(acting, m.size() as u32 * self.config.heal_per_unit, &mut report);
                continue;
            }

            let team = &mut self.teams[defending.index()];
            let Some(target) = team.active_index() else {
                continue;
            };
            let element = team.monsters()[target].element();
            let name = team.monsters()[target].name();
            let mult = type_multiplier(m.kind, element);
            let damage = (f64::from(base_damage(&self.config, m.size(), combo)) * mult).floor() as u32;
            let (taken, defeated) = team.with_monster(target, |monster| {
                let taken = monster.damage(damage);
                (taken, monster.defeated)
            });
            report.total_damage += taken;
            report.events.push(BattleEvent::Damage {
                attacker: acting,
                monster: name,
                kind: m.kind,
                amount: taken,
                effectiveness: Effectiveness::from_multiplier(mult),
            });
            if defeated {
                debug!("{} defeated ({:?} side)", name, defending);
                report.defeats.push(name);
                report.events.push(BattleEvent::Defeat { side: defending, monster: name });
            }

            if balance::can_evolve(self.stage) {
                self.progress_evolution(acting, m, &mut report);
            }
        }

        self.check_game_over(acting, &mut report);
        report
    }

    fn heal(&mut self, side: Side, amount: u32, report: &mut BattleReport) {
        let team = &mut self.teams[side.index()];
        let Some(index) = team.active_index() else {
            return;
        };
        let name = team.monsters()[index].name();
        let restored = team.with_monster(index, |monster| monster.heal(amount));
        report.total_heal += restored;
        report.events.push(BattleEvent::Heal { side, monster: name, amount: restored });
    }

    fn progress_evolution(&mut self, side: Side, m: &Match, report: &mut BattleReport) {
        let amount = if m.size() >= 4 { 2 } else { 1 };
        let team = &mut self.teams[side.index()];
        for index in 0..team.monsters().len() {
            let monster = &team.monsters()[index];
            if monster.defeated || monster.evolved || monster.element() != m.kind {
                continue;
            }
            let name = monster.name();
            if team.with_monster(index, |monster| monster.gain_progress(amount)) {
                info!("{} evolved", name);
                report.evolutions.push(name);
                report.events.push(BattleEvent::Evolve {
                    side,
                    monster: name,
                    bonus: self.config.evolution_bonus,
                });
            }
        }
    }

    /// A side with no monster standing loses. If both fall in the same batch the
    /// acting side wins.
    fn check_game_over(&mut self, acting: Side, report: &mut BattleReport) {
        let player_down = self.team(Side::Player).is_defeated();
        let enemy_down = self.team(Side::Enemy).is_defeated();
        let winner = match (player_down, enemy_down) {
            (false, false) => return,
            (true, true) => acting,
            (true, false) => Side::Enemy,
            (false, true) => Side::Player,
        };
        info!("battle over, winner {:?}", winner);
        self.winner = Some(winner);
        report.winner = Some(winner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monster::{Monster, find_species};
    use crate::token::Position;

    fn monster(id: &str) -> Monster {
        Monster::new(find_species(id).unwrap(), 1)
    }

    fn run(kind: TokenKind, size: usize) -> Match {
        Match {
            kind,
            positions: (0..size).map(|c| Position::new(0, c)).collect(),
        }
    }

    fn resolver(stage: u32, player: &[&str], enemy: &[&str]) -> BattleResolver {
        let team = |ids: &[&str]| ids.iter().map(|id| monster(id)).collect::<Vec<_>>();
        BattleResolver::new(
            BattleConfig::default(),
            stage,
            Team::new("Player", team(player)),
            Team::new("Enemy", team(enemy)),
        )
    }

    #[test]
    fn test_size_five_multiplier_floors_each_step() {
        let config = BattleConfig { damage_per_unit: 20, ..BattleConfig::default() };
        assert_eq!(base_damage(&config, 5, 1), 195);
        assert_eq!(base_damage(&BattleConfig::default(), 5, 1), 19);
        assert_eq!(base_damage(&BattleConfig::default(), 4, 1), 12);
        assert_eq!(base_damage(&BattleConfig::default(), 3, 3), 9);
    }

    #[test]
    fn test_damage_applies_type_multiplier() {
        // Fire against Grass (bulbasaur): 6 base, ×1.5 = 9.
        let mut r = resolver(1, &["pikachu"], &["bulbasaur"]);
        let report = r.process_matches(&[run(TokenKind::Fire, 3)], 1, Side::Player);
        assert_eq!(report.total_damage, 9);
        let enemy = r.team(Side::Enemy);
        assert_eq!(enemy.monsters()[0].current_hp, 11);
        assert_eq!(enemy.current_hp(), 110);
        assert!(matches!(
            report.events[0],
            BattleEvent::Damage { effectiveness: Effectiveness::Super, amount: 9, .. }
        ));
    }

    #[test]
    fn test_berries_heal_acting_side() {
        let mut r = resolver(1, &["pikachu"], &["mew"]);
        r.teams[0].with_monster(0, |m| m.damage(12));
        let report = r.process_matches(&[run(TokenKind::Berry, 3)], 1, Side::Player);
        assert_eq!(report.total_heal, 12);
        assert_eq!(report.total_damage, 0);
        assert_eq!(r.team(Side::Player).monsters()[0].current_hp, 15);
    }

    #[test]
    fn test_defeat_retargets_next_monster() {
        let mut r = resolver(1, &["mew"], &["pikachu", "mew"]);
        r.teams[1].with_monster(0, |m| m.damage(14));
        let matches = [run(TokenKind::Fire, 3), run(TokenKind::Fire, 3)];
        let report = r.process_matches(&matches, 1, Side::Player);
        assert_eq!(report.defeats, vec!["Pikachu"]);
        assert_eq!(report.total_damage, 1 + 6);
        assert_eq!(r.team(Side::Enemy).monsters()[1].current_hp, 14);
        assert_eq!(report.winner, None);
    }

    #[test]
    fn test_last_defeat_ends_battle() {
        let mut r = resolver(1, &["mew"], &["pikachu"]);
        r.teams[1].with_monster(0, |m| m.damage(14));
        let report = r.process_matches(&[run(TokenKind::Fire, 3)], 1, Side::Enemy);
        assert_eq!(report.winner, None);
        let report = r.process_matches(&[run(TokenKind::Fire, 3)], 1, Side::Player);
        assert_eq!(report.winner, Some(Side::Player));
        assert!(r.is_over());
        assert_eq!(r.process_matches(&[run(TokenKind::Fire, 3)], 1, Side::Enemy), BattleReport::default());
    }

    #[test]
    fn test_evolution_only_after_unlock() {
        let mut early = resolver(2, &["pikachu"], &["umbreon", "umbreon", "umbreon"]);
        for _ in 0..4 {
            early.process_matches(&[run(TokenKind::Electric, 4)], 1, Side::Player);
        }
        assert!(!early.team(Side::Player).monsters()[0].evolved);

        let mut r = resolver(3, &["pikachu"], &["umbreon", "umbreon", "umbreon"]);
        let mut evolutions = Vec::new();
        for _ in 0..4 {
            let report = r.process_matches(&[run(TokenKind::Electric, 4)], 1, Side::Player);
            evolutions.extend(report.evolutions);
        }
        assert_eq!(evolutions, vec!["Pikachu"]);
        let pikachu = &r.team(Side::Player).monsters()[0];
        assert!(pikachu.evolved);
        assert_eq!(pikachu.max_hp, 22);
    }

    #[test]
    fn test_psychic_and_dark_resist_each_other() {
        // 6 base ×0.5 = 3 both ways.
        let mut r = resolver(1, &["espeon"], &["umbreon"]);
        assert_eq!(r.process_matches(&[run(TokenKind::Psychic, 3)], 1, Side::Player).total_damage, 3);
        assert_eq!(r.process_matches(&[run(TokenKind::Dark, 3)], 1, Side::Enemy).total_damage, 3);
    }
}
