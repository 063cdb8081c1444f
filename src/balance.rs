//! Per-stage difficulty: enemy roster, AI skill, turn time and rewards.

use crate::monster::Team;
use rand::Rng;
use std::time::Duration;

/// Turn time at a 1.0 stage multiplier.
pub const BASE_TURN_SECONDS: f64 = 30.0;
/// Stage at which evolution becomes available.
pub const EVOLUTION_STAGE: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Difficulty {
    pub stage: u32,
    pub enemy_count: usize,
    pub enemy_hp_mult: f64,
    /// 0.0..=1.0; probability the opponent plays its best move.
    pub ai_skill: f64,
    pub time_mult: f64,
    pub reward_mult: f64,
}

const fn row(
    stage: u32,
    enemy_count: usize,
    enemy_hp_mult: f64,
    ai_skill: f64,
    time_mult: f64,
    reward_mult: f64,
) -> Difficulty {
    Difficulty { stage, enemy_count, enemy_hp_mult, ai_skill, time_mult, reward_mult }
}

static PROGRESSION: [Difficulty; 10] = [
    row(1, 1, 0.8, 0.3, 1.5, 1.0),
    row(2, 2, 0.9, 0.4, 1.3, 1.1),
    row(3, 2, 1.0, 0.5, 1.2, 1.2),
    row(4, 2, 1.1, 0.6, 1.1, 1.3),
    row(5, 3, 1.2, 0.7, 1.0, 1.4),
    row(6, 3, 1.3, 0.8, 0.9, 1.5),
    row(7, 3, 1.5, 0.9, 0.8, 2.0),
    row(8, 3, 1.7, 1.0, 0.8, 2.5),
    row(9, 3, 2.0, 1.0, 0.7, 3.0),
    row(10, 3, 2.5, 1.0, 0.6, 4.0),
];

/// Table lookup; stages past the table scale exponentially from the last row.
/// Stage 0 is treated as stage 1.
pub fn difficulty(stage: u32) -> Difficulty {
    let stage = stage.max(1);
    if let Some(d) = PROGRESSION.iter().find(|d| d.stage == stage) {
        return *d;
    }
    let last = PROGRESSION[PROGRESSION.len() - 1];
    let extra = (stage - last.stage) as i32;
    Difficulty {
        stage,
        enemy_count: 3,
        enemy_hp_mult: last.enemy_hp_mult * 1.2f64.powi(extra),
        ai_skill: 1.0,
        time_mult: (last.time_mult * 0.95f64.powi(extra)).max(0.4),
        reward_mult: last.reward_mult * 1.3f64.powi(extra),
    }
}

pub fn turn_time(stage: u32) -> Duration {
    Duration::from_secs((BASE_TURN_SECONDS * difficulty(stage).time_mult).round() as u64)
}

pub fn can_evolve(stage: u32) -> bool {
    stage >= EVOLUTION_STAGE
}

pub fn max_team_size(stage: u32) -> usize {
    match stage {
        5.. => 3,
        2..=4 => 2,
        _ => 1,
    }
}

/// Victory score for a stage, scaled by its reward multiplier.
pub fn stage_score(stage: u32, time_bonus: u32, combos: u32) -> u32 {
    let base = f64::from(stage * 100 + time_bonus + combos * 50);
    (base * difficulty(stage).reward_mult).round() as u32
}

pub fn unlock_message(stage: u32) -> Option<&'static str> {
    Some(match stage {
        1 => "First rival defeated!",
        2 => "Fire beats Grass. Use the type chart!",
        3 => "Evolution unlocked!",
        4 => "Water joins the fight!",
        5 => "Teams of three unlocked!",
        6 => "Psychic tokens awaken!",
        7 => "Dark tokens emerge!",
        8 => "Electric storms ahead!",
        9 => "Master rank reached!",
        10 => "Legend! You have mastered Monster Match!",
        _ => return None,
    })
}

pub fn player_team<R: Rng + ?Sized>(stage: u32, rng: &mut R) -> Team {
    Team::random("Player", max_team_size(stage), 1, rng)
}

/// Enemy roster for `stage` with its HP multiplier applied.
pub fn enemy_team<R: Rng + ?Sized>(stage: u32, rng: &mut R) -> Team {
    let d = difficulty(stage);
    let mut team = Team::random(&format!("Boss Lv.{stage}"), d.enemy_count, 1, rng);
    team.scale_hp(d.enemy_hp_mult);
    team
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_table_lookup() {
        let d = difficulty(5);
        assert_eq!(d.enemy_count, 3);
        assert_eq!(d.ai_skill, 0.7);
        assert_eq!(difficulty(0), difficulty(1));
    }

    #[test]
    fn test_stages_past_table_scale() {
        let d = difficulty(12);
        assert!((d.enemy_hp_mult - 2.5 * 1.44).abs() < 1e-9);
        assert!((d.time_mult - 0.6 * 0.9025).abs() < 1e-9);
        assert_eq!(difficulty(40).time_mult, 0.4);
        assert_eq!(d.ai_skill, 1.0);
    }

    #[test]
    fn test_turn_time() {
        assert_eq!(turn_time(1), Duration::from_secs(45));
        assert_eq!(turn_time(5), Duration::from_secs(30));
        assert_eq!(turn_time(10), Duration::from_secs(18));
    }

    #[test]
    fn test_team_sizes_and_evolution() {
        assert_eq!(max_team_size(1), 1);
        assert_eq!(max_team_size(4), 2);
        assert_eq!(max_team_size(9), 3);
        assert!(!can_evolve(2));
        assert!(can_evolve(3));
    }

    #[test]
    fn test_stage_score() {
        assert_eq!(stage_score(1, 0, 0), 100);
        assert_eq!(stage_score(2, 10, 2), 341);
    }

    #[test]
    fn test_enemy_team_hp_scaled() {
        let mut rng = StdRng::seed_from_u64(6);
        let team = enemy_team(10, &mut rng);
        assert_eq!(team.monsters().len(), 3);
        for m in team.monsters() {
            let unscaled = m.species.base_hp;
            assert_eq!(m.max_hp, (f64::from(unscaled) * 2.5).round() as u32);
        }
    }
}
