//! Turn scheduling: who may act on the shared board, and for how long.
//!
//! The scheduler never reads a clock. The session feeds it elapsed time through
//! [`TurnScheduler::tick`] and pauses it while a cascade is settling.

use crate::token::Side;
use log::debug;
use std::time::Duration;

/// Pausable countdown driven by `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: Duration,
    running: bool,
}

impl Countdown {
    pub fn new(duration: Duration) -> Self {
        Self {
            remaining: duration,
            running: true,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        if !self.remaining.is_zero() {
            self.running = true;
        }
    }

    /// Restart at `duration`, keeping the paused state.
    pub fn reset(&mut self, duration: Duration) {
        self.remaining = duration;
    }

    /// Returns true on the tick that reaches zero.
    pub fn tick(&mut self, dt: Duration) -> bool {
        if !self.running || self.remaining.is_zero() {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(dt);
        if self.remaining.is_zero() {
            self.running = false;
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPolicy {
    /// Single player, no turns, no clock.
    Continuous,
    /// Unlimited moves until the turn clock runs out.
    FixedDuration { turn: Duration },
    /// A move allowance per turn plus a per-move clock; expiry forfeits a move.
    MoveBudget {
        moves: u32,
        max_moves: u32,
        move_timer: Duration,
    },
    /// A move allowance and a turn clock.
    BattleTurn { moves: u32, turn: Duration },
}

impl TurnPolicy {
    pub const DEFAULT_TURN: Duration = Duration::from_secs(10);
    pub const DEFAULT_MOVES: u32 = 2;
    pub const DEFAULT_MOVE_TIMER: Duration = Duration::from_secs(8);

    fn allowance(self) -> Option<u32> {
        match self {
            Self::MoveBudget { moves, .. } | Self::BattleTurn { moves, .. } => Some(moves),
            Self::Continuous | Self::FixedDuration { .. } => None,
        }
    }

    fn clock(self) -> Option<Duration> {
        match self {
            Self::Continuous => None,
            Self::FixedDuration { turn } | Self::BattleTurn { turn, .. } => Some(turn),
            Self::MoveBudget { move_timer, .. } => Some(move_timer),
        }
    }
}

/// State changes reported back to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnChange {
    MovesLeft(u32),
    MoveForfeited { side: Side, moves_left: u32 },
    TurnChanged { side: Side, turn_number: u32 },
    GameOver { winner: Option<Side> },
}

#[derive(Debug, Clone)]
pub struct TurnScheduler {
    policy: TurnPolicy,
    side: Side,
    turn_number: u32,
    moves_left: Option<u32>,
    timer: Option<Countdown>,
    over: bool,
    winner: Option<Side>,
    stopped: bool,
}

impl TurnScheduler {
    /// The human side always starts.
    pub fn new(policy: TurnPolicy) -> Self {
        Self {
            policy,
            side: Side::Player,
            turn_number: 1,
            moves_left: policy.allowance(),
            timer: policy.clock().map(Countdown::new),
            over: false,
            winner: None,
            stopped: false,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    pub fn moves_left(&self) -> Option<u32> {
        self.moves_left
    }

    pub fn time_left(&self) -> Option<Duration> {
        self.timer.map(|t| t.remaining())
    }

    /// False while the clock is paused for a cascade, or when there is none.
    pub fn clock_running(&self) -> bool {
        self.timer.is_some_and(|t| t.is_running())
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn is_versus(&self) -> bool {
        self.policy != TurnPolicy::Continuous
    }

    /// A swap-to-settle transaction finished. `max_combo` is the highest chain level
    /// it reached (0 for a kept swap without a match).
    pub fn on_move_completed(&mut self, had_match: bool, max_combo: u32) -> Vec<TurnChange> {
        if self.over {
            return Vec::new();
        }
        let mut changes = Vec::new();
        match self.policy {
            TurnPolicy::Continuous | TurnPolicy::FixedDuration { .. } => {}
            TurnPolicy::MoveBudget { max_moves, move_timer, .. } => {
                let left = self.moves_left.unwrap_or(0).saturating_sub(1);
                let bonus = max_combo.saturating_sub(1);
                let left = if left == 0 { left } else { (left + bonus).min(max_moves) };
                self.moves_left = Some(left);
                changes.push(TurnChange::MovesLeft(left));
                if left == 0 {
                    changes.extend(self.end_turn());
                } else if let Some(timer) = self.timer.as_mut() {
                    timer.reset(move_timer);
                }
            }
            TurnPolicy::BattleTurn { .. } => {
                if !had_match {
                    return changes;
                }
                let left = self.moves_left.unwrap_or(0).saturating_sub(1);
                self.moves_left = Some(left);
                changes.push(TurnChange::MovesLeft(left));
                if left == 0 {
                    changes.extend(self.end_turn());
                }
            }
        }
        changes
    }

    pub fn tick(&mut self, dt: Duration) -> Vec<TurnChange> {
        if self.over || self.stopped {
            return Vec::new();
        }
        let Some(timer) = self.timer.as_mut() else {
            return Vec::new();
        };
        if !timer.tick(dt) {
            return Vec::new();
        }
        match self.policy {
            TurnPolicy::MoveBudget { move_timer, .. } => {
                let left = self.moves_left.unwrap_or(0).saturating_sub(1);
                self.moves_left = Some(left);
                debug!("{:?} forfeits a move, {} left", self.side, left);
                let mut changes = vec![TurnChange::MoveForfeited { side: self.side, moves_left: left }];
                if left == 0 {
                    changes.extend(self.end_turn());
                } else if let Some(timer) = self.timer.as_mut() {
                    timer.reset(move_timer);
                    timer.resume();
                }
                changes
            }
            _ => self.end_turn(),
        }
    }

    pub fn pause_timer(&mut self) {
        if let Some(timer) = self.timer.as_mut() {
            timer.pause();
        }
    }

    pub fn resume_timer(&mut self) {
        if self.over || self.stopped {
            return;
        }
        if let Some(timer) = self.timer.as_mut() {
            timer.resume();
        }
    }

    /// Hand the board to the other side with a fresh allowance and clock.
    pub fn end_turn(&mut self) -> Vec<TurnChange> {
        if self.over || !self.is_versus() {
            return Vec::new();
        }
        self.side = self.side.other();
        self.turn_number += 1;
        self.moves_left = self.policy.allowance();
        if let (Some(timer), Some(clock)) = (self.timer.as_mut(), self.policy.clock()) {
            timer.reset(clock);
            timer.resume();
        }
        debug!("turn {} -> {:?}", self.turn_number, self.side);
        let mut changes = vec![TurnChange::TurnChanged {
            side: self.side,
            turn_number: self.turn_number,
        }];
        if let Some(left) = self.moves_left {
            changes.push(TurnChange::MovesLeft(left));
        }
        changes
    }

    pub fn force_game_over(&mut self, winner: Option<Side>) -> Vec<TurnChange> {
        if self.over {
            return Vec::new();
        }
        self.over = true;
        self.winner = winner;
        self.pause_timer();
        vec![TurnChange::GameOver { winner }]
    }

    /// Stop every timer for good (leaving the game).
    pub fn stop(&mut self) {
        self.pause_timer();
        self.stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget() -> TurnScheduler {
        TurnScheduler::new(TurnPolicy::MoveBudget {
            moves: 2,
            max_moves: 3,
            move_timer: Duration::from_secs(8),
        })
    }

    #[test]
    fn test_countdown_pause_and_expiry() {
        let mut c = Countdown::new(Duration::from_secs(2));
        assert!(!c.tick(Duration::from_secs(1)));
        c.pause();
        assert!(!c.tick(Duration::from_secs(5)));
        assert_eq!(c.remaining(), Duration::from_secs(1));
        c.resume();
        assert!(c.tick(Duration::from_millis(1500)));
        assert!(!c.tick(Duration::from_secs(1)));
        assert!(c.remaining().is_zero());
    }

    #[test]
    fn test_matchless_moves_exhaust_budget() {
        let mut s = budget();
        assert_eq!(s.on_move_completed(false, 0), vec![TurnChange::MovesLeft(1)]);
        let changes = s.on_move_completed(false, 0);
        assert!(changes.contains(&TurnChange::TurnChanged { side: Side::Enemy, turn_number: 2 }));
        assert_eq!(s.side(), Side::Enemy);
        assert_eq!(s.moves_left(), Some(2));
        assert_eq!(s.time_left(), Some(Duration::from_secs(8)));
    }

    #[test]
    fn test_chained_move_grants_moves_up_to_cap() {
        let mut s = budget();
        assert_eq!(s.on_move_completed(true, 2), vec![TurnChange::MovesLeft(2)]);
        assert_eq!(s.on_move_completed(true, 4), vec![TurnChange::MovesLeft(3)]);
        assert_eq!(s.on_move_completed(true, 1), vec![TurnChange::MovesLeft(2)]);
    }

    #[test]
    fn test_move_timer_forfeits_a_move() {
        let mut s = budget();
        let changes = s.tick(Duration::from_secs(8));
        assert_eq!(changes, vec![TurnChange::MoveForfeited { side: Side::Player, moves_left: 1 }]);
        assert_eq!(s.time_left(), Some(Duration::from_secs(8)));
        let changes = s.tick(Duration::from_secs(9));
        assert!(changes.contains(&TurnChange::TurnChanged { side: Side::Enemy, turn_number: 2 }));
    }

    #[test]
    fn test_fixed_duration_switches_on_expiry() {
        let mut s = TurnScheduler::new(TurnPolicy::FixedDuration { turn: Duration::from_secs(10) });
        assert!(s.on_move_completed(true, 1).is_empty());
        assert!(s.tick(Duration::from_secs(9)).is_empty());
        s.pause_timer();
        assert!(s.tick(Duration::from_secs(30)).is_empty());
        s.resume_timer();
        let changes = s.tick(Duration::from_secs(1));
        assert_eq!(changes, vec![TurnChange::TurnChanged { side: Side::Enemy, turn_number: 2 }]);
        assert_eq!(s.time_left(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_battle_turn_counts_only_matches() {
        let mut s = TurnScheduler::new(TurnPolicy::BattleTurn { moves: 2, turn: Duration::from_secs(30) });
        assert!(s.on_move_completed(false, 0).is_empty());
        assert_eq!(s.on_move_completed(true, 1), vec![TurnChange::MovesLeft(1)]);
        let changes = s.on_move_completed(true, 3);
        assert_eq!(changes[0], TurnChange::MovesLeft(0));
        assert_eq!(s.side(), Side::Enemy);
        assert_eq!(s.moves_left(), Some(2));
    }

    #[test]
    fn test_continuous_never_switches() {
        let mut s = TurnScheduler::new(TurnPolicy::Continuous);
        assert!(s.end_turn().is_empty());
        assert!(s.tick(Duration::from_secs(60)).is_empty());
        assert_eq!(s.side(), Side::Player);
        assert_eq!(s.time_left(), None);
    }

    #[test]
    fn test_game_over_and_stop() {
        let mut s = budget();
        assert_eq!(s.force_game_over(Some(Side::Enemy)), vec![TurnChange::GameOver { winner: Some(Side::Enemy) }]);
        assert!(s.force_game_over(Some(Side::Player)).is_empty());
        assert!(s.on_move_completed(true, 1).is_empty());
        assert_eq!(s.winner(), Some(Side::Enemy));

        let mut s = budget();
        s.stop();
        s.resume_timer();
        assert!(s.tick(Duration::from_secs(60)).is_empty());
    }
}
