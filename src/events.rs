//! Outbound event stream consumed by the front end.

use crate::battle::BattleEvent;
use crate::cascade::CascadePhase;
use crate::matcher::Match;
use crate::powerup::PowerUpKind;
use crate::token::{Position, Side};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    ScoreChanged { side: Side, score: u32 },
    PointsScored { side: Side, points: u32 },
    Swapped { from: Position, to: Position },
    Matched { matches: Vec<Match> },
    Combo { level: u32 },
    Dropped,
    /// A cascade phase finished; the board view changed.
    PhaseComplete(CascadePhase),
    InvalidMove { from: Position, to: Position },
    /// The board is stuck; the next tap blasts a 3x3 area.
    NoMoves,
    PowerUpReady { side: Side, kind: PowerUpKind },
    PowerUpUsed { side: Side, kind: PowerUpKind },
    /// Number of size ≥4 matches in one batch.
    BigMatch { count: u32 },
    MoveCompleted { side: Side, had_match: bool },
    TurnChanged { side: Side, turn_number: u32 },
    MoveForfeited { side: Side, moves_left: u32 },
    Battle(BattleEvent),
    GameOver { winner: Option<Side> },
}

impl GameEvent {
    /// One-line text for the event log; None for events not worth logging.
    pub fn describe(&self) -> Option<String> {
        Some(match self {
            Self::PointsScored { side, points } => format!("{} +{points}", side.label()),
            Self::Combo { level } => format!("Combo x{level}!"),
            Self::InvalidMove { .. } => "No match".to_string(),
            Self::NoMoves => "No moves left! Tap to blast".to_string(),
            Self::PowerUpReady { side, kind } => format!("{}: {} ready", side.label(), kind.name()),
            Self::PowerUpUsed { side, kind } => format!("{} used {}", side.label(), kind.name()),
            Self::BigMatch { count } => format!("Big match x{count}"),
            Self::TurnChanged { side, .. } => format!("{}'s turn", side.label()),
            Self::MoveForfeited { side, .. } => format!("{} ran out of time", side.label()),
            Self::Battle(event) => event.describe(),
            Self::GameOver { winner: Some(side) } => format!("{} won!", side.label()),
            Self::GameOver { winner: None } => "Game over".to_string(),
            _ => return None,
        })
    }
}

/// FIFO of events waiting to be drained.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<GameEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_drains_in_order() {
        let mut q = EventQueue::default();
        q.push(GameEvent::Dropped);
        q.push(GameEvent::Combo { level: 2 });
        assert_eq!(q.len(), 2);
        assert_eq!(q.drain(), vec![GameEvent::Dropped, GameEvent::Combo { level: 2 }]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_describe_skips_noise() {
        assert_eq!(GameEvent::Dropped.describe(), None);
        assert_eq!(GameEvent::Combo { level: 3 }.describe().as_deref(), Some("Combo x3!"));
    }
}
