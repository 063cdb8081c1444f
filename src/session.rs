//! One game on one board: wires the cascade engine, energy, battle resolver, turn
//! scheduler and opponent together, and turns player actions and elapsed time into
//! board transactions and events.

use crate::GameMode;
use crate::balance;
use crate::battle::{BattleConfig, BattleResolver};
use crate::cascade::{
    Board, CascadePhase, CascadeStep, CascadeTiming, Origin, Resolution, Settlement, SwapOutcome,
    SwapPolicy,
};
use crate::events::{EventQueue, GameEvent};
use crate::grid::Grid;
use crate::matcher::CellMask;
use crate::moves::{Move, area_around, find_hint, has_any_move};
use crate::opponent::{GreedyOpponent, OpponentPolicy};
use crate::powerup::{EnergyMeter, PowerUpKind, STUCK_BONUS};
use crate::token::{Direction, Position, Side, TokenKind};
use crate::turn::{TurnChange, TurnPolicy, TurnScheduler};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Fresh boards are redrawn this many times looking for one with a legal move.
const BOARD_ATTEMPTS: usize = 100;
/// Best-move probability for the versus modes without a stage table.
const VERSUS_SKILL: f64 = 0.7;
const THINK_BASE: Duration = Duration::from_millis(500);
const THINK_JITTER_MS: u64 = 300;

impl GameMode {
    pub const ALL: [Self; 4] = [Self::Solo, Self::Timed, Self::Moves, Self::Battle];

    pub fn name(self) -> &'static str {
        match self {
            Self::Solo => "Solo",
            Self::Timed => "Timed vs AI",
            Self::Moves => "Moves vs AI",
            Self::Battle => "Monster Battle",
        }
    }

    pub fn swap_policy(self) -> SwapPolicy {
        match self {
            Self::Moves => SwapPolicy::Permissive,
            Self::Solo | Self::Timed | Self::Battle => SwapPolicy::Strict,
        }
    }

    pub fn kinds(self) -> &'static [TokenKind] {
        match self {
            Self::Battle => &TokenKind::WITH_BERRY,
            Self::Solo | Self::Timed | Self::Moves => &TokenKind::ELEMENTS,
        }
    }

    pub fn is_versus(self) -> bool {
        self != Self::Solo
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub mode: GameMode,
    pub rows: usize,
    pub cols: usize,
    pub stage: u32,
    /// Overrides the turn clock (or the per-move clock in `Moves`).
    pub turn_time: Option<Duration>,
    pub moves_per_turn: u32,
    /// Score that ends `Timed` and `Moves` games.
    pub win_score: u32,
    pub timing: CascadeTiming,
    /// Opponent pauses before each move.
    pub think_delay: bool,
    pub battle: BattleConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::Solo,
            rows: 8,
            cols: 8,
            stage: 1,
            turn_time: None,
            moves_per_turn: TurnPolicy::DEFAULT_MOVES,
            win_score: 2000,
            timing: CascadeTiming::default(),
            think_delay: true,
            battle: BattleConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn turn_policy(&self) -> TurnPolicy {
        match self.mode {
            GameMode::Solo => TurnPolicy::Continuous,
            GameMode::Timed => TurnPolicy::FixedDuration {
                turn: self.turn_time.unwrap_or(TurnPolicy::DEFAULT_TURN),
            },
            GameMode::Moves => TurnPolicy::MoveBudget {
                moves: self.moves_per_turn,
                max_moves: self.moves_per_turn + 1,
                move_timer: self.turn_time.unwrap_or(TurnPolicy::DEFAULT_MOVE_TIMER),
            },
            GameMode::Battle => TurnPolicy::BattleTurn {
                moves: self.moves_per_turn,
                turn: self.turn_time.unwrap_or_else(|| balance::turn_time(self.stage)),
            },
        }
    }

    fn opponent_skill(&self) -> f64 {
        match self.mode {
            GameMode::Battle => balance::difficulty(self.stage).ai_skill,
            _ => VERSUS_SKILL,
        }
    }
}

pub struct Session {
    config: SessionConfig,
    rng: StdRng,
    board: Board,
    scheduler: TurnScheduler,
    energy: [EnergyMeter; 2],
    scores: [u32; 2],
    battle: Option<BattleResolver>,
    opponent: Box<dyn OpponentPolicy>,
    events: EventQueue,
    selection: Option<Position>,
    targeting: Option<PowerUpKind>,
    stuck: bool,
    hint: Option<Move>,
    /// Side that owns the transaction in flight.
    actor: Side,
    /// Time left before the next cascade phase runs.
    phase_wait: Duration,
    /// Time left before the opponent acts; None until its turn is noticed.
    think_wait: Option<Duration>,
    /// Chain reactions (combo ≥ 2) the player triggered.
    combos: u32,
    ended: bool,
}

impl Session {
    /// New session on a random board. `seed` makes every draw reproducible.
    pub fn new(config: SessionConfig, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let mut grid = Grid::random(config.rows, config.cols, config.mode.kinds(), &mut rng);
        for _ in 1..BOARD_ATTEMPTS {
            if has_any_move(&grid) {
                break;
            }
            grid = Grid::random(config.rows, config.cols, config.mode.kinds(), &mut rng);
        }
        let opponent = GreedyOpponent::new(config.opponent_skill(), StdRng::seed_from_u64(rng.random()));
        Self::with_parts(config, grid, rng, Box::new(opponent))
    }

    /// Session on a given board with an injected opponent.
    pub fn with_parts(
        config: SessionConfig,
        grid: Grid,
        mut rng: StdRng,
        opponent: Box<dyn OpponentPolicy>,
    ) -> Self {
        let battle = (config.mode == GameMode::Battle).then(|| {
            let player = balance::player_team(config.stage, &mut rng);
            let enemy = balance::enemy_team(config.stage, &mut rng);
            BattleResolver::new(config.battle, config.stage, player, enemy)
        });
        info!(
            "session start: {:?} {}x{} stage {}",
            config.mode, config.rows, config.cols, config.stage
        );
        let mut session = Self {
            scheduler: TurnScheduler::new(config.turn_policy()),
            config,
            rng,
            board: Board::new(grid),
            energy: Default::default(),
            scores: [0; 2],
            battle,
            opponent,
            events: EventQueue::default(),
            selection: None,
            targeting: None,
            stuck: false,
            hint: None,
            actor: Side::Player,
            phase_wait: Duration::ZERO,
            think_wait: None,
            combos: 0,
            ended: false,
        };
        session.check_stuck();
        session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn mode(&self) -> GameMode {
        self.config.mode
    }

    /// Board to draw: the working copy while a cascade runs.
    pub fn grid(&self) -> &Grid {
        self.board.view()
    }

    pub fn is_animating(&self) -> bool {
        self.board.is_animating()
    }

    pub fn phase(&self) -> Option<CascadePhase> {
        self.board.phase()
    }

    pub fn flagged(&self) -> Option<&CellMask> {
        self.board.flagged()
    }

    pub fn combo(&self) -> u32 {
        self.board.combo()
    }

    pub fn scheduler(&self) -> &TurnScheduler {
        &self.scheduler
    }

    pub fn side(&self) -> Side {
        self.scheduler.side()
    }

    pub fn score(&self, side: Side) -> u32 {
        self.scores[side.index()]
    }

    pub fn energy(&self, side: Side) -> &EnergyMeter {
        &self.energy[side.index()]
    }

    pub fn battle(&self) -> Option<&BattleResolver> {
        self.battle.as_ref()
    }

    pub fn selection(&self) -> Option<Position> {
        self.selection
    }

    pub fn targeting(&self) -> Option<PowerUpKind> {
        self.targeting
    }

    pub fn is_stuck(&self) -> bool {
        self.stuck
    }

    pub fn current_hint(&self) -> Option<Move> {
        self.hint
    }

    pub fn is_over(&self) -> bool {
        self.scheduler.is_over()
    }

    pub fn winner(&self) -> Option<Side> {
        self.scheduler.winner()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    /// True when the human may act right now.
    pub fn accepts_input(&self) -> bool {
        !self.board.is_animating() && !self.is_over() && !self.ended && self.side() == Side::Player
    }

    // Player actions. Each is silently ignored unless `accepts_input`.

    /// Select a cell, or swap with the selected cell when adjacent. On a stuck board,
    /// blast the 3x3 area around `pos`.
    pub fn tap(&mut self, pos: Position) {
        if !self.accepts_input() || !self.grid().contains(pos) {
            return;
        }
        if self.stuck {
            self.unstick(Side::Player, pos);
            return;
        }
        if self.targeting.is_some() {
            self.select_target(pos);
            return;
        }
        match self.selection.take() {
            None => self.selection = Some(pos),
            Some(sel) if sel == pos => {}
            Some(sel) if sel.is_adjacent(pos) => {
                self.attempt_swap(Side::Player, sel, pos);
            }
            Some(_) => {}
        }
    }

    pub fn swipe(&mut self, pos: Position, dir: Direction) {
        if !self.accepts_input() || !self.grid().contains(pos) {
            return;
        }
        if self.stuck {
            self.unstick(Side::Player, pos);
            return;
        }
        if self.targeting.is_some() {
            return;
        }
        let Some(to) = pos.step(dir, self.grid().rows(), self.grid().cols()) else {
            return;
        };
        self.selection = None;
        self.attempt_swap(Side::Player, pos, to);
    }

    /// Arm the stored power-up. Shuffle fires at once; the others wait for a target.
    pub fn activate_power_up(&mut self) {
        if !self.accepts_input() {
            return;
        }
        let Some(kind) = self.energy[Side::Player.index()].stored() else {
            return;
        };
        self.selection = None;
        if kind.needs_target() {
            self.targeting = Some(kind);
        } else {
            self.fire_power_up(Side::Player, Position::new(0, 0));
        }
    }

    pub fn select_target(&mut self, pos: Position) {
        if !self.accepts_input() || self.targeting.is_none() || !self.grid().contains(pos) {
            return;
        }
        self.fire_power_up(Side::Player, pos);
    }

    pub fn cancel_power_up(&mut self) {
        self.targeting = None;
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Look up a matching swap for the player.
    pub fn hint(&mut self) -> Option<Move> {
        if !self.accepts_input() {
            return None;
        }
        self.hint = find_hint(self.board.committed());
        self.hint
    }

    /// Leave the game: stop every timer. A cascade in flight still finishes.
    pub fn end(&mut self) {
        if self.ended {
            return;
        }
        info!("session ended by player");
        self.ended = true;
        self.scheduler.stop();
        self.selection = None;
        self.targeting = None;
    }

    /// Advance cascades, clocks and the opponent by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        let mut budget = dt;
        while self.board.is_animating() {
            if self.phase_wait > budget {
                self.phase_wait -= budget;
                return;
            }
            budget -= self.phase_wait;
            self.phase_wait = Duration::ZERO;
            self.step_cascade();
        }

        if self.ended || self.is_over() {
            return;
        }
        let changes = self.scheduler.tick(budget);
        self.apply_turn_changes(changes);

        if self.side() == Side::Enemy && !self.is_over() && !self.board.is_animating() {
            let wait = self.think_wait.get_or_insert_with(|| {
                if self.config.think_delay {
                    THINK_BASE + Duration::from_millis(self.rng.random_range(0..THINK_JITTER_MS))
                } else {
                    Duration::ZERO
                }
            });
            if *wait > budget {
                *wait -= budget;
                return;
            }
            self.think_wait = None;
            self.opponent_act();
        }
    }

    fn step_cascade(&mut self) {
        let Some(step) = self.board.advance(&mut self.rng) else {
            return;
        };
        match step {
            CascadeStep::Resolved(res) => self.apply_resolution(res),
            CascadeStep::Removed(_) => self.events.push(GameEvent::PhaseComplete(CascadePhase::Removed)),
            CascadeStep::Dropped => {
                self.events.push(GameEvent::Dropped);
                self.events.push(GameEvent::PhaseComplete(CascadePhase::Dropped));
            }
            CascadeStep::Refilled(_) => self.events.push(GameEvent::PhaseComplete(CascadePhase::Refilled)),
            CascadeStep::Settled(settlement) => {
                self.finish_transaction(settlement);
                return;
            }
        }
        if let Some(phase) = self.board.phase() {
            self.phase_wait = self.config.timing.delay_for(phase);
        }
    }

    fn attempt_swap(&mut self, side: Side, from: Position, to: Position) -> bool {
        match self.board.try_swap(from, to, self.config.mode.swap_policy()) {
            SwapOutcome::Busy | SwapOutcome::Rejected => false,
            SwapOutcome::Invalid => {
                self.events.push(GameEvent::InvalidMove { from, to });
                false
            }
            SwapOutcome::Kept => {
                debug!("{:?} kept swap {:?}<->{:?} without match", side, from, to);
                self.hint = None;
                self.events.push(GameEvent::Swapped { from, to });
                self.events.push(GameEvent::MoveCompleted { side, had_match: false });
                let changes = self.scheduler.on_move_completed(false, 0);
                self.apply_turn_changes(changes);
                self.check_stuck();
                true
            }
            SwapOutcome::Cascading(res) => {
                self.events.push(GameEvent::Swapped { from, to });
                self.open_transaction(side);
                self.apply_resolution(res);
                true
            }
        }
    }

    fn open_transaction(&mut self, side: Side) {
        self.actor = side;
        self.hint = None;
        self.selection = None;
        self.scheduler.pause_timer();
        self.phase_wait = self
            .board
            .phase()
            .map_or(Duration::ZERO, |phase| self.config.timing.delay_for(phase));
    }

    fn unstick(&mut self, side: Side, pos: Position) {
        let cells = area_around(self.board.committed(), pos);
        if !self.board.begin_clear(&cells, Origin::Unstick) {
            return;
        }
        info!("{:?} blasts stuck board at {:?}", side, pos);
        self.stuck = false;
        self.open_transaction(side);
        self.award(side, STUCK_BONUS);
    }

    fn fire_power_up(&mut self, side: Side, target: Position) {
        let Some(kind) = self.energy[side.index()].consume() else {
            return;
        };
        self.targeting = None;
        let opened = if kind.needs_target() {
            let cells = kind.target_cells(self.board.committed(), target);
            let bonus = kind.bonus(cells.len());
            let opened = self.board.begin_clear(&cells, Origin::PowerUp);
            if opened {
                self.award(side, bonus);
            }
            opened
        } else {
            self.board.begin_shuffle(&mut self.rng)
        };
        if opened {
            info!("{:?} used {:?} at {:?}", side, kind, target);
            self.events.push(GameEvent::PowerUpUsed { side, kind });
            self.open_transaction(side);
        }
    }

    fn award(&mut self, side: Side, points: u32) {
        if points == 0 {
            return;
        }
        let score = &mut self.scores[side.index()];
        *score += points;
        let score = *score;
        self.events.push(GameEvent::PointsScored { side, points });
        self.events.push(GameEvent::ScoreChanged { side, score });
        self.check_win_score(side);
    }

    fn apply_resolution(&mut self, res: Resolution) {
        let side = self.actor;
        self.events.push(GameEvent::Matched { matches: res.matches.clone() });
        if res.combo >= 2 {
            self.events.push(GameEvent::Combo { level: res.combo });
            if side == Side::Player {
                self.combos += 1;
            }
        }
        if res.big_matches > 0 {
            self.events.push(GameEvent::BigMatch { count: res.big_matches });
        }
        if let Some(kind) = self.energy[side.index()].add(res.energy, &mut self.rng) {
            self.events.push(GameEvent::PowerUpReady { side, kind });
        }
        self.award(side, res.points);

        let Some(battle) = self.battle.as_mut() else {
            return;
        };
        let report = battle.process_matches(&res.matches, res.combo, side);
        for event in report.events {
            self.events.push(GameEvent::Battle(event));
        }
        if let Some(winner) = report.winner {
            if winner == Side::Player {
                let stage = battle.stage();
                let time_bonus = self.scheduler.time_left().map_or(0, |t| t.as_secs() as u32);
                let bonus = balance::stage_score(stage, time_bonus, self.combos);
                self.award(Side::Player, bonus);
            }
            self.game_over(Some(winner));
        }
    }

    fn check_win_score(&mut self, side: Side) {
        if !matches!(self.config.mode, GameMode::Timed | GameMode::Moves) {
            return;
        }
        if self.scores[side.index()] >= self.config.win_score {
            self.game_over(Some(side));
        }
    }

    fn game_over(&mut self, winner: Option<Side>) {
        let changes = self.scheduler.force_game_over(winner);
        self.apply_turn_changes(changes);
    }

    fn finish_transaction(&mut self, settlement: Settlement) {
        debug!("settled {:?}", settlement);
        if let Origin::Swap(..) = settlement.origin {
            let side = self.actor;
            self.events.push(GameEvent::MoveCompleted { side, had_match: settlement.had_match });
            let changes = self.scheduler.on_move_completed(settlement.had_match, settlement.max_combo);
            self.apply_turn_changes(changes);
        }
        self.scheduler.resume_timer();
        self.check_stuck();
    }

    fn check_stuck(&mut self) {
        self.stuck = !has_any_move(self.board.committed());
        if self.stuck {
            info!("board stuck");
            self.events.push(GameEvent::NoMoves);
        }
    }

    fn apply_turn_changes(&mut self, changes: Vec<TurnChange>) {
        for change in changes {
            match change {
                TurnChange::MovesLeft(_) => {}
                TurnChange::MoveForfeited { side, moves_left } => {
                    self.events.push(GameEvent::MoveForfeited { side, moves_left });
                }
                TurnChange::TurnChanged { side, turn_number } => {
                    self.selection = None;
                    self.targeting = None;
                    self.hint = None;
                    self.think_wait = None;
                    self.events.push(GameEvent::TurnChanged { side, turn_number });
                }
                TurnChange::GameOver { winner } => {
                    info!("game over, winner {:?}", winner);
                    self.selection = None;
                    self.targeting = None;
                    self.events.push(GameEvent::GameOver { winner });
                }
            }
        }
    }

    fn board_center(&self) -> Position {
        let grid = self.board.committed();
        Position::new(grid.rows() / 2, grid.cols() / 2)
    }

    /// One opponent action: spend a stored power-up, blast a stuck board, or swap.
    /// Ends its turn when it has nothing to play.
    fn opponent_act(&mut self) {
        let center = self.board_center();
        if self.energy[Side::Enemy.index()].stored().is_some() {
            self.fire_power_up(Side::Enemy, center);
            return;
        }
        if self.stuck {
            self.unstick(Side::Enemy, center);
            return;
        }
        let grid = self.board.committed();
        let (rows, cols) = (grid.rows(), grid.cols());
        let proposal = self.opponent.propose_move(&grid.snapshot(), rows, cols);
        let played = proposal.is_some_and(|mv| self.attempt_swap(Side::Enemy, mv.from, mv.to));
        if !played {
            debug!("opponent passes");
            let changes = self.scheduler.end_turn();
            self.apply_turn_changes(changes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::parse_grid;
    use crate::matcher::detect_matches;
    use crate::powerup::MAX_ENERGY;

    fn config(mode: GameMode) -> SessionConfig {
        SessionConfig {
            mode,
            timing: CascadeTiming::INSTANT,
            think_delay: false,
            ..SessionConfig::default()
        }
    }

    fn session(mode: GameMode, rows: &[&str]) -> Session {
        let rng = StdRng::seed_from_u64(21);
        let opponent = GreedyOpponent::new(1.0, StdRng::seed_from_u64(22));
        Session::with_parts(config(mode), parse_grid(rows), rng, Box::new(opponent))
    }

    fn settle(s: &mut Session) {
        for _ in 0..100 {
            if !s.is_animating() {
                return;
            }
            s.tick(Duration::from_millis(16));
        }
        panic!("cascade did not settle");
    }

    #[test]
    fn test_stuck_board_tap_blasts_area() {
        let mut s = session(GameMode::Solo, &["FWGE", "PDFW", "GEPD", "FWGE"]);
        assert!(s.is_stuck());
        assert!(s.drain_events().contains(&GameEvent::NoMoves));

        s.tap(Position::new(1, 1));
        assert!(s.is_animating());
        assert_eq!(s.flagged().map(|m| m.count()), Some(9));
        assert!(s.drain_events().contains(&GameEvent::PointsScored { side: Side::Player, points: STUCK_BONUS }));
        settle(&mut s);
        assert!(s.score(Side::Player) >= STUCK_BONUS);
        assert!(detect_matches(s.grid()).is_empty());
    }

    #[test]
    fn test_input_ignored_while_animating() {
        // G(2,0)<->F(2,1) completes FFF in column 0.
        let mut s = session(GameMode::Solo, &["FWGE", "FDEP", "GFPD", "WPDW"]);
        s.swipe(Position::new(2, 0), Direction::Right);
        assert!(s.is_animating());
        let view = s.grid().clone();
        s.drain_events();

        s.swipe(Position::new(3, 2), Direction::Right);
        s.tap(Position::new(0, 0));
        s.activate_power_up();
        assert_eq!(s.hint(), None);
        assert!(s.drain_events().is_empty());
        assert_eq!(s.grid(), &view);
        assert_eq!(s.selection(), None);

        settle(&mut s);
        let events = s.drain_events();
        assert!(events.contains(&GameEvent::MoveCompleted { side: Side::Player, had_match: true }));
        assert!(s.score(Side::Player) >= 30);
    }

    #[test]
    fn test_tap_selects_then_swaps() {
        let mut s = session(GameMode::Solo, &["FWGE", "FDEP", "GFPD", "WPDW"]);
        s.tap(Position::new(2, 0));
        assert_eq!(s.selection(), Some(Position::new(2, 0)));
        s.tap(Position::new(0, 3));
        assert_eq!(s.selection(), None);
        s.tap(Position::new(2, 0));
        s.tap(Position::new(2, 1));
        assert!(s.is_animating());
    }

    #[test]
    fn test_strict_invalid_swap_reports_and_reverts() {
        let mut s = session(GameMode::Solo, &["FWGE", "FDEP", "GFPD", "WPDW"]);
        let before = s.grid().clone();
        s.drain_events();
        s.swipe(Position::new(0, 2), Direction::Right);
        assert_eq!(
            s.drain_events(),
            vec![GameEvent::InvalidMove { from: Position::new(0, 2), to: Position::new(0, 3) }]
        );
        assert_eq!(s.grid(), &before);
    }

    #[test]
    fn test_matchless_moves_hand_turn_to_opponent() {
        // Neither swap forms a match; permissive swaps keep them and spend the budget.
        let mut s = session(GameMode::Moves, &["FWGE", "FDEP", "GFPD", "WPDW"]);
        s.swipe(Position::new(0, 2), Direction::Right);
        assert_eq!(s.scheduler().moves_left(), Some(1));
        s.swipe(Position::new(3, 2), Direction::Right);
        assert_eq!(s.side(), Side::Enemy);
        assert_eq!(s.scheduler().moves_left(), Some(2));
        let events = s.drain_events();
        assert!(events.contains(&GameEvent::TurnChanged { side: Side::Enemy, turn_number: 2 }));

        // The human is locked out until the opponent finishes.
        s.tap(Position::new(0, 0));
        assert_eq!(s.selection(), None);
    }

    #[test]
    fn test_opponent_plays_its_turn() {
        let mut s = Session::new(
            SessionConfig { rows: 8, cols: 8, ..config(GameMode::Timed) },
            Some(5),
        );
        s.tick(TurnPolicy::DEFAULT_TURN);
        assert_eq!(s.side(), Side::Enemy);
        for _ in 0..10 {
            s.tick(Duration::from_millis(16));
        }
        assert!(s.score(Side::Enemy) > 0);
        assert_eq!(s.score(Side::Player), 0);
    }

    #[test]
    fn test_win_score_ends_game() {
        let mut s = session(GameMode::Timed, &["FWGE", "FDEP", "GFPD", "WPDW"]);
        s.config.win_score = 30;
        s.swipe(Position::new(2, 0), Direction::Right);
        settle(&mut s);
        assert!(s.is_over());
        assert_eq!(s.winner(), Some(Side::Player));
        assert!(s.drain_events().contains(&GameEvent::GameOver { winner: Some(Side::Player) }));
        s.tap(Position::new(0, 0));
        assert_eq!(s.selection(), None);
    }

    fn charged_meter(kind: PowerUpKind) -> EnergyMeter {
        (0..)
            .find_map(|seed| {
                let mut meter = EnergyMeter::default();
                (meter.add(MAX_ENERGY, &mut StdRng::seed_from_u64(seed)) == Some(kind)).then_some(meter)
            })
            .unwrap()
    }

    #[test]
    fn test_power_up_targeting() {
        let mut s = session(GameMode::Solo, &["FWGE", "FDEP", "GFPD", "WPDW"]);
        let kind = PowerUpKind::Area;
        s.energy[0] = charged_meter(kind);
        s.activate_power_up();
        assert_eq!(s.targeting(), Some(kind));
        s.cancel_power_up();
        assert_eq!(s.targeting(), None);
        assert_eq!(s.energy(Side::Player).stored(), Some(kind));

        s.activate_power_up();
        s.drain_events();
        s.select_target(Position::new(1, 1));
        let events = s.drain_events();
        assert!(events.contains(&GameEvent::PowerUpUsed { side: Side::Player, kind }));
        assert!(events.contains(&GameEvent::PointsScored { side: Side::Player, points: 50 }));
        assert_eq!(s.energy(Side::Player).stored(), None);
        assert_eq!(s.energy(Side::Player).energy(), 0);
        settle(&mut s);
        assert!(detect_matches(s.grid()).is_empty());
    }

    #[test]
    fn test_shuffle_fires_on_activation() {
        let mut s = session(GameMode::Solo, &["FWGE", "FDEP", "GFPD", "WPDW"]);
        s.energy[0] = charged_meter(PowerUpKind::Shuffle);
        s.drain_events();
        s.activate_power_up();
        assert_eq!(s.targeting(), None);
        assert!(s.is_animating());
        assert_eq!(s.energy(Side::Player).stored(), None);
        assert!(s.drain_events().contains(&GameEvent::PowerUpUsed { side: Side::Player, kind: PowerUpKind::Shuffle }));
        settle(&mut s);
        assert!(detect_matches(s.grid()).is_empty());
    }

    #[test]
    fn test_turn_clock_paused_during_cascade() {
        let rng = StdRng::seed_from_u64(21);
        let opponent = GreedyOpponent::new(1.0, StdRng::seed_from_u64(22));
        let cfg = SessionConfig { timing: CascadeTiming::default(), ..config(GameMode::Timed) };
        let mut s = Session::with_parts(cfg, parse_grid(&["FWGE", "FDEP", "GFPD", "WPDW"]), rng, Box::new(opponent));
        assert!(s.scheduler().clock_running());
        let before = s.scheduler().time_left();

        s.swipe(Position::new(2, 0), Direction::Right);
        s.tick(Duration::from_millis(100));
        assert!(s.is_animating());
        assert!(!s.scheduler().clock_running());
        assert_eq!(s.scheduler().time_left(), before);

        for _ in 0..200 {
            if !s.is_animating() {
                break;
            }
            s.tick(Duration::from_millis(50));
        }
        assert!(!s.is_animating());
        assert!(s.scheduler().clock_running());
        // Only the remainder of the settling tick reaches the clock.
        let left = s.scheduler().time_left().unwrap();
        assert!(left > before.unwrap() - Duration::from_millis(50));
    }

    #[test]
    fn test_select_target_ignored_when_not_targeting() {
        let mut s = session(GameMode::Solo, &["FWGE", "FDEP", "GFPD", "WPDW"]);
        s.select_target(Position::new(1, 1));
        assert!(!s.is_animating());
        assert!(s.drain_events().is_empty());
    }

    #[test]
    fn test_battle_match_hits_a_team() {
        let mut s = Session::new(config(GameMode::Battle), Some(9));
        let mv = find_hint(s.grid()).unwrap();
        s.tap(mv.from);
        s.tap(mv.to);
        settle(&mut s);
        let events = s.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::Battle(_))));
        if !s.is_over() {
            assert_eq!(s.scheduler().moves_left(), Some(1));
            assert_eq!(s.side(), Side::Player);
        }
        let player = s.battle().unwrap().team(Side::Player);
        assert_eq!(player.current_hp(), player.total_hp());
    }

    #[test]
    fn test_end_stops_clocks() {
        let mut s = session(GameMode::Timed, &["FWGE", "FDEP", "GFPD", "WPDW"]);
        s.end();
        s.tick(Duration::from_secs(60));
        assert_eq!(s.side(), Side::Player);
        s.tap(Position::new(0, 0));
        assert_eq!(s.selection(), None);
    }

    #[test]
    fn test_cascade_paced_by_phase_delays() {
        let rng = StdRng::seed_from_u64(21);
        let opponent = GreedyOpponent::new(1.0, StdRng::seed_from_u64(22));
        let cfg = SessionConfig { timing: CascadeTiming::default(), ..config(GameMode::Solo) };
        let mut s = Session::with_parts(cfg, parse_grid(&["FWGE", "FDEP", "GFPD", "WPDW"]), rng, Box::new(opponent));
        s.swipe(Position::new(2, 0), Direction::Right);
        assert_eq!(s.phase(), Some(CascadePhase::Flagged));
        s.tick(Duration::from_millis(150));
        assert_eq!(s.phase(), Some(CascadePhase::Flagged));
        s.tick(Duration::from_millis(60));
        assert_eq!(s.phase(), Some(CascadePhase::Removed));
    }
}
