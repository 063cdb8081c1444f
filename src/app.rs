//! App: terminal init, main loop, tick and key handling.

use crate::events::GameEvent;
use crate::input::{Action, key_to_action};
use crate::session::Session;
use crate::theme::Theme;
use crate::token::{Direction, Position, Side};
use crate::{Args, GameConfig, GameMode};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use log::info;
use ratatui::DefaultTerminal;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Lines kept in the sidebar event log.
const LOG_LINES: usize = 8;
/// Highest stage offered by the menu; `--stage` goes beyond.
const MENU_MAX_STAGE: u32 = 20;
const POPUP_STEP_MS: u32 = 150;
const POPUP_LIFETIME_MS: u32 = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTab {
    Mode,
    Stage,
    Start,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub current_tab: MenuTab,
    pub selected_mode: GameMode,
    pub selected_stage: u32,
    pub animation_start: Instant,
}

impl MenuState {
    fn new(mode: GameMode, stage: u32) -> Self {
        Self {
            current_tab: MenuTab::Mode,
            selected_mode: mode,
            selected_stage: stage.clamp(1, MENU_MAX_STAGE),
            animation_start: Instant::now(),
        }
    }

    fn cycle_mode(&mut self, forward: bool) {
        let all = GameMode::ALL;
        let i = all.iter().position(|&m| m == self.selected_mode).unwrap_or(0);
        let next = if forward { i + 1 } else { i + all.len() - 1 };
        self.selected_mode = all[next % all.len()];
    }

    fn step_stage(&mut self, forward: bool) {
        self.selected_stage = if forward {
            (self.selected_stage + 1).min(MENU_MAX_STAGE)
        } else {
            self.selected_stage.saturating_sub(1).max(1)
        };
    }

    fn step_tab(&mut self, forward: bool) {
        let stage_tab = self.selected_mode == GameMode::Battle;
        self.current_tab = match (self.current_tab, forward) {
            (MenuTab::Mode, true) if stage_tab => MenuTab::Stage,
            (MenuTab::Mode, true) => MenuTab::Start,
            (MenuTab::Stage, true) => MenuTab::Start,
            (MenuTab::Start, true) => MenuTab::Mode,
            (MenuTab::Mode, false) => MenuTab::Start,
            (MenuTab::Stage, false) => MenuTab::Mode,
            (MenuTab::Start, false) if stage_tab => MenuTab::Stage,
            (MenuTab::Start, false) => MenuTab::Mode,
        };
    }
}

/// Floating "+points" label anchored to a board cell.
#[derive(Debug, Clone)]
pub struct ScorePopup {
    pub row: usize,
    pub col: usize,
    pub amount: u32,
    pub combo: u32,
    pub side: Side,
    pub age_ms: u32,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    session: Session,
    screen: Screen,
    paused: bool,
    cursor: Position,
    /// Cell the next popup anchors to: last match or swap.
    focus: Position,
    popups: Vec<ScorePopup>,
    log: VecDeque<String>,
    last_frame: Instant,
    /// TachyonFX fade for flagged cells (created when a Flagged phase is drawn).
    clear_effect: Option<Effect>,
    clear_effect_process_time: Option<Instant>,
    menu_state: MenuState,
    quit_selected: QuitOption,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Result<Self> {
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        let session = Session::new(config.session(), config.seed);
        let center = Position::new(config.rows / 2, config.cols / 2);
        let menu_state = MenuState::new(config.mode, config.stage);
        Ok(Self {
            config,
            theme,
            session,
            screen,
            paused: false,
            cursor: center,
            focus: center,
            popups: Vec::new(),
            log: VecDeque::new(),
            last_frame: Instant::now(),
            clear_effect: None,
            clear_effect_process_time: None,
            menu_state,
            quit_selected: QuitOption::Resume,
        })
    }

    fn reset_game(&mut self) {
        self.session.end();
        self.session = Session::new(self.config.session(), self.config.seed);
        self.screen = Screen::Playing;
        self.paused = false;
        self.cursor = Position::new(self.config.rows / 2, self.config.cols / 2);
        self.focus = self.cursor;
        self.popups.clear();
        self.log.clear();
        self.clear_effect = None;
        self.clear_effect_process_time = None;
        self.last_frame = Instant::now();
        info!("new game: {:?} stage {}", self.config.mode, self.config.stage);
    }

    fn start_from_menu(&mut self) {
        self.config.mode = self.menu_state.selected_mode;
        self.config.stage = self.menu_state.selected_stage;
        self.reset_game();
    }

    fn push_log(&mut self, line: String) {
        if self.log.len() == LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }

    /// Pull events out of the session into popups and the log.
    fn absorb_events(&mut self) {
        for event in self.session.drain_events() {
            match &event {
                GameEvent::Swapped { to, .. } => self.focus = *to,
                GameEvent::Matched { matches } => {
                    if let Some(&pos) = matches.first().and_then(|m| m.positions.first()) {
                        self.focus = pos;
                    }
                }
                GameEvent::PointsScored { side, points } => self.popups.push(ScorePopup {
                    row: self.focus.row,
                    col: self.focus.col,
                    amount: *points,
                    combo: self.session.combo(),
                    side: *side,
                    age_ms: 0,
                }),
                _ => {}
            }
            if let Some(line) = event.describe() {
                self.push_log(line);
            }
        }
    }

    fn tick_popups(&mut self, delta_ms: u32) {
        self.popups.retain_mut(|p| {
            let old_steps = p.age_ms / POPUP_STEP_MS;
            p.age_ms += delta_ms;
            if p.age_ms / POPUP_STEP_MS > old_steps {
                p.row = p.row.saturating_sub(1);
            }
            p.age_ms < POPUP_LIFETIME_MS
        });
    }

    /// Advance the session by wall time and react to what it did.
    fn tick(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;
        if self.screen != Screen::Playing || self.paused || self.session.is_ended() {
            return;
        }
        self.session.tick(dt);
        self.absorb_events();
        self.tick_popups(dt.as_millis().min(u128::from(u32::MAX)) as u32);

        if self.session.phase() != Some(crate::cascade::CascadePhase::Flagged) {
            self.clear_effect = None;
            self.clear_effect_process_time = None;
        }
        if self.session.is_over() && !self.session.is_animating() {
            self.screen = Screen::GameOver;
        }
    }

    /// Returns true when the app should exit.
    fn handle_action(&mut self, action: Action, code: KeyCode) -> bool {
        match self.screen {
            Screen::Menu => match action {
                Action::Quit => return true,
                Action::Cursor(Direction::Left) | Action::Cursor(Direction::Right) => {
                    let forward = action == Action::Cursor(Direction::Right);
                    match self.menu_state.current_tab {
                        MenuTab::Mode => self.menu_state.cycle_mode(forward),
                        MenuTab::Stage => self.menu_state.step_stage(forward),
                        MenuTab::Start => {}
                    }
                }
                Action::Cursor(Direction::Down) => self.menu_state.step_tab(true),
                Action::Cursor(Direction::Up) => self.menu_state.step_tab(false),
                Action::Tap => {
                    if self.menu_state.current_tab == MenuTab::Start {
                        self.start_from_menu();
                    } else {
                        self.menu_state.current_tab = MenuTab::Start;
                    }
                }
                _ => {}
            },
            Screen::Playing if self.paused => match action {
                Action::Pause => self.paused = false,
                Action::Quit => {
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                }
                _ => {}
            },
            Screen::Playing => match action {
                Action::Cursor(dir) => {
                    let grid = self.session.grid();
                    if let Some(next) = self.cursor.step(dir, grid.rows(), grid.cols()) {
                        self.cursor = next;
                    }
                }
                Action::Swipe(dir) => self.session.swipe(self.cursor, dir),
                Action::Tap => self.session.tap(self.cursor),
                Action::PowerUp => self.session.activate_power_up(),
                Action::Back => {
                    if self.session.targeting().is_some() {
                        self.session.cancel_power_up();
                    } else {
                        self.session.clear_selection();
                    }
                }
                Action::Hint => {
                    if self.session.accepts_input() && self.session.hint().is_none() {
                        self.push_log("No hint available".to_string());
                    }
                }
                Action::Pause => self.paused = true,
                Action::Quit => {
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                }
                Action::None => {}
            },
            Screen::QuitMenu => match action {
                Action::Cursor(Direction::Down | Direction::Right) => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::MainMenu,
                        QuitOption::MainMenu => QuitOption::Exit,
                        QuitOption::Exit => QuitOption::Resume,
                    };
                }
                Action::Cursor(Direction::Up | Direction::Left) => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::Exit,
                        QuitOption::MainMenu => QuitOption::Resume,
                        QuitOption::Exit => QuitOption::MainMenu,
                    };
                }
                Action::Tap => match self.quit_selected {
                    QuitOption::Resume => self.resume(),
                    QuitOption::MainMenu => {
                        self.session.end();
                        self.menu_state = MenuState::new(self.config.mode, self.config.stage);
                        self.screen = Screen::Menu;
                    }
                    QuitOption::Exit => {
                        self.session.end();
                        return true;
                    }
                },
                Action::Pause | Action::Quit | Action::Back => self.resume(),
                _ => {}
            },
            Screen::GameOver => {
                if action == Action::Quit {
                    return true;
                }
                match code {
                    KeyCode::Char('r' | 'R') => self.reset_game(),
                    KeyCode::Char('n' | 'N') if self.won_battle() => {
                        self.config.stage += 1;
                        self.reset_game();
                    }
                    KeyCode::Char('m' | 'M') => {
                        self.menu_state = MenuState::new(self.config.mode, self.config.stage);
                        self.screen = Screen::Menu;
                    }
                    _ => {}
                }
            }
        }
        false
    }

    fn resume(&mut self) {
        self.screen = Screen::Playing;
        self.last_frame = Instant::now();
    }

    fn won_battle(&self) -> bool {
        self.session.mode() == GameMode::Battle && self.session.winner() == Some(Side::Player)
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.last_frame = Instant::now();
        loop {
            let now = Instant::now();
            self.tick(now);
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.session,
                    &self.theme,
                    self.cursor,
                    self.paused,
                    &self.popups,
                    &self.log,
                    &mut self.clear_effect,
                    &mut self.clear_effect_process_time,
                    &self.menu_state,
                    (self.screen == Screen::QuitMenu).then_some(self.quit_selected),
                    now,
                    self.config.no_animation,
                );
            })?;

            // Limit event polling to ~60 FPS rendering (16ms)
            let frame_duration = Duration::from_millis(16);
            let timeout = frame_duration.saturating_sub(now.elapsed());
            if !event::poll(timeout)? {
                continue;
            }
            while event::poll(Duration::ZERO)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_action(key_to_action(key), key.code) {
                        return Ok(());
                    }
                }
            }
        }
    }
}
