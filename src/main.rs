//! Monster Match: a match-3 monster battle puzzle game in the terminal.

mod app;
mod balance;
mod battle;
mod cascade;
mod events;
mod grid;
mod input;
mod matcher;
mod monster;
mod moves;
mod opponent;
mod powerup;
mod session;
mod theme;
mod token;
mod turn;
mod ui;

use anyhow::{Context, Result};
use app::App;
use cascade::CascadeTiming;
use clap::{Parser, ValueEnum};
use session::SessionConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Options derived from CLI that shape every session started from this run.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub mode: GameMode,
    pub rows: usize,
    pub cols: usize,
    pub stage: u32,
    pub seed: Option<u64>,
    pub turn_seconds: Option<u64>,
    pub moves_per_turn: u32,
    pub win_score: u32,
    pub no_animation: bool,
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            mode: args.mode,
            rows: args.rows,
            cols: args.cols,
            stage: args.stage,
            seed: args.seed,
            turn_seconds: args.turn_seconds,
            moves_per_turn: args.moves_per_turn,
            win_score: args.win_score,
            no_animation: args.no_animation,
        }
    }

    /// Session settings for the currently selected mode and stage.
    pub fn session(&self) -> SessionConfig {
        let timing = if self.no_animation {
            CascadeTiming::INSTANT
        } else {
            CascadeTiming::default()
        };
        SessionConfig {
            mode: self.mode,
            rows: self.rows,
            cols: self.cols,
            stage: self.stage,
            turn_time: self.turn_seconds.map(Duration::from_secs),
            moves_per_turn: self.moves_per_turn,
            win_score: self.win_score,
            timing,
            think_delay: !self.no_animation,
            ..SessionConfig::default()
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig::from_args(&args);
    let mut app = App::new(args, config, theme)?;
    app.run()?;
    Ok(())
}

/// The terminal belongs to the UI, so logs only go to a file when one is given.
fn init_logging(path: Option<&std::path::Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Match-3 monster battle puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "monster-match",
    version,
    about = "Match-3 monster battle puzzle in the terminal. Swap tokens to line up three or more; chains cascade.",
    long_about = "Monster Match is a terminal match-3 puzzle game.\n\n\
        Swap two adjacent tokens to line up three or more of a kind. Matched tokens vanish, \
        the rest fall and new ones drop in, which can chain into combos. Filling the energy \
        meter stores a power-up. In versus modes you take turns against a computer rival; in \
        battle mode your matches attack the rival's monster team.\n\n\
        CONTROLS (normal):\n  Arrows      Move cursor   Space/Enter  Select / swap   Shift+Arrows  Swap in direction\n  E           Power-up      Esc          Cancel target   ?             Hint\n  P           Pause         Q            Quit\n\n\
        CONTROLS (vim):\n  h/j/k/l     Move cursor   H/J/K/L      Swap in direction\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Game mode: solo (no rival), timed (turn clock vs AI), moves (move budget vs AI), or battle (monster teams vs AI).
    #[arg(short, long, default_value = "solo")]
    pub mode: GameMode,

    /// Board rows.
    #[arg(long, default_value = "8", value_name = "ROWS", value_parser = board_dimension)]
    pub rows: usize,

    /// Board columns.
    #[arg(long, default_value = "8", value_name = "COLS", value_parser = board_dimension)]
    pub cols: usize,

    /// Battle stage (1 and up). Sets enemy team, AI skill, turn time and rewards.
    #[arg(short, long, default_value = "1", value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub stage: u32,

    /// Seed for reproducible boards, teams and rival play.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Turn length in seconds (per-move clock in 'moves' mode). Defaults depend on the mode.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=600))]
    pub turn_seconds: Option<u64>,

    /// Moves per turn in 'moves' and 'battle' modes.
    #[arg(long, default_value = "2", value_name = "N", value_parser = clap::value_parser!(u32).range(1..=10))]
    pub moves_per_turn: u32,

    /// Score that wins 'timed' and 'moves' games.
    #[arg(long, default_value = "2000", value_name = "POINTS")]
    pub win_score: u32,

    /// Disable cascade animation (instant clears, rival plays without pause).
    #[arg(long)]
    pub no_animation: bool,

    /// Skip main menu and start game immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Write logs here (level from RUST_LOG, default info). No logging without it.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

fn board_dimension(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if (3..=12).contains(&n) {
        Ok(n)
    } else {
        Err(format!("board size must be between 3 and 12, got {n}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GameMode {
    #[default]
    Solo,
    Timed,
    Moves,
    Battle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_dimension_range() {
        assert_eq!(board_dimension("3"), Ok(3));
        assert_eq!(board_dimension("12"), Ok(12));
        assert!(board_dimension("2").is_err());
        assert!(board_dimension("13").is_err());
        assert!(board_dimension("x").is_err());
    }

    #[test]
    fn test_no_animation_session_is_instant() {
        let args = Args::parse_from(["monster-match", "--mode", "battle", "--no-animation", "--turn-seconds", "12"]);
        let session = GameConfig::from_args(&args).session();
        assert_eq!(session.mode, GameMode::Battle);
        assert_eq!(session.timing, CascadeTiming::INSTANT);
        assert!(!session.think_delay);
        assert_eq!(session.turn_time, Some(Duration::from_secs(12)));
    }
}
