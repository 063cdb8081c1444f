//! Layout and drawing: menu, board, sidebar, pause, quit dialog, game over.

use crate::GameMode;
use crate::app::{MenuState, MenuTab, QuitOption, ScorePopup, Screen};
use crate::balance;
use crate::cascade::CascadePhase;
use crate::grid::Cell;
use crate::monster::Team;
use crate::session::Session;
use crate::theme::Theme;
use crate::token::{Position, Side};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position as ScreenPos, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each token is a glyph plus a spacer column.
const CELL_WIDTH: u16 = 2;
const CELL_HEIGHT: u16 = 1;
const SIDEBAR_WIDTH: u16 = 32;
const MIN_HEIGHT: u16 = 26;
const MENU_SLIDE_MS: u32 = 500;

/// Board size in terminal cells, border included.
fn board_outer_size(rows: usize, cols: usize) -> (u16, u16) {
    (cols as u16 * CELL_WIDTH + 2, rows as u16 * CELL_HEIGHT + 2)
}

/// Board + sidebar, centred in `area`.
fn game_layout(area: Rect, rows: usize, cols: usize) -> (Rect, Rect) {
    let (bw, bh) = board_outer_size(rows, cols);
    let total_w = bw + SIDEBAR_WIDTH;
    let total_h = bh.max(MIN_HEIGHT).min(area.height);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Fill(1), Constraint::Length(total_w), Constraint::Fill(1)])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(total_h), Constraint::Fill(1)])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let board = Rect {
        height: bh.min(inner[0].height),
        ..inner[0]
    };
    (board, inner[1])
}

/// Board inner rect (tokens only, no border); matches `draw_game` layout.
fn board_rect(area: Rect, session: &Session) -> Rect {
    let grid = session.grid();
    let (outer, _) = game_layout(area, grid.rows(), grid.cols());
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: (grid.cols() as u16 * CELL_WIDTH).min(outer.width.saturating_sub(2)),
        height: (grid.rows() as u16 * CELL_HEIGHT).min(outer.height.saturating_sub(2)),
    }
}

/// Buffer (x, y) positions covered by flagged cells.
fn flagged_buffer_positions(board: Rect, session: &Session) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    let Some(mask) = session.flagged() else {
        return set;
    };
    for pos in mask.positions() {
        let x0 = board.x + pos.col as u16 * CELL_WIDTH;
        let y0 = board.y + pos.row as u16 * CELL_HEIGHT;
        for bx in x0..(x0 + CELL_WIDTH).min(board.x + board.width) {
            for by in y0..(y0 + CELL_HEIGHT).min(board.y + board.height) {
                set.insert((bx, by));
            }
        }
    }
    set
}

/// Create or update the fade on flagged cells and process it.
fn apply_clear_effect(
    frame: &mut Frame,
    session: &Session,
    theme: &Theme,
    area: Rect,
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = board_rect(area, session);
    let delta = clear_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *clear_process_time = Some(now);

    if clear_effect.is_none() {
        let flagged = flagged_buffer_positions(board, session);
        let filter = CellFilter::PositionFn(ref_count(move |pos: ScreenPos| {
            flagged.contains(&(pos.x, pos.y))
        }));
        let fade_ms = session.config().timing.flagged.as_millis().min(u32::MAX as u128) as u32;
        let effect = fx::fade_to(theme.bg, theme.bg, (fade_ms.max(1), Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        *clear_effect = Some(effect);
    }

    if let Some(effect) = clear_effect {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn mm_ss(d: Duration) -> String {
    let secs = d.as_secs_f64().ceil() as u64;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Draw current screen, with pause / quit overlays. While a Flagged phase is on screen
/// and animation is on, fades the flagged cells with TachyonFX.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    session: &Session,
    theme: &Theme,
    cursor: Position,
    paused: bool,
    popups: &[ScorePopup],
    log: &VecDeque<String>,
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    menu_state: &MenuState,
    quit_selected: Option<QuitOption>,
    now: Instant,
    no_animation: bool,
) {
    let area = frame.area();
    match screen {
        Screen::Menu => draw_menu(frame, theme, menu_state, area, now),
        Screen::Playing | Screen::QuitMenu => {
            draw_game(frame, session, theme, cursor, popups, log, area);
            if session.phase() == Some(CascadePhase::Flagged) && !no_animation {
                apply_clear_effect(frame, session, theme, area, clear_effect, clear_process_time, now);
            }
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, opt);
            }
        }
        Screen::GameOver => {
            draw_game(frame, session, theme, cursor, popups, log, area);
            draw_game_over(frame, session, theme, area);
        }
    }
}

fn mode_blurb(mode: GameMode) -> &'static str {
    match mode {
        GameMode::Solo => "Play alone, no clock",
        GameMode::Timed => "Alternate timed turns vs AI",
        GameMode::Moves => "A few moves per turn vs AI",
        GameMode::Battle => "Your matches attack monsters",
    }
}

fn draw_menu(frame: &mut Frame, theme: &Theme, menu_state: &MenuState, area: Rect, now: Instant) {
    let popup = centered(area, 48, 20);

    let title = Line::from(vec![
        Span::styled(" Monster ", Style::default().fg(theme.tokens[0]).bold()),
        Span::styled(" Match ", Style::default().fg(theme.main_fg).bold()),
    ]);
    let glyphs = Line::from(
        crate::token::TokenKind::WITH_BERRY
            .iter()
            .map(|&k| Span::styled(format!("{} ", k.glyph()), Style::default().fg(theme.token_color(k))))
            .collect::<Vec<_>>(),
    );

    let highlight_style = Style::default().fg(Color::Black).bg(theme.title).bold();
    let selected_style = Style::default().fg(theme.title).bold();
    let normal_style = Style::default().fg(theme.main_fg);
    let style_for = |tab_active: bool, selected: bool| {
        if tab_active && selected {
            highlight_style
        } else if selected {
            selected_style
        } else {
            normal_style
        }
    };

    let mut modes = Vec::new();
    for mode in GameMode::ALL {
        let label = match mode {
            GameMode::Solo => " SOLO ",
            GameMode::Timed => " TIMED ",
            GameMode::Moves => " MOVES ",
            GameMode::Battle => " BATTLE ",
        };
        modes.push(Span::styled(
            label,
            style_for(menu_state.current_tab == MenuTab::Mode, menu_state.selected_mode == mode),
        ));
        modes.push(Span::from(" "));
    }

    let mut lines = vec![
        Line::from(""),
        title,
        glyphs,
        Line::from(""),
        Line::from(Span::styled(" ─ MODE ─ ", Style::default().fg(theme.div_line))),
        Line::from(modes),
        Line::from(Span::styled(
            mode_blurb(menu_state.selected_mode),
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(""),
    ];
    if menu_state.selected_mode == GameMode::Battle {
        let stage = menu_state.selected_stage;
        let d = balance::difficulty(stage);
        lines.push(Line::from(Span::styled(" ─ STAGE ─ ", Style::default().fg(theme.div_line))));
        lines.push(Line::from(Span::styled(
            format!(" ◂ {stage} ▸ "),
            style_for(menu_state.current_tab == MenuTab::Stage, true),
        )));
        lines.push(Line::from(Span::styled(
            format!("{} rivals, {}s turns", d.enemy_count, balance::turn_time(stage).as_secs()),
            Style::default().fg(theme.inactive_fg),
        )));
    } else {
        lines.extend([Line::from(""), Line::from(""), Line::from("")]);
    }
    let start_style = if menu_state.current_tab == MenuTab::Start {
        highlight_style
    } else {
        normal_style
    };
    lines.extend([
        Line::from(""),
        Line::from(Span::styled(" [ START ] ", start_style)),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↕ ", Style::default().fg(theme.tokens[1])),
            Span::from("NAVIGATE   "),
            Span::styled(" ↔ ", Style::default().fg(theme.tokens[1])),
            Span::from("CHANGE   "),
            Span::styled(" ENTER ", Style::default().fg(theme.tokens[1])),
            Span::from("START"),
        ]),
        Line::from(Span::styled(" [Q] QUIT ", Style::default().fg(theme.warning))),
    ]);

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );

    // Slide in from below, ease-out cubic
    let elapsed = now.duration_since(menu_state.animation_start).as_millis() as u32;
    let t = (elapsed as f32 / MENU_SLIDE_MS as f32).min(1.0);
    let offset_t = 1.0 - (1.0 - t).powi(3);
    let mut anim_popup = popup;
    anim_popup.y += ((1.0 - offset_t) * 10.0) as u16;
    anim_popup.height = anim_popup.height.min((area.y + area.height).saturating_sub(anim_popup.y));
    p.render(anim_popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Paused ", Style::default().fg(Color::Black).bg(theme.title))),
        Line::from(""),
        Line::from(Span::styled(" P Resume    Q Quit ", Style::default().fg(theme.main_fg))),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, session: &Session, theme: &Theme, area: Rect) {
    let popup = centered(area, 40, 13);
    let (title, title_bg) = match session.winner() {
        Some(Side::Player) => (" You won! ", theme.tokens[2]),
        Some(Side::Enemy) => (" Rival won ", theme.warning),
        None => (" Game Over ", theme.warning),
    };
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(title, Style::default().fg(Color::Black).bg(title_bg).bold())),
        Line::from(""),
        Line::from(Span::styled(format!(" Score: {} ", session.score(Side::Player)), fg)),
    ];
    if session.mode().is_versus() {
        lines.push(Line::from(Span::styled(
            format!(" Rival: {} ", session.score(Side::Enemy)),
            fg,
        )));
    }
    let won_battle = session.mode() == GameMode::Battle && session.winner() == Some(Side::Player);
    if let Some(battle) = session.battle() {
        lines.push(Line::from(Span::styled(format!(" Stage {} ", battle.stage()), fg)));
        if won_battle {
            if let Some(msg) = balance::unlock_message(battle.stage()) {
                lines.push(Line::from(Span::styled(msg, Style::default().fg(theme.title).bold())));
            }
        }
    }
    lines.push(Line::from(""));
    let keys = if won_battle {
        " N Next stage  R Retry  M Menu  Q Quit "
    } else {
        " R Restart  M Menu  Q Quit "
    };
    lines.push(Line::from(Span::styled(keys, fg)));

    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Monster Match ", theme.title)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game(
    frame: &mut Frame,
    session: &Session,
    theme: &Theme,
    cursor: Position,
    popups: &[ScorePopup],
    log: &VecDeque<String>,
    area: Rect,
) {
    let grid = session.grid();
    let (board_area, sidebar_area) = game_layout(area, grid.rows(), grid.cols());
    draw_board(frame, session, theme, cursor, popups, board_area);
    draw_sidebar(frame, session, theme, log, sidebar_area);
}

fn draw_board(
    frame: &mut Frame,
    session: &Session,
    theme: &Theme,
    cursor: Position,
    popups: &[ScorePopup],
    area: Rect,
) {
    let title = if session.is_stuck() {
        " No moves! Tap to blast ".to_string()
    } else if session.combo() >= 2 {
        format!(" Monster Match  Combo x{} ", session.combo())
    } else {
        " Monster Match ".to_string()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let grid = session.grid();
    let flagged = session.flagged();
    let hint: Vec<Position> = session
        .current_hint()
        .map(|mv| vec![mv.from, mv.to])
        .unwrap_or_default();
    let preview: HashSet<Position> = session
        .targeting()
        .map(|kind| kind.target_cells(grid, cursor).into_iter().collect())
        .unwrap_or_default();

    let buf = frame.buffer_mut();
    for pos in grid.positions() {
        let x = inner.x + pos.col as u16 * CELL_WIDTH;
        let y = inner.y + pos.row as u16 * CELL_HEIGHT;
        if x + CELL_WIDTH > inner.x + inner.width || y >= inner.y + inner.height {
            continue;
        }
        let (symbol, mut style) = match grid.get(pos) {
            Cell::Token(kind, fresh) => {
                let mut style = Style::default().fg(theme.token_color(kind)).bg(theme.bg);
                if fresh {
                    style = style.add_modifier(Modifier::BOLD);
                }
                (kind.glyph(), style)
            }
            Cell::Empty => (" ", Style::default().bg(theme.bg)),
        };
        if flagged.is_some_and(|m| m.contains(pos)) {
            style = style.bg(theme.main_fg).fg(theme.bg);
        } else if session.selection() == Some(pos) {
            style = style.bg(theme.title).fg(theme.bg);
        } else if preview.contains(&pos) {
            style = style.bg(theme.warning);
        } else if hint.contains(&pos) {
            style = style.bg(theme.div_line);
        }
        if pos == cursor && session.accepts_input() {
            style = style.add_modifier(Modifier::REVERSED);
        }
        buf.set_string(x, y, symbol, style);
        buf.set_string(x + 1, y, " ", style);
    }

    for popup in popups {
        let rx = inner.x + popup.col as u16 * CELL_WIDTH;
        let ry = inner.y + popup.row as u16 * CELL_HEIGHT;
        if rx >= inner.x + inner.width || ry >= inner.y + inner.height {
            continue;
        }
        let label = if popup.combo > 1 {
            format!("+{} x{}", popup.amount, popup.combo)
        } else {
            format!("+{}", popup.amount)
        };
        let color = match popup.side {
            Side::Player => theme.title,
            Side::Enemy => theme.warning,
        };
        let width = (inner.x + inner.width - rx) as usize;
        let label: String = label.chars().take(width).collect();
        buf.set_string(rx, ry, label, Style::default().fg(color).bg(theme.bg).bold());
    }
}

fn section(theme: &Theme, title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(format!(" {title} "), Style::default().fg(theme.title)))
}

fn draw_sidebar(frame: &mut Frame, session: &Session, theme: &Theme, log: &VecDeque<String>, area: Rect) {
    let battle = session.battle().is_some();
    let mut constraints = vec![
        Constraint::Length(5), // turn
        Constraint::Length(if session.mode().is_versus() { 4 } else { 3 }), // score
        Constraint::Length(5), // energy
    ];
    if battle {
        constraints.push(Constraint::Length(8));
    }
    constraints.push(Constraint::Min(3));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    draw_turn(frame, session, theme, chunks[0]);
    draw_scores(frame, session, theme, chunks[1]);
    draw_energy(frame, session, theme, chunks[2]);
    if let Some(battle_state) = session.battle() {
        let block = section(theme, "Battle");
        let inner = block.inner(chunks[3]);
        block.render(chunks[3], frame.buffer_mut());
        let halves = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Length(3)])
            .split(inner);
        draw_team(frame, battle_state.team(Side::Player), theme, halves[0]);
        draw_team(frame, battle_state.team(Side::Enemy), theme, halves[1]);
    }
    draw_log(frame, log, theme, chunks[chunks.len() - 1]);
}

fn draw_turn(frame: &mut Frame, session: &Session, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg = Style::default().fg(theme.main_fg);
    let scheduler = session.scheduler();
    let mut lines = vec![Line::from(Span::styled(session.mode().name(), fg.bold()))];
    if session.mode().is_versus() {
        let whose = match session.side() {
            Side::Player => "Your turn".to_string(),
            Side::Enemy => "Rival thinking...".to_string(),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("Turn {}: ", scheduler.turn_number()), title_style),
            Span::styled(whose, fg),
        ]));
    }
    let mut status = Vec::new();
    if let Some(left) = scheduler.time_left() {
        let style = if !scheduler.clock_running() {
            Style::default().fg(theme.inactive_fg)
        } else if left <= Duration::from_secs(3) {
            Style::default().fg(theme.warning).bold()
        } else {
            fg
        };
        status.push(Span::styled("Time ", title_style));
        status.push(Span::styled(mm_ss(left), style));
        status.push(Span::from("  "));
    }
    if let Some(moves) = scheduler.moves_left() {
        status.push(Span::styled("Moves ", title_style));
        status.push(Span::styled(moves.to_string(), fg));
    }
    lines.push(Line::from(status));

    let block = section(theme, "Turn");
    Paragraph::new(Text::from(lines))
        .block(block)
        .render(area, frame.buffer_mut());
}

fn draw_scores(frame: &mut Frame, session: &Session, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg = Style::default().fg(theme.main_fg);
    let mut you = vec![
        Span::styled("You: ", title_style),
        Span::styled(session.score(Side::Player).to_string(), fg),
    ];
    if matches!(session.mode(), GameMode::Timed | GameMode::Moves) {
        you.push(Span::styled(format!(" / {}", session.config().win_score), Style::default().fg(theme.inactive_fg)));
    }
    let mut lines = vec![Line::from(you)];
    if session.mode().is_versus() {
        lines.push(Line::from(vec![
            Span::styled("Rival: ", title_style),
            Span::styled(session.score(Side::Enemy).to_string(), fg),
        ]));
    }
    Paragraph::new(Text::from(lines))
        .block(section(theme, "Score"))
        .render(area, frame.buffer_mut());
}

fn draw_energy(frame: &mut Frame, session: &Session, theme: &Theme, area: Rect) {
    let block = section(theme, "Energy");
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let meter = session.energy(Side::Player);
    Gauge::default()
        .ratio(meter.ratio().clamp(0.0, 1.0))
        .label(format!("{}/{}", meter.energy(), crate::powerup::MAX_ENERGY))
        .gauge_style(Style::default().fg(theme.tokens[3]).bg(theme.div_line))
        .render(rows[0], frame.buffer_mut());

    let line = match (session.targeting(), meter.stored()) {
        (Some(kind), _) => Line::from(vec![
            Span::styled(format!("Aim {} ", kind.name()), Style::default().fg(theme.warning).bold()),
            Span::styled("Esc cancel", Style::default().fg(theme.inactive_fg)),
        ]),
        (None, Some(kind)) => Line::from(vec![
            Span::styled(format!("{} ready ", kind.name()), Style::default().fg(theme.title).bold()),
            Span::styled("[E]", Style::default().fg(theme.inactive_fg)),
        ]),
        (None, None) => Line::from(Span::styled("Match to charge", Style::default().fg(theme.inactive_fg))),
    };
    Paragraph::new(line).render(rows[1], frame.buffer_mut());
    if let Some(kind) = session.targeting().or(meter.stored()) {
        Paragraph::new(Span::styled(kind.description(), Style::default().fg(theme.inactive_fg)))
            .render(rows[2], frame.buffer_mut());
    }
}

fn draw_team(frame: &mut Frame, team: &Team, theme: &Theme, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
        .split(area);
    let ratio = team.hp_ratio().clamp(0.0, 1.0);
    let color = if ratio > 0.5 {
        theme.tokens[2]
    } else if ratio > 0.25 {
        theme.tokens[3]
    } else {
        theme.warning
    };
    Paragraph::new(Line::from(Span::styled(team.name.as_str(), Style::default().fg(theme.title))))
        .render(rows[0], frame.buffer_mut());
    Gauge::default()
        .ratio(ratio)
        .label(format!("{}/{}", team.current_hp(), team.total_hp()))
        .gauge_style(Style::default().fg(color).bg(theme.div_line))
        .render(rows[1], frame.buffer_mut());
    let active = match team.active() {
        Some(m) => Line::from(vec![
            Span::styled(format!("{} ", m.element().glyph()), Style::default().fg(theme.token_color(m.element()))),
            Span::styled(
                format!("{}{} {}/{}", m.name(), if m.evolved { "+" } else { "" }, m.current_hp, m.max_hp),
                Style::default().fg(theme.main_fg),
            ),
        ]),
        None => Line::from(Span::styled("defeated", Style::default().fg(theme.inactive_fg))),
    };
    Paragraph::new(active).render(rows[2], frame.buffer_mut());
}

fn draw_log(frame: &mut Frame, log: &VecDeque<String>, theme: &Theme, area: Rect) {
    let block = section(theme, "Log");
    let visible = block.inner(area).height as usize;
    let lines: Vec<Line> = log
        .iter()
        .skip(log.len().saturating_sub(visible))
        .map(|l| Line::from(Span::styled(l.as_str(), Style::default().fg(theme.main_fg))))
        .collect();
    Paragraph::new(Text::from(lines))
        .block(block)
        .render(area, frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let quit_rect = centered(frame.area(), 24, 8);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    Clear.render(quit_rect, frame.buffer_mut());
    for y in quit_rect.y..quit_rect.y + quit_rect.height {
        for x in quit_rect.x..quit_rect.x + quit_rect.width {
            frame.buffer_mut()[(x, y)].set_style(Style::default().bg(theme.bg));
        }
    }
    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::MainMenu, " Main Menu "),
        (QuitOption::Exit, " Exit "),
    ];
    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default().fg(theme.bg).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + inner.width.saturating_sub(label.len() as u16) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        if ry < inner.y + inner.height {
            frame.buffer_mut().set_string(rx, ry, label, style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_board_rect_fits_inside_layout() {
        let area = Rect::new(0, 0, 100, 30);
        let (board, sidebar) = game_layout(area, 8, 8);
        assert_eq!(board.width, 18);
        assert_eq!(board.height, 10);
        assert_eq!(sidebar.width, SIDEBAR_WIDTH);
        assert_eq!(sidebar.x, board.x + board.width);
    }

    #[test]
    fn test_mm_ss_rounds_up() {
        assert_eq!(mm_ss(Duration::from_millis(9_200)), "00:10");
        assert_eq!(mm_ss(Duration::from_secs(75)), "01:15");
    }

    #[test]
    fn test_draws_battle_screen() {
        let config = SessionConfig { mode: GameMode::Battle, ..SessionConfig::default() };
        let session = Session::new(config, Some(4));
        let theme = Theme::default();
        let menu = MenuState {
            current_tab: MenuTab::Mode,
            selected_mode: GameMode::Battle,
            selected_stage: 1,
            animation_start: Instant::now(),
        };
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let mut effect = None;
        let mut process_time = None;
        terminal
            .draw(|f| {
                draw(
                    f,
                    Screen::Playing,
                    &session,
                    &theme,
                    Position::new(0, 0),
                    false,
                    &[],
                    &VecDeque::from(vec!["Pikachu took 6 damage".to_string()]),
                    &mut effect,
                    &mut process_time,
                    &menu,
                    None,
                    Instant::now(),
                    true,
                );
            })
            .unwrap();
        let text: String = terminal.backend().buffer().content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Monster Battle"));
        assert!(text.contains("Boss Lv.1"));
    }
}
