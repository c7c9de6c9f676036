//! Layout and drawing: level panel, board, falling tiles, sidebar, pause overlay.

use crate::animation::{Animator, Sprite};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position as BufPos, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};
use tilepop::{Phase, Position, RoundController, SpecialKind, TileView};

/// Each tile is drawn as a block of CELL_WIDTH x CELL_HEIGHT terminal cells.
const CELL_WIDTH: u16 = 4;
const CELL_HEIGHT: u16 = 2;
const SIDEBAR_WIDTH: u16 = 24;

/// Everything the frame needs to know besides the fade effect state.
pub struct View<'a> {
    pub controller: &'a RoundController,
    pub animator: &'a Animator,
    pub theme: &'a Theme,
    pub cursor: Position,
    pub paused: bool,
    pub status: Option<&'a str>,
    pub no_animation: bool,
}

/// Board size in terminal cells including the border.
fn board_outer_size(size: usize) -> (u16, u16) {
    let n = size as u16;
    (n * CELL_WIDTH + 2, n * CELL_HEIGHT + 2)
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

/// Board (outer, with border) and sidebar rects for a frame of `area`.
fn split_screen(area: Rect, size: usize) -> (Rect, Rect) {
    let (bw, bh) = board_outer_size(size);
    let active = centered(area, bw + SIDEBAR_WIDTH, bh);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(active);
    (chunks[0], chunks[1])
}

/// Inner board rect (inside the border) where tiles are drawn.
pub fn board_rect(area: Rect, size: usize) -> Rect {
    let (outer, _) = split_screen(area, size);
    let n = size as u16;
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: (n * CELL_WIDTH).min(outer.width.saturating_sub(2)),
        height: (n * CELL_HEIGHT).min(outer.height.saturating_sub(2)),
    }
}

/// Grid cell under a terminal position, if any.
pub fn cell_at(board: Rect, size: usize, column: u16, row: u16) -> Option<Position> {
    if !board.contains(BufPos::new(column, row)) {
        return None;
    }
    let col = usize::from((column - board.x) / CELL_WIDTH);
    let r = usize::from((row - board.y) / CELL_HEIGHT);
    (r < size && col < size).then(|| Position::new(r, col))
}

/// Buffer cells covered by the given grid cells.
fn buffer_positions(board: Rect, cells: &[Position]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for pos in cells {
        let x0 = board.x + pos.col as u16 * CELL_WIDTH;
        let y0 = board.y + pos.row as u16 * CELL_HEIGHT;
        for bx in x0..(x0 + CELL_WIDTH).min(board.right()) {
            for by in y0..(y0 + CELL_HEIGHT).min(board.bottom()) {
                set.insert((bx, by));
            }
        }
    }
    set
}

pub fn draw(
    frame: &mut Frame,
    view: &View<'_>,
    fade_effect: &mut Option<Effect>,
    fade_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    let size = view.controller.grid().size();
    let (board_outer, sidebar) = split_screen(area, size);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(view.theme.div_line).bg(view.theme.bg));
    let board_inner = block.inner(board_outer);
    block.render(board_outer, frame.buffer_mut());

    match view.controller.phase() {
        Phase::Playing | Phase::Resolving => {
            draw_board(frame, view, board_inner, now);
            if !view.no_animation {
                apply_fade_effect(frame, view, board_inner, fade_effect, fade_process_time, now);
            }
        }
        Phase::Finished => draw_finished(frame, view, board_inner),
        Phase::Idle | Phase::LevelIntro | Phase::RoundEnd => draw_intro(frame, view, board_inner),
    }
    draw_sidebar(frame, view, sidebar);

    if view.paused {
        draw_pause_overlay(frame, view.theme, area);
    }
}

fn tile_style(theme: &Theme, tile: TileView) -> Style {
    match tile.special {
        SpecialKind::Key | SpecialKind::LockedDoor => {
            Style::default().fg(theme.main_fg).bg(theme.locked)
        }
        SpecialKind::Hero => Style::default()
            .fg(theme.hero)
            .bg(theme.tile_color(tile.tile))
            .add_modifier(Modifier::BOLD),
        SpecialKind::None => Style::default().bg(theme.tile_color(tile.tile)),
    }
}

fn glyph(special: SpecialKind) -> &'static str {
    match special {
        SpecialKind::None => "",
        SpecialKind::Hero => "@",
        SpecialKind::Key => "k",
        SpecialKind::LockedDoor => "#",
    }
}

/// Paint one tile at buffer row `y` (may be partly outside `board`).
fn paint_tile(frame: &mut Frame, board: Rect, theme: &Theme, col: usize, y: i32, tile: TileView) {
    let style = tile_style(theme, tile);
    let x0 = board.x + col as u16 * CELL_WIDTH;
    let label = glyph(tile.special);
    for dy in 0..CELL_HEIGHT {
        let by = y + i32::from(dy);
        if by < i32::from(board.y) || by >= i32::from(board.bottom()) {
            continue;
        }
        let by = by as u16;
        for dx in 0..CELL_WIDTH {
            let bx = x0 + dx;
            if let Some(cell) = frame.buffer_mut().cell_mut((bx, by)) {
                cell.set_style(style);
                cell.set_symbol(" ");
            }
        }
        if dy == 0 && !label.is_empty() {
            if let Some(cell) = frame.buffer_mut().cell_mut((x0 + CELL_WIDTH / 2 - 1, by)) {
                cell.set_symbol(label);
            }
        }
    }
}

fn draw_board(frame: &mut Frame, view: &View<'_>, board: Rect, now: Instant) {
    let theme = view.theme;
    let size = view.controller.grid().size();
    for row in 0..size {
        for col in 0..size {
            if let Some(tile) = view.animator.cell(Position::new(row, col)) {
                let y = i32::from(board.y) + (row as i32) * i32::from(CELL_HEIGHT);
                paint_tile(frame, board, theme, col, y, tile);
            }
        }
    }
    for Sprite { tile, col, row } in view.animator.sprites(now) {
        let y = i32::from(board.y) + (row * f32::from(CELL_HEIGHT)).round() as i32;
        paint_tile(frame, board, theme, col, y, tile);
    }

    let style = Style::default().fg(theme.main_fg).add_modifier(Modifier::BOLD);
    for (x, y, symbol) in cursor_marks(board, view.cursor) {
        if let Some(cell) = frame.buffer_mut().cell_mut((x, y)) {
            cell.set_symbol(symbol);
            cell.set_style(style);
        }
    }
}

/// Bracket positions on the left and right edge of the cursor cell, clipped to `board`.
fn cursor_marks(board: Rect, cursor: Position) -> Vec<(u16, u16, &'static str)> {
    let x0 = u32::from(board.x) + cursor.col as u32 * u32::from(CELL_WIDTH);
    let y0 = u32::from(board.y) + cursor.row as u32 * u32::from(CELL_HEIGHT);
    let mut marks = Vec::with_capacity(usize::from(CELL_HEIGHT) * 2);
    for dy in 0..u32::from(CELL_HEIGHT) {
        for (dx, symbol) in [(0, "["), (u32::from(CELL_WIDTH) - 1, "]")] {
            let (x, y) = (x0 + dx, y0 + dy);
            if x < u32::from(board.right()) && y < u32::from(board.bottom()) {
                marks.push((x as u16, y as u16, symbol));
            }
        }
    }
    marks
}

/// Create or update the removal fade and process it (TachyonFX: fade removed cells to bg).
fn apply_fade_effect(
    frame: &mut Frame,
    view: &View<'_>,
    board: Rect,
    fade_effect: &mut Option<Effect>,
    fade_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let Some((cells, duration)) = view.animator.fading() else {
        return;
    };
    let delta = fade_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    *fade_process_time = Some(now);

    if fade_effect.is_none() {
        let fading = buffer_positions(board, &cells);
        let filter = CellFilter::PositionFn(ref_count(move |pos: BufPos| {
            fading.contains(&(pos.x, pos.y))
        }));
        let bg = view.theme.bg;
        let ms = duration.as_millis().min(u128::from(u32::MAX)) as u32;
        let effect = fx::fade_to(bg, bg, (ms, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        *fade_effect = Some(effect);
    }

    if let Some(effect) = fade_effect {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_intro(frame: &mut Frame, view: &View<'_>, board: Rect) {
    let theme = view.theme;
    let controller = view.controller;
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("Level {}", controller.level()),
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            controller.level_name().to_string(),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("{} seconds on the clock", controller.config().countdown_secs),
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " Enter / click to start ",
            Style::default().fg(Color::Black).bg(theme.title),
        )),
    ];
    let panel = centered(board, board.width, lines.len() as u16);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(ratatui::widgets::Wrap { trim: true })
        .render(panel, frame.buffer_mut());
}

fn draw_finished(frame: &mut Frame, view: &View<'_>, board: Rect) {
    let theme = view.theme;
    let lines = vec![
        Line::from(Span::styled(
            " Game over ",
            Style::default().fg(Color::Black).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Final score: ", Style::default().fg(theme.title)),
            Span::styled(view.controller.score().to_string(), Style::default().fg(theme.main_fg)),
        ]),
        Line::from(""),
        Line::from(Span::styled("Q to quit", Style::default().fg(theme.inactive_fg))),
    ];
    let panel = centered(board, board.width, lines.len() as u16);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(panel, frame.buffer_mut());
}

fn draw_sidebar(frame: &mut Frame, view: &View<'_>, area: Rect) {
    let theme = view.theme;
    let controller = view.controller;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Stats (border + score, level, name)
            Constraint::Length(1), // gap
            Constraint::Length(4), // Time (border + label + bar)
            Constraint::Length(1), // gap
            Constraint::Min(3),    // Status
        ])
        .split(area);

    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(controller.score().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Level: ", title_style),
            Span::styled(controller.level().to_string(), fg_style),
        ]),
        Line::from(Span::styled(controller.level_name().to_string(), fg_style)),
    ];
    Paragraph::new(ratatui::text::Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    let time_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let time_inner = time_block.inner(chunks[2]);
    time_block.render(chunks[2], frame.buffer_mut());
    let time_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(time_inner);
    let total = controller.config().countdown_secs.max(1);
    let remaining = controller.remaining_seconds();
    let ratio = (f64::from(remaining) / f64::from(total)).clamp(0.0, 1.0);
    let mut label = format!("Time: {remaining}s");
    if controller.deferred_ticks() > 0 {
        label.push_str(" …");
    }
    Paragraph::new(Line::from(Span::styled(label, title_style)))
        .render(time_layout[0], frame.buffer_mut());
    let bar_color = if ratio > 0.6 {
        Color::Green
    } else if ratio > 0.3 {
        Color::Yellow
    } else {
        Color::Red
    };
    Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(bar_color))
        .render(time_layout[1], frame.buffer_mut());

    if let Some(status) = view.status {
        Paragraph::new(Line::from(Span::styled(status.to_string(), fg_style)))
            .wrap(ratatui::widgets::Wrap { trim: true })
            .render(chunks[4], frame.buffer_mut());
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P: Resume    Q: Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    ratatui::widgets::Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}
