//! App: terminal init, main loop, countdown ticks, input and animation handling.

use crate::Args;
use crate::animation::Animator;
use crate::input::{Action, key_to_action, mouse_to_action};
use crate::theme::Theme;
use crate::ui::{self, View};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tilepop::{GameConfig, Phase, Position, RoundController, RoundEvent, Selection, TickOutcome};

const SECOND: Duration = Duration::from_secs(1);

pub struct App {
    controller: RoundController,
    animator: Animator,
    theme: Theme,
    cursor: Position,
    paused: bool,
    no_animation: bool,
    frame_duration: Duration,
    /// When the next countdown second is due; `None` while the clock is stopped.
    next_tick: Option<Instant>,
    /// TachyonFX fade for the removal in flight (created when it starts).
    fade_effect: Option<Effect>,
    /// Last time we processed the fade effect (for delta).
    fade_process_time: Option<Instant>,
    /// Frame area of the last draw, for mapping mouse clicks.
    last_area: Rect,
    status: Option<String>,
}

impl App {
    pub fn new(args: &Args, config: GameConfig, theme: Theme) -> Result<Self> {
        let size = config.field_size;
        let mut controller = RoundController::from_config(config)?;
        controller.begin();
        Ok(Self {
            controller,
            animator: Animator::new(size, args.no_animation),
            theme,
            cursor: Position::new(0, 0),
            paused: false,
            no_animation: args.no_animation,
            frame_duration: args.frame_duration(),
            next_tick: None,
            fade_effect: None,
            fade_process_time: None,
            last_area: Rect::default(),
            status: None,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal = DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            if !self.paused {
                self.pump_animations(now)?;
                self.pump_ticks(now)?;
            }
            self.handle_events();

            terminal.draw(|f| {
                self.last_area = f.area();
                let view = View {
                    controller: &self.controller,
                    animator: &self.animator,
                    theme: &self.theme,
                    cursor: self.cursor,
                    paused: self.paused,
                    status: self.status.as_deref(),
                    no_animation: self.no_animation,
                };
                ui::draw(f, &view, &mut self.fade_effect, &mut self.fade_process_time, now);
            })?;

            if self.animator.fading().is_none() {
                self.fade_effect = None;
                self.fade_process_time = None;
            }

            let timeout = self.frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let action = match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => key_to_action(key),
                        Event::Mouse(mouse) => mouse_to_action(mouse),
                        _ => Action::None,
                    };
                    if action == Action::Quit {
                        return Ok(());
                    }
                    self.apply_action(action, Instant::now());
                }
            }
        }
    }

    /// Feed queued batches to the animator and acknowledge the finished ones.
    fn pump_animations(&mut self, now: Instant) -> Result<()> {
        loop {
            self.controller.flush(&mut self.animator);
            let finished = self.animator.update(now);
            if finished == 0 {
                return Ok(());
            }
            for _ in 0..finished {
                self.controller.on_animation_batch_complete()?;
            }
        }
    }

    fn pump_ticks(&mut self, now: Instant) -> Result<()> {
        if !self.controller.timer_running() {
            self.next_tick = None;
            return Ok(());
        }
        let due = *self.next_tick.get_or_insert(now + SECOND);
        if now < due {
            return Ok(());
        }
        self.next_tick = Some(due + SECOND);
        match self.controller.on_tick() {
            TickOutcome::RoundEnded => {
                // pick up the markers batch for the next level
                self.pump_animations(now)?;
            }
            TickOutcome::Deferred(queued) => tracing::trace!(queued, "tick deferred"),
            TickOutcome::Counted(_) | TickOutcome::Ignored => {}
        }
        Ok(())
    }

    /// Turn round events into the sidebar status line.
    fn handle_events(&mut self) {
        for event in self.controller.drain_events() {
            tracing::debug!(?event, "round event");
            match event {
                RoundEvent::Cleared { cells, score } => {
                    self.status = Some(format!("Popped {cells} tiles! Score {score}"));
                }
                RoundEvent::RoundEnded { completed_level, .. } => {
                    self.status = Some(format!("Time! Level {completed_level} done"));
                }
                RoundEvent::MarkersPlaced { key, locked_door } => {
                    if key.is_some() || locked_door.is_some() {
                        self.status = Some("A key and a locked door appeared".into());
                    }
                }
                RoundEvent::Finished { score, .. } => {
                    self.status = Some(format!("Finished with {score} points"));
                }
                RoundEvent::RoundStarted { .. } => self.status = None,
                RoundEvent::LevelIntro { .. } => {}
            }
        }
    }

    fn apply_action(&mut self, action: Action, now: Instant) {
        if self.paused {
            if action == Action::Pause {
                self.paused = false;
                // restart the current second rather than firing a stale tick
                self.next_tick = None;
            }
            return;
        }
        let size = self.controller.grid().size();
        match action {
            Action::Pause => self.paused = true,
            Action::CursorLeft => self.cursor.col = self.cursor.col.saturating_sub(1),
            Action::CursorRight => self.cursor.col = (self.cursor.col + 1).min(size - 1),
            Action::CursorUp => self.cursor.row = self.cursor.row.saturating_sub(1),
            Action::CursorDown => self.cursor.row = (self.cursor.row + 1).min(size - 1),
            Action::Confirm => match self.controller.phase() {
                Phase::LevelIntro => self.controller.start(now),
                _ => self.select(self.cursor, now),
            },
            Action::Click { column, row } => {
                if self.controller.phase() == Phase::LevelIntro {
                    self.controller.start(now);
                    return;
                }
                let board = ui::board_rect(self.last_area, size);
                if let Some(pos) = ui::cell_at(board, size, column, row) {
                    self.cursor = pos;
                    self.select(pos, now);
                }
            }
            Action::Quit | Action::None => {}
        }
    }

    fn select(&mut self, pos: Position, now: Instant) {
        match self.controller.on_cell_selected(pos, now) {
            Ok(Selection::TooSmall(n)) => {
                let needed = self.controller.config().match_threshold + 1;
                self.status = Some(format!("Only {n} connected; need {needed}"));
            }
            Ok(Selection::Removed(_) | Selection::Empty | Selection::Ignored) => {}
            Err(e) => tracing::warn!(error = %e, %pos, "selection rejected"),
        }
    }
}
