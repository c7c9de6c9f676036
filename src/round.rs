//! Round controller: phases, score, countdown, special markers.
//!
//! Owns the grid and is the only thing that writes to it. Front ends feed it
//! selections, ticks and animation acknowledgements, and drain render batches
//! and events from it.

use std::collections::VecDeque;
use std::time::Instant;

use crate::config::GameConfig;
use crate::error::GridError;
use crate::gravity::{GravityResolver, Resolution};
use crate::grid::{Grid, Position, SpecialKind};
use crate::matcher::MatchFinder;
use crate::random::{RngTileSource, TileSource};
use crate::render::{BatchKind, RenderBatch, RenderSink, TileRenderCommand, TileView};

/// Score multiplier for the key/door gate: `score > level * GATE_SCORE_PER_LEVEL`.
const GATE_SCORE_PER_LEVEL: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    LevelIntro,
    Playing,
    Resolving,
    RoundEnd,
    Finished,
}

/// Where a resolution is waiting for the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolveStep {
    Removing,
    Collapsing,
}

/// Result of a cell selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Interaction disabled (wrong phase, grace period, resolution in flight).
    Ignored,
    /// The seed cell was already empty.
    Empty,
    /// Region too small to remove; carries its size.
    TooSmall(usize),
    /// Region removed; carries its size.
    Removed(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Countdown not running.
    Ignored,
    /// Seconds left after this tick.
    Counted(u32),
    /// Queued behind a resolution; carries the queue length.
    Deferred(u32),
    RoundEnded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEvent {
    LevelIntro { level: u32, name: String },
    RoundStarted { level: u32 },
    Cleared { cells: usize, score: u32 },
    RoundEnded { completed_level: u32, next_level: u32 },
    MarkersPlaced { key: Option<Position>, locked_door: Option<Position> },
    Finished { level: u32, score: u32 },
}

/// Snapshot of everything a front end shows outside the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    pub phase: Phase,
    pub score: u32,
    pub level: u32,
    pub remaining_seconds: u32,
    pub hero: Position,
    pub key: Option<Position>,
    pub locked_door: Option<Position>,
    pub can_interact: bool,
    pub animation_in_flight: bool,
}

/// Whether a level entered with `score` gets a key/door pair.
pub fn difficulty_gate(score: u32, level: u32, level_cap: u32) -> bool {
    score > level.saturating_mul(GATE_SCORE_PER_LEVEL) && level <= level_cap
}

#[derive(Debug)]
pub struct RoundController<S: TileSource = RngTileSource> {
    config: GameConfig,
    grid: Grid,
    finder: MatchFinder,
    source: S,
    phase: Phase,
    step: Option<ResolveStep>,
    /// Size of the region currently being resolved.
    clearing: usize,
    score: u32,
    level: u32,
    remaining: u32,
    timer_running: bool,
    /// Ticks that arrived mid-resolution, replayed in order once it finishes.
    deferred_ticks: u32,
    interact_ready_at: Option<Instant>,
    hero: Position,
    /// Cells still eligible for a special marker, in row-major order.
    candidates: Vec<Position>,
    outbox: VecDeque<RenderBatch>,
    events: Vec<RoundEvent>,
    next_batch_id: u64,
}

impl RoundController<RngTileSource> {
    /// Random board from the config's seed (or OS entropy).
    pub fn from_config(config: GameConfig) -> Result<Self, GridError> {
        let source = RngTileSource::new(config.tile_kinds, config.seed);
        Self::new(config, source)
    }
}

impl<S: TileSource> RoundController<S> {
    pub fn new(config: GameConfig, mut source: S) -> Result<Self, GridError> {
        config.validate()?;
        let grid = Grid::new(config.field_size, config.tile_kinds, &mut source)?;
        Self::with_grid(config, grid, source)
    }

    /// Use a prepared grid. The hero is still placed from `source`.
    pub fn with_grid(config: GameConfig, grid: Grid, mut source: S) -> Result<Self, GridError> {
        config.validate()?;
        if grid.size() != config.field_size {
            return Err(GridError::InvalidConfig(format!(
                "grid is {0}x{0} but field size is {1}",
                grid.size(),
                config.field_size
            )));
        }
        let finder = MatchFinder::new(config.match_threshold)?;
        let mut grid = grid;
        let mut candidates: Vec<Position> = grid.positions().collect();
        let hero = candidates.remove(source.pick_index(candidates.len()));
        grid.set_special(hero.row, hero.col, SpecialKind::Hero)?;

        Ok(Self {
            remaining: config.countdown_secs,
            config,
            grid,
            finder,
            source,
            phase: Phase::Idle,
            step: None,
            clearing: 0,
            score: 0,
            level: 1,
            timer_running: false,
            deferred_ticks: 0,
            interact_ready_at: None,
            hero,
            candidates,
            outbox: VecDeque::new(),
            events: Vec::new(),
            next_batch_id: 0,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn level_name(&self) -> &str {
        self.config.level_names.name_for(self.level)
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining
    }

    pub fn hero(&self) -> Position {
        self.hero
    }

    /// Whether the front end should keep delivering ticks.
    pub fn timer_running(&self) -> bool {
        self.timer_running
    }

    pub fn deferred_ticks(&self) -> u32 {
        self.deferred_ticks
    }

    pub fn animation_in_flight(&self) -> bool {
        self.step.is_some()
    }

    /// The play grid is shown only while a round is live.
    pub fn grid_visible(&self) -> bool {
        matches!(self.phase, Phase::Playing | Phase::Resolving)
    }

    pub fn can_interact(&self, now: Instant) -> bool {
        self.phase == Phase::Playing
            && self.step.is_none()
            && self.interact_ready_at.is_some_and(|t| now >= t)
    }

    pub fn state(&self, now: Instant) -> RoundState {
        RoundState {
            phase: self.phase,
            score: self.score,
            level: self.level,
            remaining_seconds: self.remaining,
            hero: self.hero,
            key: self.grid.find_special(SpecialKind::Key),
            locked_door: self.grid.find_special(SpecialKind::LockedDoor),
            can_interact: self.can_interact(now),
            animation_in_flight: self.animation_in_flight(),
        }
    }

    /// Idle -> LevelIntro. Emits the full board layout.
    pub fn begin(&mut self) {
        if self.phase != Phase::Idle {
            return;
        }
        let commands = self
            .grid
            .iter()
            .map(|(pos, cell)| {
                TileRenderCommand::create(pos, TileView::from(cell), 0, std::time::Duration::ZERO)
            })
            .collect();
        self.push_batch(BatchKind::Layout, commands);
        self.enter_intro();
    }

    /// LevelIntro -> Playing. Starts the countdown; input opens after the grace delay.
    pub fn start(&mut self, now: Instant) {
        if self.phase != Phase::LevelIntro {
            return;
        }
        self.phase = Phase::Playing;
        self.remaining = self.config.countdown_secs;
        self.timer_running = true;
        self.deferred_ticks = 0;
        self.interact_ready_at = Some(now + self.config.grace);
        tracing::info!(level = self.level, "round started");
        self.events.push(RoundEvent::RoundStarted { level: self.level });
    }

    /// Flood-fill from `pos` and remove the region if it is large enough.
    pub fn on_cell_selected(&mut self, pos: Position, now: Instant) -> Result<Selection, GridError> {
        if !self.can_interact(now) {
            return Ok(Selection::Ignored);
        }
        let region = self.finder.find_region(&self.grid, pos)?;
        if region.is_empty() {
            return Ok(Selection::Empty);
        }
        if !self.finder.qualifies(&region) {
            tracing::debug!(%pos, size = region.len(), "region too small");
            return Ok(Selection::TooSmall(region.len()));
        }

        let fade = self.config.fade;
        let commands = region
            .positions()
            .iter()
            .map(|&p| {
                let view = self.grid.at(p).map(TileView::from)?;
                Ok(TileRenderCommand::fade_out(p, view, fade))
            })
            .collect::<Result<Vec<_>, GridError>>()?;
        self.grid.mark_empty(region.positions())?;

        tracing::debug!(%pos, size = region.len(), "region removed");
        self.phase = Phase::Resolving;
        self.step = Some(ResolveStep::Removing);
        self.clearing = region.len();
        self.push_batch(BatchKind::Removal, commands);
        Ok(Selection::Removed(region.len()))
    }

    /// The front end finished playing the last gating batch.
    pub fn on_animation_batch_complete(&mut self) -> Result<(), GridError> {
        match self.step {
            None => tracing::debug!("batch completion with nothing in flight"),
            Some(ResolveStep::Removing) => {
                let resolution = GravityResolver::resolve(&mut self.grid, &mut self.source)?;
                if resolution.is_stable() {
                    self.finish_resolution();
                } else {
                    self.step = Some(ResolveStep::Collapsing);
                    let commands = self.collapse_commands(&resolution);
                    self.push_batch(BatchKind::Collapse, commands);
                }
            }
            Some(ResolveStep::Collapsing) => self.finish_resolution(),
        }
        Ok(())
    }

    /// One countdown second.
    pub fn on_tick(&mut self) -> TickOutcome {
        if !self.timer_running {
            return TickOutcome::Ignored;
        }
        match self.phase {
            Phase::Resolving => {
                self.deferred_ticks += 1;
                tracing::debug!(queued = self.deferred_ticks, "tick deferred behind resolution");
                TickOutcome::Deferred(self.deferred_ticks)
            }
            Phase::Playing => {
                if self.count_down() {
                    TickOutcome::RoundEnded
                } else {
                    TickOutcome::Counted(self.remaining)
                }
            }
            _ => TickOutcome::Ignored,
        }
    }

    /// Hand queued batches to `sink`, oldest first.
    pub fn flush(&mut self, sink: &mut impl RenderSink) {
        while let Some(batch) = self.outbox.pop_front() {
            sink.submit(batch);
        }
    }

    pub fn take_batch(&mut self) -> Option<RenderBatch> {
        self.outbox.pop_front()
    }

    pub fn drain_events(&mut self) -> Vec<RoundEvent> {
        std::mem::take(&mut self.events)
    }

    /// Decrement the countdown; ends the round at zero. Returns true if it ended.
    fn count_down(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.end_round();
            true
        } else {
            false
        }
    }

    fn finish_resolution(&mut self) {
        self.step = None;
        self.score = self.score.saturating_add(self.config.score_per_clear);
        self.events.push(RoundEvent::Cleared {
            cells: std::mem::take(&mut self.clearing),
            score: self.score,
        });
        self.phase = Phase::Playing;

        while self.deferred_ticks > 0 {
            self.deferred_ticks -= 1;
            if self.count_down() {
                break;
            }
        }
    }

    fn end_round(&mut self) {
        let completed = self.level;
        self.level += 1;
        self.phase = Phase::RoundEnd;
        self.remaining = self.config.countdown_secs;
        self.timer_running = false;
        self.deferred_ticks = 0;
        self.interact_ready_at = None;
        self.step = None;
        tracing::info!(completed, score = self.score, "round ended");
        self.events.push(RoundEvent::RoundEnded {
            completed_level: completed,
            next_level: self.level,
        });

        if self.config.max_level.is_some_and(|max| self.level > max) {
            self.phase = Phase::Finished;
            tracing::info!(score = self.score, "game finished");
            self.events.push(RoundEvent::Finished {
                level: completed,
                score: self.score,
            });
            return;
        }
        if difficulty_gate(self.score, self.level, self.config.gate_level_cap) {
            self.place_markers();
        }
        self.enter_intro();
    }

    fn enter_intro(&mut self) {
        self.phase = Phase::LevelIntro;
        let name = self.level_name().to_string();
        tracing::info!(level = self.level, %name, "level intro");
        self.events.push(RoundEvent::LevelIntro {
            level: self.level,
            name,
        });
    }

    /// Place one key and one locked door away from the hero's start cell.
    fn place_markers(&mut self) -> (Option<Position>, Option<Position>) {
        let key = self.place_special(SpecialKind::Key);
        let locked_door = self.place_special(SpecialKind::LockedDoor);
        let commands = [key, locked_door]
            .into_iter()
            .flatten()
            .filter_map(|p| {
                self.grid
                    .at(p)
                    .ok()
                    .map(|c| TileRenderCommand::recolor(p, TileView::from(c)))
            })
            .collect::<Vec<_>>();
        if !commands.is_empty() {
            self.push_batch(BatchKind::Markers, commands);
        }
        tracing::info!(?key, ?locked_door, "markers placed");
        self.events.push(RoundEvent::MarkersPlaced { key, locked_door });
        (key, locked_door)
    }

    /// Draw candidates without replacement until one is clear of the hero.
    fn place_special(&mut self, kind: SpecialKind) -> Option<Position> {
        while !self.candidates.is_empty() {
            let idx = self.source.pick_index(self.candidates.len());
            let pos = self.candidates.remove(idx);
            if pos.is_adjacent(self.hero) {
                continue;
            }
            let free = self
                .grid
                .at(pos)
                .is_ok_and(|c| c.occupied && c.special == SpecialKind::None);
            if free && self.grid.set_special(pos.row, pos.col, kind).is_ok() {
                return Some(pos);
            }
        }
        tracing::warn!(?kind, "no candidate cells left for marker");
        None
    }

    fn collapse_commands(&self, resolution: &Resolution) -> Vec<TileRenderCommand> {
        let per_row = self.config.fall_per_row;
        let mut commands = Vec::with_capacity(resolution.moves.len() + resolution.spawned.len());
        for mv in &resolution.moves {
            let Ok(cell) = self.grid.at(mv.to) else {
                continue;
            };
            let rows = u32::try_from(mv.distance()).unwrap_or(u32::MAX);
            commands.push(TileRenderCommand::move_to(
                mv.from,
                mv.to.row,
                TileView::from(cell),
                per_row * rows,
            ));
        }
        for refill in &resolution.refills {
            // new tiles enter from one row above the stack they form
            let height = refill.count + 1;
            let rows = u32::try_from(height).unwrap_or(u32::MAX);
            for &(pos, tile) in resolution.spawned.iter().filter(|(p, _)| p.col == refill.col) {
                let view = TileView {
                    tile,
                    special: SpecialKind::None,
                };
                commands.push(TileRenderCommand::create(pos, view, height, per_row * rows));
            }
        }
        commands
    }

    fn push_batch(&mut self, kind: BatchKind, commands: Vec<TileRenderCommand>) {
        let id = self.next_batch_id;
        self.next_batch_id += 1;
        self.outbox.push_back(RenderBatch { id, kind, commands });
    }
}
