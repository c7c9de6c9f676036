//! Render contract between the core and whatever draws the board.
//!
//! The controller queues [`RenderBatch`]es; a front end drains them through
//! [`RenderSink`], plays them, and reports back with
//! `RoundController::on_animation_batch_complete` once the last command of a
//! gating batch has finished.

use std::time::Duration;

use crate::grid::{Cell, Position, SpecialKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOp {
    Create,
    Move,
    FadeOut,
    Recolor,
}

/// What a tile looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileView {
    pub tile: u8,
    pub special: SpecialKind,
}

impl From<&Cell> for TileView {
    fn from(cell: &Cell) -> Self {
        Self {
            tile: cell.tile,
            special: cell.special,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRenderCommand {
    pub op: RenderOp,
    /// Source cell for Move; the affected cell otherwise.
    pub position: Position,
    pub tile: TileView,
    /// Destination row (Move only).
    pub target_row: Option<usize>,
    /// Create only: rows above `position` where the new tile enters.
    pub spawn_height: usize,
    pub duration: Duration,
}

impl TileRenderCommand {
    pub fn create(position: Position, tile: TileView, spawn_height: usize, duration: Duration) -> Self {
        Self {
            op: RenderOp::Create,
            position,
            tile,
            target_row: None,
            spawn_height,
            duration,
        }
    }

    pub fn move_to(from: Position, to_row: usize, tile: TileView, duration: Duration) -> Self {
        Self {
            op: RenderOp::Move,
            position: from,
            tile,
            target_row: Some(to_row),
            spawn_height: 0,
            duration,
        }
    }

    pub fn fade_out(position: Position, tile: TileView, duration: Duration) -> Self {
        Self {
            op: RenderOp::FadeOut,
            position,
            tile,
            target_row: None,
            spawn_height: 0,
            duration,
        }
    }

    pub fn recolor(position: Position, tile: TileView) -> Self {
        Self {
            op: RenderOp::Recolor,
            position,
            tile,
            target_row: None,
            spawn_height: 0,
            duration: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// Whole-board snapshot (game start).
    Layout,
    /// Special markers placed or recoloured.
    Markers,
    /// Matched tiles fading out.
    Removal,
    /// Surviving tiles falling plus refills dropping in.
    Collapse,
}

impl BatchKind {
    /// Removal and collapse hold interaction until the sink acknowledges them.
    pub fn awaits_completion(self) -> bool {
        matches!(self, Self::Removal | Self::Collapse)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderBatch {
    pub id: u64,
    pub kind: BatchKind,
    pub commands: Vec<TileRenderCommand>,
}

impl RenderBatch {
    /// Time until the last command of the batch finishes.
    pub fn longest(&self) -> Duration {
        self.commands
            .iter()
            .map(|c| c.duration)
            .max()
            .unwrap_or(Duration::ZERO)
    }
}

pub trait RenderSink {
    fn submit(&mut self, batch: RenderBatch);
}

/// Collects batches; handy for headless runs and tests.
impl RenderSink for Vec<RenderBatch> {
    fn submit(&mut self, batch: RenderBatch) {
        self.push(batch);
    }
}
