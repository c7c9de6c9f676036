//! Terminal render sink: keeps the displayed board and plays batches over time.
//!
//! The displayed board lags the core's grid on purpose: it only catches up
//! when a batch finishes, which is when the core gets its acknowledgement.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tilepop::{BatchKind, Position, RenderBatch, RenderOp, RenderSink, TileView};

/// A tile drawn between cells while it falls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub tile: TileView,
    pub col: usize,
    /// Fractional row; negative while still above the board.
    pub row: f32,
}

#[derive(Debug)]
pub struct Animator {
    size: usize,
    board: Vec<Option<TileView>>,
    queue: VecDeque<RenderBatch>,
    active: Option<(RenderBatch, Instant)>,
    /// Finish every batch the moment it starts (`--no-animation`).
    instant: bool,
}

impl RenderSink for Animator {
    fn submit(&mut self, batch: RenderBatch) {
        self.queue.push_back(batch);
    }
}

impl Animator {
    pub fn new(size: usize, instant: bool) -> Self {
        Self {
            size,
            board: vec![None; size * size],
            queue: VecDeque::new(),
            active: None,
            instant,
        }
    }

    /// Advance playback. Returns how many gating batches finished, each of which
    /// the caller must acknowledge to the controller.
    pub fn update(&mut self, now: Instant) -> usize {
        let mut finished = 0;
        loop {
            if let Some((batch, started)) = &self.active {
                let done = self.instant || now.saturating_duration_since(*started) >= batch.longest();
                if !done {
                    return finished;
                }
                if let Some((batch, _)) = self.active.take() {
                    self.apply(&batch);
                    finished += 1;
                }
                continue;
            }
            let Some(batch) = self.queue.pop_front() else {
                return finished;
            };
            if batch.kind.awaits_completion() {
                tracing::trace!(id = batch.id, kind = ?batch.kind, "batch started");
                self.active = Some((batch, now));
            } else {
                self.apply(&batch);
            }
        }
    }

    fn index(&self, pos: Position) -> Option<usize> {
        (pos.row < self.size && pos.col < self.size).then(|| pos.row * self.size + pos.col)
    }

    /// Bring the displayed board to the batch's end state.
    fn apply(&mut self, batch: &RenderBatch) {
        // clear every move source before writing targets; a target may be another move's source
        for cmd in &batch.commands {
            if matches!(cmd.op, RenderOp::Move | RenderOp::FadeOut) {
                if let Some(i) = self.index(cmd.position) {
                    self.board[i] = None;
                }
            }
        }
        for cmd in &batch.commands {
            let target = match cmd.op {
                RenderOp::Create | RenderOp::Recolor => cmd.position,
                RenderOp::Move => match cmd.target_row {
                    Some(row) => Position::new(row, cmd.position.col),
                    None => continue,
                },
                RenderOp::FadeOut => continue,
            };
            if let Some(i) = self.index(target) {
                self.board[i] = Some(cmd.tile);
            }
        }
    }

    fn collapse(&self) -> Option<(&RenderBatch, Instant)> {
        self.active
            .as_ref()
            .filter(|(b, _)| b.kind == BatchKind::Collapse)
            .map(|(b, t)| (b, *t))
    }

    /// Static tile at `pos`, or `None` if empty or currently in flight.
    pub fn cell(&self, pos: Position) -> Option<TileView> {
        let tile = self.index(pos).and_then(|i| self.board[i])?;
        if let Some((batch, _)) = self.collapse() {
            let moving = batch
                .commands
                .iter()
                .any(|c| c.op == RenderOp::Move && c.position == pos);
            if moving {
                return None;
            }
        }
        Some(tile)
    }

    /// Falling tiles at their current interpolated rows.
    pub fn sprites(&self, now: Instant) -> Vec<Sprite> {
        let Some((batch, started)) = self.collapse() else {
            return Vec::new();
        };
        let elapsed = now.saturating_duration_since(started);
        batch
            .commands
            .iter()
            .filter_map(|cmd| {
                let t = progress(elapsed, cmd.duration);
                let (from, to) = match cmd.op {
                    RenderOp::Move => (cmd.position.row as f32, cmd.target_row? as f32),
                    RenderOp::Create => (
                        cmd.position.row as f32 - cmd.spawn_height as f32,
                        cmd.position.row as f32,
                    ),
                    _ => return None,
                };
                Some(Sprite {
                    tile: cmd.tile,
                    col: cmd.position.col,
                    row: from + (to - from) * t,
                })
            })
            .collect()
    }

    /// Cells fading out right now, with the fade length.
    pub fn fading(&self) -> Option<(Vec<Position>, Duration)> {
        let (batch, _) = self.active.as_ref()?;
        if batch.kind != BatchKind::Removal {
            return None;
        }
        Some((
            batch.commands.iter().map(|c| c.position).collect(),
            batch.longest(),
        ))
    }
}

fn progress(elapsed: Duration, total: Duration) -> f32 {
    if total.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / total.as_secs_f32()).clamp(0.0, 1.0)
}
