//! tilepop: logic core of a flood-fill tile-matching puzzle.
//!
//! Pick a tile, remove its connected same-type region if it is big enough,
//! let the survivors fall, refill from the top, and score before the countdown
//! runs out. The core never renders and never owns a clock: front ends feed it
//! selections, one-second ticks and animation acknowledgements through
//! [`round::RoundController`], and draw from the [`render::RenderBatch`]es it
//! queues.
//!
//! - [`grid`]: the N×N cell matrix and special markers
//! - [`matcher`]: iterative 4-directional flood fill
//! - [`gravity`]: collapse and refill
//! - [`round`]: phases, score, countdown, key/door placement
//! - [`render`]: render command contract
//! - [`random`]: injectable tile sources
//! - [`config`]: game configuration and level names

pub mod config;
pub mod error;
pub mod gravity;
pub mod grid;
pub mod matcher;
pub mod random;
pub mod render;
pub mod round;

pub use config::{GameConfig, LevelNames};
pub use error::GridError;
pub use gravity::{GravityResolver, Resolution};
pub use grid::{Cell, Grid, Position, SpecialKind};
pub use matcher::{MatchFinder, Region};
pub use random::{RngTileSource, SequenceSource, TileSource};
pub use render::{BatchKind, RenderBatch, RenderOp, RenderSink, TileRenderCommand, TileView};
pub use round::{Phase, RoundController, RoundEvent, RoundState, Selection, TickOutcome};
