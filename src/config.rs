//! Game configuration and the level name table.

use std::time::Duration;

use crate::error::GridError;
use crate::grid::{MAX_TILE_KINDS, MIN_FIELD_SIZE};

/// Seconds on the countdown at the start of every round.
pub const DEFAULT_COUNTDOWN_SECS: u32 = 10;

/// Display names for levels 1..=10, with a fallback past the end of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelNames {
    names: Vec<String>,
    fallback: String,
}

impl Default for LevelNames {
    fn default() -> Self {
        Self::new(
            [
                "Off to a Flying Start",
                "Twin Paths Open",
                "Third Time Lucky",
                "Four Seasons of Spring",
                "Five Blessings",
                "Smooth Sailing",
                "Seven Voices at Once",
                "Eight Immortals Cross the Sea",
                "All Returns to One",
                "Perfectly Smooth",
            ],
            "Unbeatable: you have mastered every level",
        )
    }
}

impl LevelNames {
    pub fn new<I, S>(names: I, fallback: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            fallback: fallback.into(),
        }
    }

    /// Name for a 1-based level number.
    pub fn name_for(&self, level: u32) -> &str {
        level
            .checked_sub(1)
            .and_then(|i| self.names.get(i as usize))
            .map_or(self.fallback.as_str(), String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Grid is `field_size` x `field_size`.
    pub field_size: usize,
    /// Number of ordinary tile types (K).
    pub tile_kinds: u8,
    /// A region must be strictly larger than this to be removed.
    pub match_threshold: usize,
    pub countdown_secs: u32,
    /// Input stays disabled this long after a round starts.
    pub grace: Duration,
    /// Flat award per completed match-and-resolve cycle.
    pub score_per_clear: u32,
    /// Key/door pairs are only placed up to this level.
    pub gate_level_cap: u32,
    /// Finish after this level; `None` plays forever.
    pub max_level: Option<u32>,
    pub fade: Duration,
    pub fall_per_row: Duration,
    pub seed: Option<u64>,
    pub level_names: LevelNames,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            field_size: 8,
            tile_kinds: 4,
            match_threshold: crate::matcher::DEFAULT_THRESHOLD,
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            grace: Duration::from_millis(500),
            score_per_clear: 10,
            gate_level_cap: 10,
            max_level: None,
            fade: Duration::from_millis(300),
            fall_per_row: Duration::from_millis(50),
            seed: None,
            level_names: LevelNames::default(),
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), GridError> {
        if self.field_size < MIN_FIELD_SIZE {
            return Err(GridError::InvalidConfig(format!(
                "field size {} is below the minimum of {MIN_FIELD_SIZE}",
                self.field_size
            )));
        }
        if self.tile_kinds == 0 || self.tile_kinds > MAX_TILE_KINDS {
            return Err(GridError::InvalidConfig(format!(
                "tile kinds must be in 1..={MAX_TILE_KINDS}, got {}",
                self.tile_kinds
            )));
        }
        if self.match_threshold == 0 {
            return Err(GridError::InvalidConfig(
                "match threshold must be at least 1".into(),
            ));
        }
        if self.countdown_secs == 0 {
            return Err(GridError::InvalidConfig(
                "countdown must be at least one second".into(),
            ));
        }
        if self.max_level == Some(0) {
            return Err(GridError::InvalidConfig("max level must be at least 1".into()));
        }
        Ok(())
    }
}
