//! Errors raised by the grid core.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// Index outside `[0, size)`. Input translation should make this unreachable.
    #[error("cell ({row}, {col}) is outside the {size}x{size} grid")]
    OutOfBounds { row: usize, col: usize, size: usize },
    /// Rejected at construction: grid too small, no tile kinds, zero threshold, ...
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
