//! Error types for address planning.

use thiserror::Error;

/// Result type alias for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Errors that can occur while parsing address blocks or computing a plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Invalid address block: {0}")]
    InvalidBlock(String),

    #[error("Address block {0} has host bits set below its prefix length")]
    Misaligned(String),

    #[error("Address block {block} is too small: prefix /{prefix_len} leaves no room for /{required} tier blocks")]
    BlockTooSmall {
        block: String,
        prefix_len: u8,
        required: u8,
    },

    #[error("Too many zones: {count} requested, at most {max} are supported")]
    TooManyZones { count: usize, max: usize },

    #[error("Duplicate zone: {0}")]
    DuplicateZone(String),
}
