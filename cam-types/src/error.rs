//! Error types for camlink identifiers.

use thiserror::Error;

/// Errors produced when parsing a camera identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Identifier was empty.
    #[error("camera id must not be empty")]
    Empty,

    /// Identifier exceeded the maximum length.
    #[error("camera id too long: {len} chars (max {max})")]
    TooLong {
        /// Actual length.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// Identifier contained a character outside `[A-Za-z0-9_-]`.
    #[error("camera id contains invalid character {0:?}")]
    InvalidChar(char),
}
