//! Error types for restriction evaluation.

use thiserror::Error;

/// Reasons a stored configuration cannot drive restrictions.
///
/// Any of these disables the feature at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No category has been selected for restriction.
    #[error("no restricted categories configured")]
    NoRestrictedCategories,

    /// Start or end time is blank.
    #[error("restriction {0} time is missing")]
    MissingTime(&'static str),

    /// Start or end time is not a valid HH:MM value.
    #[error(transparent)]
    InvalidTime(#[from] TimeParseError),

    /// Start and end resolve to the same time of day.
    #[error("restriction start and end are both {0}")]
    EmptyWindow(String),
}

/// Failure to parse an "HH:MM" string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time of day {input:?}: {reason}")]
pub struct TimeParseError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

/// Failure reported by the catalog collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The catalog backend could not be reached.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    /// The catalog answered with an error.
    #[error("catalog lookup failed: {0}")]
    Failed(String),
}

/// Failure while rendering a warning template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A placeholder refers to an argument that was not supplied.
    #[error("placeholder %{position}$ refers to a missing argument ({available} supplied)")]
    MissingArgument { position: usize, available: usize },

    /// A conversion other than `s` or a malformed placeholder.
    #[error("unsupported conversion at byte {0}")]
    UnsupportedConversion(usize),

    /// The template ends in the middle of a placeholder.
    #[error("template ends inside a placeholder")]
    Truncated,

    /// The content filter rejected the rendered message.
    #[error("content filter failed: {0}")]
    Filter(String),
}

/// Errors surfaced by the evaluator's fallible internals.
///
/// These never escape the public boundary methods, which log and fail open.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Catalog lookup failure.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Template rendering failure.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Result type for evaluator internals.
pub type Result<T> = std::result::Result<T, CoreError>;
