//! Error types for demolens.
//!
//! Decode-time problems are recoverable and scoped to a single message;
//! query-time "no data" is expressed as `Option`, never as an error.

use thiserror::Error;

/// Result type alias for demolens operations.
pub type Result<T> = std::result::Result<T, DemolensError>;

/// Errors produced while ingesting a protocol stream.
///
/// Every variant is recoverable: the offending message is skipped and the
/// decoder state is left untouched, so ingestion of subsequent messages can
/// continue.
#[derive(Error, Debug)]
pub enum DemolensError {
    /// A message is missing a field its discriminator requires.
    #[error("message is missing required field `{0}`")]
    MissingField(&'static str),

    /// A message could not be decoded against its discriminator.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A shot message referenced a gun index outside the fixed gun table.
    #[error("gun index {0} is outside the gun table")]
    InvalidGun(u32),

    /// A score message referenced a team index other than 1 or 2.
    #[error("team index {0} is not a valid flag-mode team")]
    InvalidTeam(u8),

    /// A history burst nested deeper than the configured cap.
    #[error("history burst nested deeper than {0} levels")]
    BurstTooDeep(usize),
}
