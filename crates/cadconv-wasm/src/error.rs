//! Error types for the geometry, tokenizing and conversion pipeline.

use thiserror::Error;

/// Errors raised by the arc reconstruction kernel.
///
/// All variants are recoverable at the command level: the plotter records a
/// diagnostic for the offending command and keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// Both arc endpoints coincide, so a sweep angle cannot place a centre.
    #[error("arc endpoints coincide; chord has zero length")]
    DegenerateChord,

    /// The sweep is too close to a whole turn for a finite radius to exist.
    #[error("no finite radius exists for the given sweep")]
    ImaginaryRadius,

    /// No single-quadrant centre candidate matches the start and end points.
    #[error("no single-quadrant centre candidate fits the arc endpoints")]
    AmbiguousQuadrant,

    /// The centre offset places the centre on the start point.
    #[error("arc has zero radius")]
    ZeroRadius,

    /// The sweep angle is NaN or infinite.
    #[error("arc sweep angle is not finite")]
    NonFiniteSweep,
}

/// Errors raised while splitting a command stream into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    /// A `%` parameter block was opened and never closed.
    #[error("unterminated parameter block opened at byte {offset}")]
    UnterminatedBlock {
        /// Byte offset of the opening `%`.
        offset: usize,
    },

    /// Include directives nested deeper than the configured limit.
    #[error("include nesting exceeds depth limit of {depth}")]
    RecursionLimitExceeded {
        /// The depth limit that was hit.
        depth: u32,
    },
}

/// A numeric literal that does not fit the active coordinate format.
///
/// The plotter substitutes zero and records a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed number `{0}`")]
pub struct MalformedNumber(pub String);

/// Errors that abort a whole conversion job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The input contained no data.
    #[error("empty input")]
    EmptyInput,

    /// The input bytes are not valid UTF-8.
    #[error("invalid UTF-8 input: {0}")]
    InvalidUtf8(String),

    /// The top-level command stream could not be tokenized.
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
}
