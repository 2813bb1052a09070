//! Parser error kinds. Every variant carries enough context to
//! build a caret diagnostic from the source text and a byte offset.

use thiserror::Error;

/// A SPARQL parse failure. Parsing is single-shot: on error, partial parser
/// state is discarded and no [`crate::Statement`] is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A specific token was expected but a different one was found.
    #[error("expected {expected} but found {found:?} at byte {position}")]
    UnexpectedToken {
        /// Human-readable description of what was expected.
        expected: String,
        /// Debug rendering of the token actually found.
        found: String,
        /// Byte offset into the source text.
        position: usize,
    },
    /// Input ended while more tokens were expected.
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    /// A production-specific syntax error with a free-form message.
    #[error("invalid syntax at byte {position}: {msg}")]
    InvalidSyntax {
        /// Description of the problem.
        msg: String,
        /// Byte offset into the source text.
        position: usize,
    },
    /// An IRI reference or prefixed name failed to resolve or is malformed.
    #[error("invalid IRI at byte {position}: {msg}")]
    InvalidIri {
        /// Description of the problem.
        msg: String,
        /// Byte offset into the source text.
        position: usize,
    },
    /// A recognized but unimplemented grammar production (e.g. a future
    /// SPARQL version's keyword).
    #[error("unsupported feature at byte {position}: {feature}")]
    UnsupportedFeature {
        /// Name of the feature.
        feature: String,
        /// Byte offset into the source text.
        position: usize,
    },
}

/// Result alias for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;
