//! SQL/PGQ parser error kinds. Mirrors [`kg_query::ParseError`]'s
//! shape so callers handle both frontends uniformly; kept as its own enum
//! because SQL's grammar surfaces distinct productions (`GRAPH_TABLE` edge
//! patterns, `WITH`/CTE, join trees) that don't map onto SPARQL's variants.

use thiserror::Error;

/// A SQL or SQL/PGQ parse failure. Parsing is single-shot: on error no
/// [`crate::Statement`] is produced.
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
    /// `GRAPH_TABLE`'s edge pattern state machine saw
    /// brackets following an arrow head, which is not a legal edge shape.
    #[error("malformed edge pattern at byte {position}: brackets must precede the arrow head")]
    MalformedEdgePattern {
        /// Byte offset into the source text.
        position: usize,
    },
    /// A recognized but unimplemented grammar production.
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
