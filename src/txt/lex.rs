//! Line classifier of the UltraStar TXT format.
//!
//! Raw [`str`] == [`lex`](self) ==> [`Token`](token::Token) per line ==
//! [`parse`](super::parse) ==> [`Chart`](super::model::Chart)

pub mod cursor;
pub mod token;

use thiserror::Error;

/// An error occurred when classifying a source line.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LexError {
    /// The line matched no rule of the grammar.
    #[error("unrecognized line {line}: `{content}`")]
    UnknownLine {
        /// The offending line, ending stripped.
        content: String,
        /// The 1-based line number.
        line: usize,
    },
    /// A `P` marker was not followed by a positive base-10 player number.
    #[error("invalid player number `{found}` at line {line}")]
    BadPlayerNumber {
        /// What stood after the `P`, trimmed.
        found: String,
        /// The 1-based line number.
        line: usize,
    },
}

/// Type alias of `core::result::Result<T, LexError>`.
pub(crate) type Result<T> = core::result::Result<T, LexError>;
