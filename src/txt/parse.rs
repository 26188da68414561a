//! Parsing a [`Chart`] from classified source lines.
//!
//! Raw [`str`] == [`lex`](super::lex) ==> [`Token`] per line ==
//! [`parse`](self) ==> [`Chart`]
//!
//! The parser drives the cursor itself: one forward pass, no backtracking,
//! stopping at the first structural violation.

use std::collections::BTreeMap;

use thiserror::Error;

use super::{
    lex::{LexError, cursor::Cursor, token::Token},
    model::{Chart, Headers, NoteLine, Performers, format_decimal, parse_decimal},
};

/// A structural violation of the chart grammar.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParseError {
    /// A line failed to classify.
    #[error(transparent)]
    Lex(#[from] LexError),
    /// The same header key appeared twice.
    #[error("duplicate header `{key}` at line {line}")]
    DuplicateHeader {
        /// The repeated key.
        key: String,
        /// The 1-based line number of the repetition.
        line: usize,
    },
    /// The same player number opened two sections.
    #[error("duplicate player section P{number} at line {line}")]
    DuplicatePlayer {
        /// The repeated player number.
        number: u32,
        /// The 1-based line number of the repetition.
        line: usize,
    },
    /// A non-blank line appeared after the end marker.
    #[error("content after end marker at line {line}")]
    TrailingContent {
        /// The 1-based line number of the trailing content.
        line: usize,
    },
    /// The source ended without an `E` line.
    #[error("missing end marker `E`")]
    MissingEnd,
    /// Notes appeared both before and inside `P` sections.
    #[error("chart mixes sectionless notes with player sections")]
    MixedMode,
    /// A note line without a readable start time was asked to move.
    #[error("note line has no integer start time: `{content}`")]
    BadStartTime {
        /// The offending note line, rendered.
        content: String,
    },
}

/// Type alias of `core::result::Result<T, ParseError>`.
pub(crate) type Result<T> = core::result::Result<T, ParseError>;

/// Headers whose values are normalized to the storage shape when they parse
/// as decimals.
const NUMERIC_KEYS: [&str; 2] = ["GAP", "BPM"];

impl Chart {
    /// Parses a whole chart source in one forward pass.
    ///
    /// Note lines before any `P` marker belong to the unnamed performer;
    /// lines after one belong to the opened section. A source may use one
    /// style or the other, never both. Exactly one `E` marker must close the
    /// body, as the final content-bearing line.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`] encountered; nothing past it is
    /// consumed.
    pub fn parse(source: &str) -> Result<Self> {
        let mut cursor = Cursor::new(source);
        let mut headers = Headers::default();
        let mut body = Vec::new();
        let mut sections: BTreeMap<u32, Vec<NoteLine>> = BTreeMap::new();
        let mut active = None;
        let mut closed = false;

        while let Some(line) = cursor.next_content_line() {
            let number = cursor.line();
            if closed {
                return Err(ParseError::TrailingContent { line: number });
            }
            match Token::parse(line, number)? {
                Token::Header { key, value } => {
                    let normalized = NUMERIC_KEYS
                        .contains(&key)
                        .then(|| parse_decimal(value))
                        .flatten()
                        .map(format_decimal);
                    headers.insert_new(key, normalized.as_deref().unwrap_or(value), number)?;
                }
                Token::PlayerStart(id) => {
                    if sections.contains_key(&id) {
                        return Err(ParseError::DuplicatePlayer {
                            number: id,
                            line: number,
                        });
                    }
                    sections.insert(id, Vec::new());
                    active = Some(id);
                }
                Token::Note(tokens) => {
                    let note = NoteLine::from_tokens(&tokens);
                    match active {
                        Some(id) => sections.entry(id).or_default().push(note),
                        None => body.push(note),
                    }
                }
                Token::End => closed = true,
            }
        }

        if !closed {
            return Err(ParseError::MissingEnd);
        }
        if !body.is_empty() && !sections.is_empty() {
            return Err(ParseError::MixedMode);
        }
        let performers = if sections.is_empty() {
            Performers::Solo(body)
        } else {
            Performers::Duet(sections)
        };
        Ok(Self {
            headers,
            performers,
        })
    }
}
