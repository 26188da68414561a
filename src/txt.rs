//! The UltraStar TXT format module.
//!
//! This module consists of three phases: line classification, structure
//! parsing, and chart operations.
//!
//! [`lex`] provides the definition of the line tokens and a classifier from
//! source lines into them. [`parse`] consumes the classified lines in one
//! forward pass and builds a validated [`model::Chart`], rejecting every
//! shape the grammar forbids. [`merge`] and [`title`] operate on parsed
//! charts: they align start offsets, fold single-performer charts into a
//! duet, and derive a shared title. [`unparse`] renders a chart back to
//! CRLF-terminated text.
//!
//! In detail, our policies are:
//!
//! - Support only UTF-8 (as required `&str` to input); a leading BOM is
//!   tolerated and skipped.
//! - Fail on the first structural or semantic violation instead of guessing
//!   at the author's intent.
//! - Do not touch file handles: callers pass source text in and receive
//!   rendered text back.

pub mod lex;
pub mod merge;
pub mod model;
pub mod parse;
pub mod prelude;
pub mod title;
pub mod unparse;

use thiserror::Error;

use self::{
    lex::LexError, merge::MergeError, model::Chart, parse::ParseError, title::TitleError,
};

/// Any failure raised while parsing, merging, or naming charts.
///
/// Structural violations ([`ParseError`]) and semantic violations
/// ([`MergeError`], [`TitleError`]) both land here; neither kind is
/// retried. The process boundary is the sole recovery point.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TxtError {
    /// The input text violated the line grammar.
    #[error("parse: {0}")]
    Parse(#[from] ParseError),
    /// A merge precondition did not hold.
    #[error("merge: {0}")]
    Merge(#[from] MergeError),
    /// No usable shared title or file name could be derived.
    #[error("title: {0}")]
    Title(#[from] TitleError),
}

impl From<LexError> for TxtError {
    fn from(value: LexError) -> Self {
        Self::Parse(value.into())
    }
}

/// Type alias of `core::result::Result<T, TxtError>`.
pub type Result<T> = core::result::Result<T, TxtError>;

/// Parses one chart from source text.
///
/// This function provides a convenient way to go from a file's contents to a
/// [`Chart`] in one step. Line endings may be CRLF or LF.
///
/// # Example
///
/// ```
/// use ultrastar_duet::txt::{merge::merge_all, model::Headers, parse_txt};
///
/// let lead = "#TITLE:Home (Lead)\r\n#BPM:120\r\n#GAP:1000\r\n: 0 2 0 Ho\r\n: 2 2 0 me\r\nE\r\n";
/// let harmony = "#TITLE:Home (Harmony)\r\n#BPM:120\r\n#GAP:1000\r\n: 0 2 0 Ooh\r\nE\r\n";
///
/// let mut overrides = Headers::default();
/// overrides.set("TITLE", "Home (Duet)");
/// let duet = merge_all([parse_txt(lead)?, parse_txt(harmony)?], &overrides)?;
/// assert!(duet.unparse().starts_with("#TITLE:Home (Duet)\r\n"));
/// # Ok::<(), ultrastar_duet::txt::TxtError>(())
/// ```
///
/// # Errors
///
/// Returns a [`ParseError`] when the source violates the chart grammar.
pub fn parse_txt(source: &str) -> Result<Chart> {
    Ok(Chart::parse(source)?)
}
