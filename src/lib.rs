//! The parser and duet merger for the UltraStar TXT karaoke chart format.
//!
//! An UltraStar chart is a line-oriented text file carrying `#KEY:VALUE`
//! headers followed by note lines (lyric syllables with pitch and timing in
//! quarter-beat units) and an `E` end marker. This crate parses such files
//! into a structurally validated [`txt::model::Chart`], merges several
//! single-performer charts into one multi-performer duet chart while keeping
//! their musical alignment intact, and renders charts back to text.
//!
//! See the [`txt`] module for the format pipeline.

pub mod txt;
