//! Prelude module for the UltraStar TXT crate.
//!
//! Re-exports the public types of the [`txt`](super) module for convenient
//! access: `use ultrastar_duet::txt::prelude::*;`.

pub use super::{
    TxtError,
    lex::{
        LexError,
        cursor::Cursor,
        token::{NOTE_TAGS, NOTE_TOKEN_LIMIT, Token},
    },
    merge::{MergeError, merge_all, reconcile_gaps},
    model::{Chart, Headers, NoteLine, Performers, format_decimal, parse_decimal},
    parse::ParseError,
    parse_txt,
    title::{TitleError, guess_common_title, guess_output_path},
};
