//! Deriving a shared duet title or output name from several inputs.
//!
//! The heuristic takes the longest prefix all inputs share and marks it as a
//! duet. It serves two callers: deriving a `TITLE` header from the
//! per-performer titles, and deriving an output file name from the input
//! file stems.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// A shared prefix must be longer than this many characters to count.
const MIN_PREFIX_CHARS: usize = 5;

/// Opening brackets that get closed again around the duet marker.
const BRACKET_PAIRS: [(char, char); 4] = [('(', ')'), ('[', ']'), ('{', '}'), ('<', '>')];

/// Failure to derive a shared name.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TitleError {
    /// A common prefix needs at least two names.
    #[error("need at least two names to guess a shared title, got {got}")]
    TooFewNames {
        /// How many names were passed.
        got: usize,
    },
    /// No sufficiently long shared prefix exists.
    #[error("no reasonable common substring among {names:?}")]
    NoCommonPrefix {
        /// The names that failed to agree.
        names: Vec<String>,
    },
    /// A path carried no usable file stem.
    #[error("`{}` has no file name to take a stem from", path.display())]
    NoFileStem {
        /// The offending path.
        path: PathBuf,
    },
}

/// Type alias of `core::result::Result<T, TitleError>`.
type Result<T> = core::result::Result<T, TitleError>;

/// Guesses a duet title shared by all `names`.
///
/// The longest prefix (in characters, searched downward from the longest
/// name's length) that every name starts with becomes the base. A base
/// ending in an opening bracket closes around the marker:
/// `"Song ("` becomes `"Song (Duet)"`; any other base gets ` (Duet)`
/// appended.
///
/// # Errors
///
/// Returns a [`TitleError`] with fewer than two names, or when the longest
/// shared prefix is five characters or shorter.
pub fn guess_common_title(names: &[impl AsRef<str>]) -> Result<String> {
    if names.len() < 2 {
        return Err(TitleError::TooFewNames { got: names.len() });
    }
    let longest = names
        .iter()
        .map(|name| name.as_ref().chars().count())
        .max()
        .unwrap_or(0);
    let shared = (MIN_PREFIX_CHARS + 1..=longest)
        .rev()
        .find_map(|len| shared_prefix(names, len))
        .ok_or_else(|| TitleError::NoCommonPrefix {
            names: names.iter().map(|name| name.as_ref().to_owned()).collect(),
        })?;

    let close = shared.chars().next_back().and_then(|last| {
        BRACKET_PAIRS
            .iter()
            .find(|(open, _)| *open == last)
            .map(|(_, close)| *close)
    });
    Ok(match close {
        Some(close) => format!("{shared}Duet{close}"),
        None => format!("{shared} (Duet)"),
    })
}

/// The first `len` characters of the first name, if every name starts with
/// exactly those characters.
fn shared_prefix(names: &[impl AsRef<str>], len: usize) -> Option<String> {
    let mut names = names.iter();
    let first: String = names.next()?.as_ref().chars().take(len).collect();
    if first.chars().count() < len {
        return None;
    }
    names
        .all(|name| name.as_ref().chars().take(len).eq(first.chars()))
        .then_some(first)
}

/// Derives the merged file's path from the input paths: the guessed common
/// name over the file stems, placed next to the first input and carrying its
/// extension.
///
/// # Errors
///
/// Returns a [`TitleError`] when a path has no stem or the stems share no
/// usable prefix.
pub fn guess_output_path(paths: &[impl AsRef<Path>]) -> Result<PathBuf> {
    let stems = paths
        .iter()
        .map(|path| {
            path.as_ref()
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_owned)
                .ok_or_else(|| TitleError::NoFileStem {
                    path: path.as_ref().to_owned(),
                })
        })
        .collect::<Result<Vec<_>>>()?;
    let name = guess_common_title(&stems)?;

    let Some(first) = paths.first().map(AsRef::as_ref) else {
        return Err(TitleError::TooFewNames { got: 0 });
    };
    let file_name = match first.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{name}.{ext}"),
        None => name,
    };
    Ok(first.with_file_name(file_name))
}
