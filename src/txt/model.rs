//! In-memory representation of one chart and its small mutation operations.

use std::collections::BTreeMap;

use itertools::Itertools;

use super::{Result, merge::MergeError, parse::ParseError};

/// Ordered `key -> value` header mapping with unique keys.
///
/// Insertion order is observable: the serializer writes headers back in the
/// order they first appeared, so this is backed by a plain vector rather
/// than a sorted or hashed map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Looks up a header value by exact key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sets `key` to `value`. An existing key keeps its position; a new key
    /// is appended.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Appends a key that must not exist yet. `line` is the source position
    /// reported on duplicates.
    pub(crate) fn insert_new(
        &mut self,
        key: &str,
        value: &str,
        line: usize,
    ) -> core::result::Result<(), ParseError> {
        if self.contains(key) {
            return Err(ParseError::DuplicateHeader {
                key: key.into(),
                line,
            });
        }
        self.0.push((key.into(), value.into()));
        Ok(())
    }

    /// Iterates the pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no header is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::default();
        for (key, value) in iter {
            headers.set(key, value);
        }
        headers
    }
}

/// One note line: at most five space-separated tokens, the last of which is
/// the lyric and may contain spaces of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoteLine {
    /// The raw tokens. `tokens[0]` is the tag, `tokens[1]` the start time in
    /// quarter-beat units.
    pub tokens: Vec<String>,
}

impl NoteLine {
    /// Builds a note line from borrowed tokens.
    #[must_use]
    pub fn from_tokens(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    /// The start time in quarter-beat units, if the second token holds one.
    #[must_use]
    pub fn start_time(&self) -> Option<i64> {
        self.tokens.get(1)?.parse().ok()
    }

    /// Renders the line back to source form, tokens joined by single spaces.
    #[must_use]
    pub fn render(&self) -> String {
        self.tokens.iter().join(" ")
    }
}

/// The note sections of a chart: a lone unnamed performer, or numbered
/// performer sections. Holding both at once is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Performers {
    /// Single-player chart: the one unnamed performer's note lines.
    Solo(Vec<NoteLine>),
    /// Multi-player chart: performer id to note lines. Ids are whatever
    /// positive integers the source used; they need not be contiguous.
    Duet(BTreeMap<u32, Vec<NoteLine>>),
}

impl Default for Performers {
    fn default() -> Self {
        Self::Solo(Vec::new())
    }
}

/// A parsed chart: its headers and its note sections.
///
/// A chart is built once by fully consuming an input line stream, mutated in
/// place during a merge, and discarded after serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chart {
    /// Header mapping in source order.
    pub headers: Headers,
    /// Note sections.
    pub performers: Performers,
}

impl Chart {
    /// The `TITLE` header, if present.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.headers.get("TITLE")
    }

    /// Whether the chart uses relative timing: a `RELATIVE` header present
    /// with a trimmed value other than `NO`. Relative charts encode
    /// line-to-line deltas, so their notes cannot be uniformly shifted.
    #[must_use]
    pub fn is_relative(&self) -> bool {
        self.headers
            .get("RELATIVE")
            .is_some_and(|value| value.trim() != "NO")
    }

    /// The largest performer id in use, or 0 for a chart without numbered
    /// sections.
    #[must_use]
    pub fn max_player_id(&self) -> u32 {
        match &self.performers {
            Performers::Solo(_) => 0,
            Performers::Duet(sections) => sections.keys().next_back().copied().unwrap_or(0),
        }
    }

    /// Converts a single-player chart into a duet chart whose unnamed
    /// performer becomes performer 1.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::AlreadyDuet`] when the chart already has
    /// numbered sections; promoting twice is an error.
    pub fn promote_to_duet(&mut self) -> core::result::Result<(), MergeError> {
        let Performers::Solo(lines) = &mut self.performers else {
            return Err(MergeError::AlreadyDuet);
        };
        let lines = std::mem::take(lines);
        self.performers = Performers::Duet(BTreeMap::from([(1, lines)]));
        Ok(())
    }

    /// Reads a header as a decimal number. Both `.` and `,` are accepted as
    /// separator; a missing header yields `default`.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::BadNumericHeader`] when the header is present
    /// but not a decimal number.
    pub fn numeric_header(
        &self,
        key: &str,
        default: f64,
    ) -> core::result::Result<f64, MergeError> {
        let Some(raw) = self.headers.get(key) else {
            return Ok(default);
        };
        parse_decimal(raw).ok_or_else(|| MergeError::BadNumericHeader {
            key: key.into(),
            value: raw.into(),
        })
    }

    /// Writes a header in the on-disk decimal shape produced by
    /// [`format_decimal`].
    pub fn set_numeric_header(&mut self, key: &str, value: f64) {
        self.headers.set(key, format_decimal(value));
    }

    /// Shifts the start time of every note line of every performer by
    /// `offset` quarter-beat units. The whole chart is validated before any
    /// line is rewritten, so a failed shift leaves it untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::BadStartTime`] when a note line lacks an
    /// integer start token, or [`MergeError::NegativeStart`] when a shifted
    /// start would fall before the start of the track.
    pub fn shift_notes(&mut self, offset: i64) -> Result<()> {
        let mut moved = Vec::new();
        for line in self.note_lines() {
            let start = line.start_time().ok_or_else(|| ParseError::BadStartTime {
                content: line.render(),
            })?;
            let shifted = start + offset;
            if shifted < 0 {
                return Err(MergeError::NegativeStart { offset, start }.into());
            }
            moved.push(shifted);
        }
        for (line, shifted) in self.note_lines_mut().zip(moved) {
            if let Some(slot) = line.tokens.get_mut(1) {
                *slot = shifted.to_string();
            }
        }
        Ok(())
    }

    /// All note lines in section order.
    pub(crate) fn note_lines(&self) -> Box<dyn Iterator<Item = &NoteLine> + '_> {
        match &self.performers {
            Performers::Solo(lines) => Box::new(lines.iter()),
            Performers::Duet(sections) => Box::new(sections.values().flatten()),
        }
    }

    fn note_lines_mut(&mut self) -> Box<dyn Iterator<Item = &mut NoteLine> + '_> {
        match &mut self.performers {
            Performers::Solo(lines) => Box::new(lines.iter_mut()),
            Performers::Duet(sections) => {
                Box::new(sections.values_mut().flat_map(|lines| lines.iter_mut()))
            }
        }
    }
}

/// Parses a decimal accepting either `.` or `,` as separator.
#[must_use]
pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().replace(',', ".").parse().ok()
}

/// Renders a decimal the way the format stores it: at most eight fractional
/// digits, trailing zeros and a trailing separator stripped, `,` as the
/// separator. Fixed-point rendering, so scientific notation never reaches a
/// file.
#[must_use]
pub fn format_decimal(value: f64) -> String {
    let mut out = format!("{value:.8}");
    while out.ends_with('0') {
        out.pop();
    }
    if out.ends_with('.') {
        out.pop();
    }
    out.replace('.', ",")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Chart, Headers, MergeError, NoteLine, Performers, format_decimal, parse_decimal};

    fn solo_chart(lines: &[&[&str]]) -> Chart {
        Chart {
            headers: Headers::default(),
            performers: Performers::Solo(lines.iter().map(|l| NoteLine::from_tokens(l)).collect()),
        }
    }

    #[test]
    fn headers_keep_insertion_order() {
        let mut headers = Headers::default();
        headers.set("TITLE", "Song");
        headers.set("BPM", "120");
        headers.set("TITLE", "Renamed");

        let pairs: Vec<_> = headers.iter().collect();
        assert_eq!(pairs, vec![("TITLE", "Renamed"), ("BPM", "120")]);
    }

    #[test]
    fn format_decimal_shapes() {
        assert_eq!(format_decimal(1000.0), "1000");
        assert_eq!(format_decimal(120.5), "120,5");
        assert_eq!(format_decimal(0.12345678), "0,12345678");
        assert_eq!(format_decimal(0.123456789), "0,12345679");
        assert_eq!(format_decimal(-3.25), "-3,25");
    }

    #[test]
    fn numeric_header_roundtrips_either_separator() {
        let mut chart = Chart::default();
        chart.headers.set("GAP", "1234.5");
        assert_eq!(chart.numeric_header("GAP", 0.0), Ok(1234.5));

        chart.set_numeric_header("GAP", 1234.5);
        assert_eq!(chart.headers.get("GAP"), Some("1234,5"));
        assert_eq!(chart.numeric_header("GAP", 0.0), Ok(1234.5));

        assert_eq!(chart.numeric_header("BPM", 290.0), Ok(290.0));
    }

    #[test]
    fn numeric_header_rejects_garbage() {
        let mut chart = Chart::default();
        chart.headers.set("GAP", "soon");
        assert_eq!(
            chart.numeric_header("GAP", 0.0),
            Err(MergeError::BadNumericHeader {
                key: "GAP".into(),
                value: "soon".into(),
            })
        );
    }

    #[test]
    fn promote_moves_solo_lines_to_player_one() {
        let mut chart = solo_chart(&[&[":", "0", "2", "5", "la"]]);
        chart.promote_to_duet().unwrap();

        let Performers::Duet(sections) = &chart.performers else {
            panic!("expected duet sections");
        };
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[&1][0].render(), ": 0 2 5 la");
        assert_eq!(chart.promote_to_duet(), Err(MergeError::AlreadyDuet));
    }

    #[test]
    fn shift_moves_every_start_and_nothing_else() {
        let mut chart = solo_chart(&[
            &[":", "0", "2", "5", "one two"],
            &["*", "4", "2", "7", "three"],
            &["-", "8"],
        ]);
        chart.shift_notes(4).unwrap();

        let Performers::Solo(lines) = &chart.performers else {
            panic!("expected solo lines");
        };
        let rendered: Vec<_> = lines.iter().map(NoteLine::render).collect();
        assert_eq!(rendered, vec![": 4 2 5 one two", "* 8 2 7 three", "- 12"]);
    }

    #[test]
    fn failed_shift_leaves_chart_untouched() {
        let mut chart = solo_chart(&[&[":", "3", "2", "5", "ok"], &[":", "x", "2", "5", "bad"]]);
        let before = chart.clone();
        assert!(chart.shift_notes(1).is_err());
        assert_eq!(chart, before);

        let mut chart = solo_chart(&[&[":", "3", "2", "5", "ok"], &[":", "1", "2", "5", "low"]]);
        let before = chart.clone();
        assert!(chart.shift_notes(-2).is_err());
        assert_eq!(chart, before);
    }

    #[test]
    fn relative_flag_reads() {
        let mut chart = Chart::default();
        assert!(!chart.is_relative());
        chart.headers.set("RELATIVE", "NO");
        assert!(!chart.is_relative());
        chart.headers.set("RELATIVE", "YES");
        assert!(chart.is_relative());
    }

    #[test]
    fn parse_decimal_accepts_comma() {
        assert_eq!(parse_decimal("1500,25"), Some(1500.25));
        assert_eq!(parse_decimal(" 120 "), Some(120.0));
        assert_eq!(parse_decimal("12,5,0"), None);
    }
}
