//! Cursor over the lines of a chart source.

/// Tracks the read position in a chart source and yields one line at a time.
///
/// Both CRLF and LF line endings are accepted; the ending is stripped from
/// every yielded line. A UTF-8 BOM at the very start of the source is
/// skipped.
pub struct Cursor<'a> {
    /// 1-based number of the line most recently yielded.
    line: usize,
    /// The unread remainder of the source.
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor at the head of `source`.
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            line: 0,
            rest: source.strip_prefix('\u{feff}').unwrap_or(source),
        }
    }

    /// The 1-based number of the line last returned, or 0 before the first.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// Yields the next line with its ending stripped, or `None` at the end
    /// of the source.
    pub fn next_line(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        self.line += 1;
        let (line, rest) = match self.rest.find('\n') {
            Some(at) => (&self.rest[..at], &self.rest[at + 1..]),
            None => (self.rest, ""),
        };
        self.rest = rest;
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    /// Yields the next non-blank line, skipping empty and whitespace-only
    /// lines.
    pub fn next_content_line(&mut self) -> Option<&'a str> {
        while let Some(line) = self.next_line() {
            if !line.trim().is_empty() {
                return Some(line);
            }
        }
        None
    }
}

#[test]
fn lines_with_mixed_endings() {
    let mut cursor = Cursor::new("#TITLE:Hello\r\n#ARTIST:Foo\n: 0 1 2 bar\r\nE");

    assert_eq!(cursor.next_line(), Some("#TITLE:Hello"));
    assert_eq!(cursor.next_line(), Some("#ARTIST:Foo"));
    assert_eq!(cursor.next_line(), Some(": 0 1 2 bar"));
    assert_eq!(cursor.next_line(), Some("E"));
    assert_eq!(cursor.next_line(), None);
    assert_eq!(cursor.line(), 4);
}

#[test]
fn blank_lines_are_skipped() {
    let mut cursor = Cursor::new("#BPM:120\r\n\r\n   \r\nE\r\n");

    assert_eq!(cursor.next_content_line(), Some("#BPM:120"));
    assert_eq!(cursor.line(), 1);
    assert_eq!(cursor.next_content_line(), Some("E"));
    assert_eq!(cursor.line(), 4);
    assert_eq!(cursor.next_content_line(), None);
}

#[test]
fn bom_is_stripped() {
    let mut cursor = Cursor::new("\u{feff}#TITLE:Bom\nE");

    assert_eq!(cursor.next_line(), Some("#TITLE:Bom"));
    assert_eq!(cursor.next_line(), Some("E"));
}

#[test]
fn no_trailing_newline() {
    let mut cursor = Cursor::new("E");

    assert_eq!(cursor.next_line(), Some("E"));
    assert_eq!(cursor.next_line(), None);
}
