//! Rendering a [`Chart`] back into UltraStar TXT text.

use super::model::{Chart, Performers};

/// The line ending of the format on output. Input accepts bare LF too.
const LINE_ENDING: &str = "\r\n";

impl Chart {
    /// Renders the chart: headers in retained insertion order, note sections
    /// with their `P` markers, and the `E` end marker, every line
    /// CRLF-terminated. Pure rendering; nothing is re-validated.
    #[must_use]
    pub fn unparse(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.headers.iter() {
            out.push('#');
            out.push_str(key);
            out.push(':');
            out.push_str(value);
            out.push_str(LINE_ENDING);
        }
        match &self.performers {
            Performers::Solo(lines) => {
                for line in lines {
                    out.push_str(&line.render());
                    out.push_str(LINE_ENDING);
                }
            }
            Performers::Duet(sections) => {
                for (id, lines) in sections {
                    out.push('P');
                    out.push_str(&id.to_string());
                    out.push_str(LINE_ENDING);
                    for line in lines {
                        out.push_str(&line.render());
                        out.push_str(LINE_ENDING);
                    }
                }
            }
        }
        out.push('E');
        out.push_str(LINE_ENDING);
        out
    }
}
