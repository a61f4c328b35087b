use xi_rope::Rope;

/// A single line of the source with its terminator split off.
#[derive(Debug, Clone)]
pub struct RawLine {
    text: String,
    content_len: usize,
}

impl RawLine {
    fn new(text: String) -> Self {
        let content_len = text.trim_end_matches(['\r', '\n']).len();
        Self { text, content_len }
    }

    /// The line without its terminator.
    pub fn content(&self) -> &str {
        &self.text[..self.content_len]
    }

    /// The terminator (`"\n"`, `"\r\n"`, or empty for a final unterminated line).
    pub fn ending(&self) -> &str {
        &self.text[self.content_len..]
    }
}

/// Returns an iterator over lines, keeping their terminators.
///
/// Uses `lines_raw` so that concatenating `content() + ending()` for every
/// line reproduces the rope byte for byte.
pub fn lines_with_endings(rope: &Rope) -> impl Iterator<Item = RawLine> + '_ {
    rope.lines_raw(..).map(|line| RawLine::new(line.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lossless_split() {
        let text = "a\r\nb\n\nc";
        let rope = Rope::from(text);
        let rebuilt: String = lines_with_endings(&rope)
            .map(|l| format!("{}{}", l.content(), l.ending()))
            .collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn endings_are_separated() {
        let rope = Rope::from("a\r\nb");
        let lines: Vec<_> = lines_with_endings(&rope).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].content(), "a");
        assert_eq!(lines[0].ending(), "\r\n");
        assert_eq!(lines[1].content(), "b");
        assert_eq!(lines[1].ending(), "");
    }
}
