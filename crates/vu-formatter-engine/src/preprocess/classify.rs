use crate::codified::is_codified;

/// Title line that announces a VU section (`.Valid Usage`, `.Valid Usage (Implicit)`).
pub const VU_TITLE_PREFIX: &str = ".Valid Usage";
/// Delimiter line that opens and closes the sidebar holding the VUs.
pub const SIDEBAR_DELIMITER: &str = "****";

const LIST_MARKER: char = '*';
const TAG_OPENER: char = '[';
const COMMENT_MARKER: char = '#';

/// Classification of a single line containing only local facts.
///
/// Each line is classified independently; the transducer combines these facts
/// with its section state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineClass {
    /// The line starts with the VU section title.
    pub opens_vu_section: bool,
    /// The line is exactly the sidebar delimiter.
    pub is_delimiter: bool,
    /// First non-whitespace character is a list marker (any nesting level).
    pub is_list_item: bool,
    /// Byte column of the statement text if this line opens an untagged
    /// codified VU that needs the workaround.
    pub workaround_col: Option<usize>,
}

/// Classifies individual lines for the workaround transducer.
pub struct VuLineClassifier;

impl VuLineClassifier {
    /// Classifies a line (without terminator) into a [`LineClass`].
    pub fn classify(&self, line: &str) -> LineClass {
        let trimmed = line.trim_start();

        LineClass {
            opens_vu_section: line.starts_with(VU_TITLE_PREFIX),
            is_delimiter: line == SIDEBAR_DELIMITER,
            is_list_item: trimmed.starts_with(LIST_MARKER),
            workaround_col: Self::untagged_vu_column(line),
        }
    }

    /// Finds the content column of a top-level list item holding an untagged
    /// codified VU.
    ///
    /// The item must use a single `*` (more is a nested list), its content must
    /// not start with an identifier tag, and the content must either be
    /// codified or start with a codified comment.
    fn untagged_vu_column(line: &str) -> Option<usize> {
        let trimmed = line.trim_start();
        let after_marker = trimmed.strip_prefix(LIST_MARKER)?;
        if after_marker.starts_with(LIST_MARKER) {
            return None;
        }

        let content = after_marker.trim_start();
        let first = content.chars().next()?;
        if first == TAG_OPENER {
            return None;
        }
        if first != COMMENT_MARKER && !is_codified(content) {
            return None;
        }

        Some(line.len() - content.len())
    }
}
