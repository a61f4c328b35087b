use super::{
    WORKAROUND_SENTINEL,
    classify::{LineClass, VuLineClassifier},
};

/// Where the transducer is relative to a VU section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionState {
    #[default]
    Outside,
    /// Saw the section title, waiting for the opening delimiter.
    AboutToEnter,
    Inside,
}

/// Line-by-line state machine that pins the workaround sentinel onto the
/// lines of untagged codified VUs.
pub struct WorkaroundTransducer {
    classifier: VuLineClassifier,
    state: SectionState,
    workaround_col: Option<usize>,
}

impl WorkaroundTransducer {
    pub fn new() -> Self {
        Self {
            classifier: VuLineClassifier,
            state: SectionState::Outside,
            workaround_col: None,
        }
    }

    pub fn state(&self) -> SectionState {
        self.state
    }

    /// Column the sentinel is currently inserted at, if the workaround is active.
    pub fn workaround_col(&self) -> Option<usize> {
        self.workaround_col
    }

    /// Consumes one line (without terminator) and returns its transformed form.
    pub fn push(&mut self, line: &str) -> String {
        let class = self.classifier.classify(line);
        self.advance_section(&class);

        if self.state == SectionState::Inside
            && let Some(col) = class.workaround_col
        {
            self.workaround_col = Some(col);
        } else if class.is_list_item {
            // Any other list item ends the previous one
            self.workaround_col = None;
        }

        match self.workaround_col {
            Some(col) => insert_sentinel(line, col),
            None => line.to_string(),
        }
    }

    fn advance_section(&mut self, class: &LineClass) {
        self.state = match self.state {
            _ if class.opens_vu_section => SectionState::AboutToEnter,
            SectionState::AboutToEnter if class.is_delimiter => SectionState::Inside,
            SectionState::Inside if class.is_delimiter => SectionState::Outside,
            state => state,
        };
    }
}

impl Default for WorkaroundTransducer {
    fn default() -> Self {
        Self::new()
    }
}

/// Inserts the sentinel at byte column `col`.
///
/// Lines too short to reach the column are passed through: there is no
/// indentation on them to preserve.
fn insert_sentinel(line: &str, col: usize) -> String {
    if col > line.len() || !line.is_char_boundary(col) {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + WORKAROUND_SENTINEL.len());
    out.push_str(&line[..col]);
    out.push_str(WORKAROUND_SENTINEL);
    out.push_str(&line[col..]);
    out
}
