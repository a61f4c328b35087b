//! # Indentation Workaround
//!
//! The document parser swallows the indentation of continuation lines that
//! follow a list item's first line. For a VU without an identifier tag the
//! statement starts right after the `*`, so
//!
//! ```text
//!   * codified-vu
//!       require(a)
//!         and(b)
//! ```
//!
//! comes back from the parser with every continuation line flush left. To keep
//! the relative indentation, the transducer pins a sentinel token at the
//! statement's content column on every line of the item:
//!
//! ```text
//!   * WORKAROUNDcodified-vu
//!     WORKAROUND  require(a)
//!     WORKAROUND    and(b)
//! ```
//!
//! The rewriter removes the sentinel again once the item text is extracted.
//!
//! ## Phases
//!
//! 1. **Line Classification** (`classify`): local facts about one line
//!    (section title, delimiter, list marker, workaround column)
//! 2. **Transduction** (`transducer`): a small state machine that decides which
//!    lines get the sentinel
//!
//! ## Key Invariants
//!
//! - Output has exactly as many lines as input, in the same order
//! - Lines outside a VU section are never touched
//! - Stripping the sentinel from the output reproduces the input

pub mod classify;
pub mod lines;
pub mod transducer;

use xi_rope::Rope;

pub use classify::{LineClass, SIDEBAR_DELIMITER, VU_TITLE_PREFIX, VuLineClassifier};
pub use transducer::{SectionState, WorkaroundTransducer};

use lines::lines_with_endings;

/// Token inserted at the content column of workaround lines.
pub const WORKAROUND_SENTINEL: &str = "WORKAROUND";

/// Runs the transducer over a sequence of lines (without line endings).
pub fn preprocess_lines<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut transducer = WorkaroundTransducer::new();
    lines
        .into_iter()
        .map(|line| transducer.push(line.as_ref()))
        .collect()
}

/// Runs the transducer over a whole text, preserving every line ending.
pub fn preprocess_text(text: &str) -> String {
    let rope = Rope::from(text);
    let mut transducer = WorkaroundTransducer::new();
    let mut out = String::with_capacity(text.len());

    for line in lines_with_endings(&rope) {
        out.push_str(&transducer.push(line.content()));
        out.push_str(line.ending());
    }

    out
}

/// Removes the workaround sentinel from every line of `text`.
///
/// Only a sentinel sitting where the transducer puts one is removed: after
/// leading whitespace, optionally preceded by a single `*` list marker. The
/// token elsewhere in a line is statement text and stays. A line whose
/// original content already began with the token is indistinguishable from a
/// marked one and loses it.
pub fn strip_workaround(text: &str) -> String {
    text.split_inclusive('\n').map(strip_line).collect()
}

fn strip_line(line: &str) -> String {
    let Some(idx) = line.find(WORKAROUND_SENTINEL) else {
        return line.to_string();
    };
    let prefix = line[..idx].trim_start();
    let at_column = match prefix.strip_prefix('*') {
        Some(rest) => !rest.starts_with('*') && rest.trim().is_empty(),
        None => prefix.is_empty(),
    };
    if !at_column {
        return line.to_string();
    }
    let mut stripped = String::with_capacity(line.len() - WORKAROUND_SENTINEL.len());
    stripped.push_str(&line[..idx]);
    stripped.push_str(&line[idx + WORKAROUND_SENTINEL.len()..]);
    stripped
}
