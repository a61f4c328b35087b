//! Sentinel literals and field encodings shared by both ends of the protocol.

use crate::document::{AttributeSet, SourceLocation};

pub const VERSIONS: &str = "VERSIONS";
pub const VERSIONS_END: &str = "VERSIONS-END";
pub const VERSIONS_SUCCESS: &str = "VERSIONS-SUCCESS";
pub const FORMAT_VU: &str = "FORMAT-VU";
pub const FORMAT_VU_END: &str = "FORMAT-VU-END";
pub const FORMAT_VU_SUCCESS: &str = "FORMAT-VU-SUCCESS";
pub const FORMAT_VU_ELIMINATED: &str = "FORMAT-VU-ELIMINATED";
pub const EXIT: &str = "EXIT";

/// File field sent when the parser could not tell where a statement came from.
pub const UNKNOWN_FILE: &str = "<unknown source location>";
pub const UNKNOWN_LINE: u32 = 0;

pub const ATTRIBUTE_SEPARATOR: &str = "$";

/// `a$1$b$2` for `{a: 1, b: 2}`.
pub fn encode_attributes(attributes: &AttributeSet) -> String {
    attributes
        .iter()
        .flat_map(|(k, v)| [k, v])
        .collect::<Vec<_>>()
        .join(ATTRIBUTE_SEPARATOR)
}

/// The file and line fields of a format request.
pub fn encode_location(location: Option<&SourceLocation>) -> (String, String) {
    match location {
        Some(loc) => (loc.file.clone(), loc.line.to_string()),
        None => (UNKNOWN_FILE.to_string(), UNKNOWN_LINE.to_string()),
    }
}
