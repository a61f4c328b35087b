//! # vu-formatter-engine
//!
//! Extracts codified Valid Usage (VU) statements from a specification
//! document, round-trips each one through an external validator, and splices
//! the validated text back into the document tree.
//!
//! ## Pipeline
//!
//! ```text
//! raw lines → preprocess → (external parser) → Document → rewrite → Document
//!                                                  │
//!                                       validator (configure, format*, EXIT)
//! ```
//!
//! - [`preprocess`] repairs list-item indentation before the document is parsed
//! - [`document`] is the tree the external parser hands over, plus attribute replay
//! - [`build`] derives the versions and extensions being built
//! - [`validator`] speaks the sentinel-framed line protocol
//! - [`rewrite`] walks the tree and applies each verdict

pub mod build;
pub mod codified;
pub mod document;
pub mod io;
pub mod preprocess;
pub mod rewrite;
pub mod validator;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use build::{AttributeClassifier, BuildConfiguration};
pub use codified::is_codified;
pub use document::{AttributeEntry, AttributeSet, AttributeTracker, Document, Node, NodeKind};
pub use io::*;
pub use rewrite::{RunReport, StatementFailure, VuError, process_document};
pub use validator::{
    ChannelError, FormatRequest, FormatResponse, ProcessValidator, SourceLocation,
    ValidationService, ValidatorCommand, Verdict,
};
