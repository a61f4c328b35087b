//! # Validator Protocol
//!
//! The external validator is a long-lived process that parses, type checks
//! and pretty-prints codified VUs. It is driven over a line-oriented protocol
//! where every frame ends with a sentinel line:
//!
//! ```text
//! → VERSIONS / <versions> / <extensions> / VERSIONS-END
//! ← <diagnostics>* / VERSIONS-SUCCESS
//!
//! → FORMAT-VU / <api> / <file> / <line> / <k$v$...> / <text...> / FORMAT-VU-END
//! ← <diagnostics>* / FORMAT-VU / <body>*
//!   / FORMAT-VU-SUCCESS | FORMAT-VU-ELIMINATED | FORMAT-VU-*
//!
//! → EXIT
//! ```
//!
//! ## Modules
//!
//! - **`protocol`**: sentinel literals and field encoding
//! - **`framing`**: read-until-sentinel and write-frame over any line source/sink
//! - **`channel`**: [`ValidatorChannel`], the protocol client over a framed pair
//! - **`process`**: [`ProcessValidator`], a channel bound to a spawned child
//! - **`fake`**: [`FakeValidator`], scripted in-memory verdicts

pub mod channel;
pub mod fake;
pub mod framing;
pub mod process;
pub mod protocol;

use std::time::Duration;

use crate::document::AttributeSet;

pub use crate::document::SourceLocation;
pub use channel::ValidatorChannel;
pub use fake::FakeValidator;
pub use framing::{FramedReader, FramedWriter, LineSource, ReaderLines};
pub use process::{ProcessValidator, ValidatorCommand};

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("I/O error talking to validator: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol framing error: expected {expected}, got {found:?}")]
    Framing {
        expected: &'static str,
        found: String,
    },
    #[error("validator closed its output while awaiting {awaiting}")]
    UnexpectedEof { awaiting: &'static str },
    #[error("validator did not respond within {0:?}")]
    Timeout(Duration),
    #[error("failed to start validator `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("validator channel already terminated")]
    Terminated,
}

/// Reply to the build configuration announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub accepted: bool,
    /// Lines the validator printed before its verdict.
    pub diagnostics: Vec<String>,
}

/// One codified statement to validate and format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRequest {
    /// The API whose refpage the statement belongs to.
    pub api: String,
    pub location: Option<SourceLocation>,
    /// Attributes defined after the document header.
    pub attributes: AttributeSet,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The statement is valid; carries the formatted lines.
    Passed { lines: Vec<String> },
    /// The statement has a semantic error.
    Failed,
    /// The statement does not apply to this build and must be dropped.
    Eliminated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatResponse {
    pub diagnostics: Vec<String>,
    pub verdict: Verdict,
}

impl FormatResponse {
    pub fn passed(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            diagnostics: Vec::new(),
            verdict: Verdict::Passed {
                lines: lines.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn failed(diagnostics: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            diagnostics: diagnostics.into_iter().map(Into::into).collect(),
            verdict: Verdict::Failed,
        }
    }

    pub fn eliminated() -> Self {
        Self {
            diagnostics: Vec::new(),
            verdict: Verdict::Eliminated,
        }
    }

    pub fn with_diagnostics(
        mut self,
        diagnostics: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.diagnostics = diagnostics.into_iter().map(Into::into).collect();
        self
    }
}

/// Request/response interface to a validator instance.
///
/// An instance is configured once, asked to format any number of statements
/// one at a time, and terminated exactly once.
pub trait ValidationService {
    fn configure(
        &mut self,
        versions: &[String],
        extensions: &[String],
    ) -> Result<Handshake, ChannelError>;

    fn format(&mut self, request: &FormatRequest) -> Result<FormatResponse, ChannelError>;

    fn terminate(&mut self) -> Result<(), ChannelError>;
}
