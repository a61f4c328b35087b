use std::fmt;

use crate::document::{AttributeSet, SourceLocation};

/// A codified statement the validator rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFailure {
    pub api: String,
    pub location: Option<SourceLocation>,
    pub attributes: AttributeSet,
    pub text: String,
    pub diagnostics: Vec<String>,
}

impl fmt::Display for StatementFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.diagnostics {
            writeln!(f, "{line}")?;
        }
        writeln!(
            f,
            "ERROR: Build failure with codified VU (see previous messages) (attributes are: {})",
            self.attributes
        )?;
        writeln!(
            f,
            "ERROR: NOTE: included files are not tracked; the location may be the including file."
        )?;
        match &self.location {
            Some(location) => writeln!(
                f,
                "ERROR: Offending VU of `{}` near {location} is:",
                self.api
            )?,
            None => writeln!(f, "ERROR: Offending VU of `{}` is:", self.api)?,
        }
        write!(f, "{}", self.text)
    }
}

/// Outcome of one rewrite run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Codified statements sent to the validator.
    pub codified: usize,
    pub passed: usize,
    pub eliminated: usize,
    /// Items left untouched because they are not codified.
    pub legacy: usize,
    pub failures: Vec<StatementFailure>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.succeeded() { 0 } else { 1 }
    }
}
