//! # Diagnostics
//!
//! Per-run collection of parse and binding errors keyed to 1-based source
//! line numbers. Errors are accumulated, never thrown across component
//! boundaries: recognizers report into a `Diagnostics` and processing
//! continues with the next statement.

use std::fmt;

/// A single user-visible error.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// 1-based line of the statement's first non-empty line.
    pub line: usize,
    /// Human-readable message.
    pub message: String,
    /// The offending statement text, quoted in the rendering.
    pub statement: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Line 0 marks a model-level finding with no source position.
        if self.line == 0 {
            write!(f, "{}", self.message)?;
        } else {
            write!(f, "Line {}: {}", self.line, self.message)?;
        }
        if !self.statement.is_empty() {
            write!(f, "\n    {}", self.statement.trim())?;
        }
        Ok(())
    }
}

/// Error accumulator for one parse session.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
    successes: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    /// Record an error against a statement.
    pub fn error(&mut self, line: usize, message: impl Into<String>, statement: impl Into<String>) {
        self.errors.push(Diagnostic {
            line,
            message: message.into(),
            statement: statement.into(),
        });
    }

    /// Record one successfully processed statement.
    pub fn success(&mut self) {
        self.successes += 1;
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.successes
    }

    /// Hard failure: nothing at all was accepted.
    pub fn is_hard_failure(&self) -> bool {
        self.successes == 0 && !self.errors.is_empty()
    }

    /// Mixed outcome: a partial model exists alongside errors.
    pub fn is_partial(&self) -> bool {
        self.successes > 0 && !self.errors.is_empty()
    }

    /// Render all errors, one `Line N: message` block per error.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for diag in &self.errors {
            out.push_str(&diag.to_string());
            out.push('\n');
        }
        out
    }

    pub fn clear(&mut self) {
        self.errors.clear();
        self.successes = 0;
    }
}
