use nsconf_core::ParseError;
use serde::{Deserialize, Serialize};

/// Severity of an advisory finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One advisory finding, attached to a run or to an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            source: None,
            line: None,
        }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    /// Attach a source location.
    pub fn at(mut self, source: impl Into<String>, line: usize) -> Self {
        self.source = Some(source.into());
        self.line = Some(line);
        self
    }
}

/// Diagnostic codes raised by extraction.
pub mod codes {
    pub const STATEMENT_PARSE: &str = "statement_parse";
    pub const DANGLING_REFERENCE: &str = "dangling_reference";
    pub const DUPLICATE_APPLICATION: &str = "duplicate_application";
    pub const UNRESOLVED_SERVER: &str = "unresolved_server";
}

/// Collector handed to each extraction run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::warn!(
            "{}: {}{}",
            diagnostic.code,
            diagnostic.message,
            location_suffix(&diagnostic)
        );
        self.items.push(diagnostic);
    }

    pub fn statement_error(&mut self, err: &ParseError) {
        self.push(
            Diagnostic::warning(
                codes::STATEMENT_PARSE,
                format!("skipped malformed statement: {} ({})", err.reason, err.text),
            )
            .at(err.source_name.clone(), err.line),
        );
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

fn location_suffix(diagnostic: &Diagnostic) -> String {
    match (&diagnostic.source, diagnostic.line) {
        (Some(source), Some(line)) => format!(" at {source}:{line}"),
        _ => String::new(),
    }
}
