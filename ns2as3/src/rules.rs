//! Line diagnostic rules.
//!
//! Rules are regex patterns evaluated against each application's raw
//! statement lines. Matches become [`Diagnostic`]s on the application.

use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::diagnostics::{Diagnostic, Severity};

#[derive(Debug, Clone, Deserialize)]
struct RuleEntry {
    code: String,
    severity: Severity,
    pattern: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rule: Vec<RuleEntry>,
}

/// One compiled rule.
#[derive(Debug, Clone)]
pub struct LineRule {
    pub code: String,
    pub severity: Severity,
    pub pattern: Regex,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<LineRule>,
}

#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("failed to read rules file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse rules file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid pattern for rule {code} in {path}: {source}")]
    Pattern {
        path: String,
        code: String,
        source: regex::Error,
    },
}

impl RuleSet {
    pub fn new(rules: Vec<LineRule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Findings for the given lines: one per (rule, matching line).
    pub fn evaluate(&self, lines: &[String]) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for rule in &self.rules {
            for line in lines.iter().filter(|l| rule.pattern.is_match(l)) {
                out.push(Diagnostic::new(
                    rule.severity,
                    rule.code.clone(),
                    format!("{}: {line}", rule.message),
                ));
            }
        }
        out
    }
}

/// Load rules from a TOML file.
pub fn load_rules(path: &Path) -> Result<RuleSet, RuleLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| RuleLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_rules(&raw, path.display().to_string())
}

/// Embedded rules, or the compiled-in set if the embedded file is unusable.
pub fn default_rules() -> RuleSet {
    let embedded = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/mappings/rules.toml"));
    match parse_rules(embedded, "embedded rules".to_string()) {
        Ok(rules) if !rules.is_empty() => rules,
        _ => fallback_rules(),
    }
}

fn parse_rules(raw: &str, path: String) -> Result<RuleSet, RuleLoadError> {
    let parsed: RuleFile = toml::from_str(raw).map_err(|source| RuleLoadError::Parse {
        path: path.clone(),
        source,
    })?;
    let mut rules = Vec::with_capacity(parsed.rule.len());
    for entry in parsed.rule {
        let pattern = Regex::new(&entry.pattern).map_err(|source| RuleLoadError::Pattern {
            path: path.clone(),
            code: entry.code.clone(),
            source,
        })?;
        rules.push(LineRule {
            code: entry.code,
            severity: entry.severity,
            pattern,
            message: entry.message,
        });
    }
    Ok(RuleSet::new(rules))
}

fn fallback_rules() -> RuleSet {
    let entries = [
        (
            "responder_policy",
            r"(?i)^add responder policy ",
            "responder policies need a hand-written iRule or endpoint policy",
        ),
        (
            "rewrite_policy",
            r"(?i)^add rewrite policy ",
            "rewrite policies need a hand-written iRule",
        ),
    ];
    RuleSet::new(
        entries
            .into_iter()
            .filter_map(|(code, pattern, message)| {
                Regex::new(pattern).ok().map(|pattern| LineRule {
                    code: code.to_string(),
                    severity: Severity::Warning,
                    pattern,
                    message: message.to_string(),
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::{default_rules, load_rules, parse_rules, RuleLoadError};
    use crate::diagnostics::Severity;
    use std::fs;

    #[test]
    fn embedded_rules_parse() {
        let embedded = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/mappings/rules.toml"));
        let rules = parse_rules(embedded, "embedded rules".to_string()).expect("parse");
        assert!(rules.len() >= 5);
    }

    #[test]
    fn matches_attach_code_and_line() {
        let rules = default_rules();
        let found = rules.evaluate(&[
            "add lb vserver a HTTP 10.0.0.1 80".to_string(),
            "add responder policy rp1 true DROP".to_string(),
        ]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "responder_policy");
        assert_eq!(found[0].severity, Severity::Warning);
        assert!(found[0].message.ends_with("add responder policy rp1 true DROP"));
    }

    #[test]
    fn bad_pattern_names_the_rule() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rules.toml");
        fs::write(
            &path,
            "[[rule]]\ncode = \"broken\"\nseverity = \"info\"\npattern = \"(\"\nmessage = \"x\"\n",
        )
        .expect("write rules");

        match load_rules(&path).expect_err("should fail") {
            RuleLoadError::Pattern { code, .. } => assert_eq!(code, "broken"),
            other => panic!("unexpected error variant: {other}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_rules(std::path::Path::new("/nope/rules.toml")).expect_err("missing");
        assert!(matches!(err, RuleLoadError::Io { .. }));
    }
}
