//! Option coverage analysis.
//!
//! Every flag on an application is classified as mapped (consumed by the
//! declaration builder), ignored (listed in the coverage table as having no
//! target equivalent) or unmapped. The score is
//! `mapped / (mapped + unmapped)`; ignored options are left out entirely.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::as3::consumes_option;
use crate::model::AdcApp;

pub const HIGH_THRESHOLD: f64 = 80.0;
pub const MEDIUM_THRESHOLD: f64 = 50.0;
const TOP_UNMAPPED: usize = 10;
const GENERIC_REASON: &str = "no automatic mapping; review manually";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= HIGH_THRESHOLD {
            Confidence::High
        } else if percentage >= MEDIUM_THRESHOLD {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl Display for Confidence {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoveredOption {
    pub option: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmappedOption {
    pub option: String,
    pub value: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageResult {
    pub app: String,
    pub percentage: f64,
    pub confidence: Confidence,
    pub mapped: Vec<CoveredOption>,
    pub unmapped: Vec<UnmappedOption>,
    pub ignored: Vec<CoveredOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmappedCount {
    pub option: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub apps: usize,
    pub average: f64,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub top_unmapped: Vec<UnmappedCount>,
}

#[derive(Debug, Clone, Deserialize)]
struct SuggestionEntry {
    option: String,
    suggestion: String,
}

#[derive(Debug, Deserialize)]
struct CoverageFile {
    #[serde(default)]
    ignore: Vec<String>,
    #[serde(default)]
    suggestion: Vec<SuggestionEntry>,
}

/// Ignorable options and per-option suggestions, keyed case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageTable {
    ignore: Vec<String>,
    suggestions: HashMap<String, String>,
}

impl CoverageTable {
    pub fn new(ignore: Vec<String>, suggestions: HashMap<String, String>) -> Self {
        Self {
            ignore: ignore.iter().map(|o| o.to_ascii_lowercase()).collect(),
            suggestions: suggestions
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
        }
    }

    pub fn is_ignored(&self, option: &str) -> bool {
        let option = option.to_ascii_lowercase();
        self.ignore.iter().any(|o| *o == option)
    }

    pub fn suggestion(&self, option: &str) -> Option<&str> {
        self.suggestions
            .get(&option.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.ignore.is_empty() && self.suggestions.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum TableLoadError {
    #[error("failed to read coverage table {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse coverage table {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Load a coverage table from a TOML file.
pub fn load_coverage_table(path: &Path) -> Result<CoverageTable, TableLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| TableLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_table(&raw, path.display().to_string())
}

/// Embedded coverage table with a compiled-in fallback.
pub fn default_coverage_table() -> CoverageTable {
    let embedded = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/mappings/coverage.toml"
    ));
    match parse_table(embedded, "embedded coverage table".to_string()) {
        Ok(table) if !table.is_empty() => table,
        _ => fallback_table(),
    }
}

fn parse_table(raw: &str, path: String) -> Result<CoverageTable, TableLoadError> {
    let parsed: CoverageFile =
        toml::from_str(raw).map_err(|source| TableLoadError::Parse { path, source })?;
    Ok(CoverageTable::new(
        parsed.ignore,
        parsed
            .suggestion
            .into_iter()
            .map(|s| (s.option, s.suggestion))
            .collect(),
    ))
}

fn fallback_table() -> CoverageTable {
    let ignore = ["-td", "-devno", "-appflowLog", "-soMethod", "-soThreshold"]
        .iter()
        .map(|o| o.to_string())
        .collect();
    let suggestions = [(
        "-cltTimeout",
        "set idleTimeout on a custom TCP profile attached to the service",
    )]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    CoverageTable::new(ignore, suggestions)
}

/// Analyze an application against the embedded table.
pub fn analyze(app: &AdcApp) -> CoverageResult {
    analyze_with(app, &default_coverage_table())
}

pub fn analyze_with(app: &AdcApp, table: &CoverageTable) -> CoverageResult {
    let mut mapped = Vec::new();
    let mut unmapped = Vec::new();
    let mut ignored = Vec::new();

    for (option, value) in app.opts.iter() {
        if !is_flag(option) {
            continue;
        }
        let covered = CoveredOption {
            option: option.to_string(),
            value: value.to_string(),
        };
        if table.is_ignored(option) {
            ignored.push(covered);
        } else if consumes_option(app, option) {
            mapped.push(covered);
        } else {
            let suggestion = table.suggestion(option).map(str::to_string);
            let reason = match suggestion {
                Some(_) => "no automatic mapping; manual follow-up suggested".to_string(),
                None => GENERIC_REASON.to_string(),
            };
            unmapped.push(UnmappedOption {
                option: covered.option,
                value: covered.value,
                reason,
                suggestion,
            });
        }
    }

    let denominator = mapped.len() + unmapped.len();
    let percentage = if denominator == 0 {
        100.0
    } else {
        mapped.len() as f64 * 100.0 / denominator as f64
    };

    CoverageResult {
        app: app.name.clone(),
        percentage,
        confidence: Confidence::from_percentage(percentage),
        mapped,
        unmapped,
        ignored,
    }
}

/// Average score, band counts and the most frequently unmapped options.
pub fn summarize(results: &[CoverageResult]) -> CoverageSummary {
    let mut high = 0;
    let mut medium = 0;
    let mut low = 0;
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

    for result in results {
        match result.confidence {
            Confidence::High => high += 1,
            Confidence::Medium => medium += 1,
            Confidence::Low => low += 1,
        }
        for option in &result.unmapped {
            *counts.entry(option.option.as_str()).or_insert(0) += 1;
        }
    }

    let average = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|r| r.percentage).sum::<f64>() / results.len() as f64
    };

    let mut top: Vec<UnmappedCount> = counts
        .into_iter()
        .map(|(option, count)| UnmappedCount {
            option: option.to_string(),
            count,
        })
        .collect();
    top.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.option.cmp(&b.option)));
    top.truncate(TOP_UNMAPPED);

    CoverageSummary {
        apps: results.len(),
        average,
        high,
        medium,
        low,
        top_unmapped: top,
    }
}

fn is_flag(option: &str) -> bool {
    let mut chars = option.chars();
    chars.next() == Some('-') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::{
        analyze, analyze_with, default_coverage_table, load_coverage_table, summarize, Confidence,
        CoverageTable, TableLoadError,
    };
    use crate::model::{AdcApp, AppType};
    use nsconf_core::OptValue;
    use std::collections::HashMap;
    use std::fs;

    fn app_with(opts: &[(&str, &str)]) -> AdcApp {
        let mut app = AdcApp::new("web", AppType::LoadBalancer, "HTTP");
        for (k, v) in opts {
            app.opts.insert(*k, OptValue::Scalar(v.to_string()));
        }
        app
    }

    #[test]
    fn no_options_scores_full() {
        let result = analyze(&app_with(&[]));
        assert_eq!(result.percentage, 100.0);
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn all_ignored_scores_full() {
        let result = analyze(&app_with(&[("-td", "0"), ("-devno", "12345"), ("-appflowLog", "DISABLED")]));
        assert_eq!(result.percentage, 100.0);
        assert_eq!(result.ignored.len(), 3);
        assert!(result.mapped.is_empty());
    }

    #[test]
    fn mixed_options_score_and_suggest() {
        let result = analyze(&app_with(&[
            ("-lbMethod", "ROUNDROBIN"),
            ("-persistenceType", "SOURCEIP"),
            ("-cltTimeout", "180"),
            ("-td", "0"),
            ("-weirdFlag", "1"),
        ]));
        assert_eq!(result.mapped.len(), 2);
        assert_eq!(result.unmapped.len(), 2);
        assert_eq!(result.percentage, 50.0);
        assert_eq!(result.confidence, Confidence::Medium);

        let clt = &result.unmapped[0];
        assert_eq!(clt.option, "-cltTimeout");
        assert!(clt.suggestion.is_some());
        assert!(result.unmapped[1].suggestion.is_none());
        assert!(result.unmapped[1].reason.contains("review manually"));
    }

    #[test]
    fn content_switch_lb_method_counts_only_without_a_target() {
        let mut cs = AdcApp::new("shop", AppType::ContentSwitch, "HTTP");
        cs.opts
            .insert("-lbMethod", OptValue::Scalar("ROUNDROBIN".to_string()));
        cs.opts
            .insert("-targetLBVserver", OptValue::Scalar("lb1".to_string()));

        let alone = analyze(&cs);
        assert!(alone.mapped.iter().any(|m| m.option == "-lbMethod"));

        cs.apps.push(AdcApp::new("lb1", AppType::LoadBalancer, "HTTP"));
        let delegated = analyze(&cs);
        assert!(delegated.mapped.iter().all(|m| m.option != "-lbMethod"));
        assert!(delegated.unmapped.iter().any(|u| u.option == "-lbMethod"));
        assert!(delegated.mapped.iter().any(|m| m.option == "-targetLBVserver"));
        assert_eq!(delegated.percentage, 50.0);
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(Confidence::from_percentage(80.0), Confidence::High);
        assert_eq!(Confidence::from_percentage(79.9), Confidence::Medium);
        assert_eq!(Confidence::from_percentage(50.0), Confidence::Medium);
        assert_eq!(Confidence::from_percentage(49.0), Confidence::Low);
    }

    #[test]
    fn custom_table_is_case_insensitive() {
        let table = CoverageTable::new(vec!["-FOO".to_string()], HashMap::new());
        let result = analyze_with(&app_with(&[("-foo", "1")]), &table);
        assert_eq!(result.ignored.len(), 1);
    }

    #[test]
    fn summary_ranks_unmapped_options() {
        let results = vec![
            analyze(&app_with(&[("-a1", "x"), ("-b1", "x")])),
            analyze(&app_with(&[("-a1", "x"), ("-lbMethod", "ROUNDROBIN")])),
            analyze(&app_with(&[])),
        ];
        let summary = summarize(&results);
        assert_eq!(summary.apps, 3);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.medium, 1);
        assert_eq!(summary.low, 1);
        assert_eq!(summary.top_unmapped[0].option, "-a1");
        assert_eq!(summary.top_unmapped[0].count, 2);
        assert_eq!(summary.average, 50.0);
    }

    #[test]
    fn embedded_table_loads() {
        let table = default_coverage_table();
        assert!(table.is_ignored("-TD"));
        assert!(table.suggestion("-redirectURL").is_some());
    }

    #[test]
    fn broken_table_is_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("coverage.toml");
        fs::write(&path, "ignore = [\"-td\"").expect("write table");
        assert!(matches!(
            load_coverage_table(&path).expect_err("should fail"),
            TableLoadError::Parse { .. }
        ));
    }
}
