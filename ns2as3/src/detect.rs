use std::sync::OnceLock;

use nsconf_core::{Statement, Verb};
use regex::Regex;
use serde::Serialize;

/// Most recent dialect version this tool understands.
pub const LATEST_KNOWN_VERSION: &str = "14.1";

/// Detected dialect version with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDetection {
    pub value: String,
    /// Build string following the version banner, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    pub source: String,
    pub confidence: String,
    /// True when the version was not found and the latest dialect was assumed.
    pub assumed: bool,
}

fn banner_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?m)^#NS(\d+\.\d+)(?:\s+Build\s+(\S+))?").ok())
        .as_ref()
}

/// Detect the dialect version from the `#NS<major>.<minor> Build <b>` banner.
pub fn detect_version(source_name: &str, content: &str) -> VersionDetection {
    if let Some(caps) = banner_pattern().and_then(|re| re.captures(content)) {
        return VersionDetection {
            value: caps[1].to_string(),
            build: caps.get(2).map(|m| m.as_str().to_string()),
            source: format!("{source_name} banner"),
            confidence: "high".to_string(),
            assumed: false,
        };
    }

    VersionDetection {
        value: LATEST_KNOWN_VERSION.to_string(),
        build: None,
        source: "not found".to_string(),
        confidence: "low".to_string(),
        assumed: true,
    }
}

/// Hostname from `set ns hostName <name>`, last one wins.
pub fn detect_hostname(statements: &[Statement]) -> Option<String> {
    statements
        .iter()
        .filter(|s| s.is(Verb::Set, "ns hostName"))
        .filter_map(|s| s.name().map(|n| n.trim_matches('"').to_string()))
        .last()
}
