//! Application extraction ("explosion").
//!
//! The pipeline is strictly phased so definition order in the source never
//! matters:
//!
//! 1. parse every config source, recording malformed statements
//! 2. index statements by subject ([`index`])
//! 3. define applications, attach binds, resolve members and monitors ([`apps`])
//! 4. resolve content-switch references over the finished list ([`references`])
//! 5. evaluate line rules and compute stats

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use nsconf_core::{parse_config, Statement};
use thiserror::Error;
use uuid::Uuid;

use crate::detect::detect_hostname;
use crate::diagnostics::Diagnostics;
use crate::loader::{self, LoadError, LoadedConfig};
use crate::model::{AdcApp, ExplodedConfig, Explosion, PhaseTimings};
use crate::rules::{default_rules, RuleSet};

mod apps;
pub(crate) mod index;
mod references;
mod stats;

pub use apps::BUILTIN_MONITORS;

#[derive(Debug, Error)]
pub enum ExplodeError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("no applications found in {path}")]
    NoApplicationsFound { path: String },
}

/// Load and explode a config file or archive.
pub fn explode(path: &Path) -> Result<Explosion, ExplodeError> {
    explode_with_rules(path, &default_rules())
}

pub fn explode_with_rules(path: &Path, rules: &RuleSet) -> Result<Explosion, ExplodeError> {
    let started = Instant::now();
    let loaded = loader::load(path)?;
    explode_loaded(loaded, elapsed_ms(started), rules)
}

/// Explode configuration text already in memory.
pub fn explode_text(name: &str, text: &str) -> Result<Explosion, ExplodeError> {
    let started = Instant::now();
    let loaded = loader::load_text(name, text)?;
    explode_loaded(loaded, elapsed_ms(started), &default_rules())
}

/// Explode an already loaded source set. `load_ms` is reported in stats.
pub fn explode_loaded(
    loaded: LoadedConfig,
    load_ms: f64,
    rules: &RuleSet,
) -> Result<Explosion, ExplodeError> {
    let mut diags = Diagnostics::new();

    let started = Instant::now();
    let mut statements = Vec::new();
    let mut parse_errors = 0;
    for source in loaded.config_sources() {
        let parsed = parse_config(&source.content, &source.name);
        for err in &parsed.errors {
            diags.statement_error(err);
        }
        parse_errors += parsed.errors.len();
        statements.extend(parsed.statements);
    }
    let parse_ms = elapsed_ms(started);
    log::debug!(
        "parsed {} statements ({parse_errors} malformed) in {parse_ms:.2}ms",
        statements.len()
    );

    let started = Instant::now();
    let mut apps = build_apps(&statements, &mut diags);
    for app in &mut apps {
        let found = rules.evaluate(app.lines());
        app.diagnostics.extend(found);
    }
    let explode_ms = elapsed_ms(started);
    log::debug!("built {} applications in {explode_ms:.2}ms", apps.len());

    if apps.is_empty() {
        let path = loaded
            .sources
            .first()
            .map(|s| s.name.clone())
            .unwrap_or_default();
        return Err(ExplodeError::NoApplicationsFound { path });
    }

    let timings = PhaseTimings {
        load_ms,
        parse_ms,
        explode_ms,
    };
    let stats = stats::compute(&statements, parse_errors, &apps, &loaded.version, timings);

    Ok(Explosion {
        id: Uuid::new_v4().to_string(),
        date_time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        hostname: detect_hostname(&statements),
        input_file_type: loaded.file_type,
        config: ExplodedConfig {
            sources: loaded.sources,
            apps,
        },
        stats,
        diagnostics: diags.into_vec(),
    })
}

/// Build every application from parsed statements.
///
/// Reference resolution runs only after all applications are complete.
pub fn build_apps(statements: &[Statement], diags: &mut Diagnostics) -> Vec<AdcApp> {
    let index = index::ConfigIndex::build(statements);
    let mut apps = apps::define(&index, diags);
    for app in &mut apps {
        apps::attach(app, &index, diags);
    }
    references::resolve(&mut apps, diags);
    apps
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Insertion-ordered line accumulator without duplicates.
#[derive(Debug, Default)]
pub(crate) struct LineSet {
    lines: Vec<String>,
    seen: HashSet<String>,
}

impl LineSet {
    pub fn push(&mut self, line: &str) {
        if self.seen.insert(line.to_string()) {
            self.lines.push(line.to_string());
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        self.lines
    }
}

impl From<Vec<String>> for LineSet {
    fn from(lines: Vec<String>) -> Self {
        let mut set = LineSet::default();
        for line in &lines {
            set.push(line);
        }
        set
    }
}
