use colored::Colorize;

use crate::as3::BulkBuild;
use crate::coverage::{Confidence, CoverageResult, CoverageSummary};
use crate::diagnostics::{Diagnostic, Severity};
use crate::model::{AdcApp, AppType, Explosion};

/// Render an explosion for terminal output.
pub fn render_explosion(explosion: &Explosion) -> String {
    let stats = &explosion.stats;
    let mut out = vec![format!(
        "hostname={} version={}{} statements={} apps={} parse_errors={}",
        explosion.hostname.as_deref().unwrap_or("-"),
        stats.source_version,
        if stats.version_assumed { " (assumed)" } else { "" },
        stats.statements,
        stats.apps,
        stats.parse_errors,
    )
    .cyan()
    .to_string()];

    for app in explosion.apps() {
        out.push(render_app_line(app));
        let b = &app.bindings;
        let members: usize = b.service_groups.iter().map(|g| g.servers.len()).sum();
        out.push(format!(
            "  services={} groups={} members={} certs={} policies={} lines={}",
            b.services.len(),
            b.service_groups.len(),
            members,
            b.certs.len(),
            b.policies.len(),
            app.lines().len()
        ));
        for nested in &app.apps {
            out.push(format!("  -> {}", nested.name));
        }
        for diag in &app.diagnostics {
            out.push(format!("  {}", render_diagnostic(diag)));
        }
    }

    if !explosion.diagnostics.is_empty() {
        out.push(String::new());
        out.push("Diagnostics".bold().to_string());
        for diag in &explosion.diagnostics {
            out.push(render_diagnostic(diag));
        }
    }

    out.join("\n")
}

fn render_app_line(app: &AdcApp) -> String {
    let address = match (&app.ip_address, &app.port) {
        (Some(ip), Some(port)) => format!("{ip}:{port}"),
        _ => "-".to_string(),
    };
    let label = format!("{:<15}", app.app_type.as_str());
    let label = match app.app_type {
        AppType::LoadBalancer => label.green(),
        AppType::ContentSwitch => label.blue(),
        AppType::GlobalTraffic => label.magenta(),
    };
    format!("{label} {} {} {address}", app.name, app.protocol)
}

fn render_diagnostic(diag: &Diagnostic) -> String {
    let location = match (&diag.source, diag.line) {
        (Some(source), Some(line)) => format!(" ({source}:{line})"),
        _ => String::new(),
    };
    let text = format!("[{}] {}{location}", diag.code, diag.message);
    match diag.severity {
        Severity::Error => text.red().to_string(),
        Severity::Warning => text.yellow().to_string(),
        Severity::Info => text,
    }
}

fn colored_confidence(confidence: Confidence) -> String {
    match confidence {
        Confidence::High => confidence.as_str().green().to_string(),
        Confidence::Medium => confidence.as_str().yellow().to_string(),
        Confidence::Low => confidence.as_str().red().to_string(),
    }
}

/// Render one coverage result for terminal output.
pub fn render_coverage_text(result: &CoverageResult) -> String {
    let mut out = vec![format!(
        "{} coverage={:.1}% confidence={}",
        result.app.bold(),
        result.percentage,
        colored_confidence(result.confidence)
    )];
    for opt in &result.mapped {
        out.push(format!("  {} {} {}", "MAPPED".green(), opt.option, opt.value));
    }
    for opt in &result.unmapped {
        let hint = opt
            .suggestion
            .as_deref()
            .map(|s| format!(" hint: {s}"))
            .unwrap_or_default();
        out.push(format!(
            "  {} {} {} ({}){hint}",
            "UNMAPPED".red(),
            opt.option,
            opt.value,
            opt.reason
        ));
    }
    for opt in &result.ignored {
        out.push(format!("  {} {}", "IGNORED".dimmed(), opt.option));
    }
    out.join("\n")
}

/// Render one coverage result as a markdown section.
pub fn render_coverage_markdown(result: &CoverageResult) -> String {
    let mut out = vec![
        format!("## {}", result.app),
        String::new(),
        format!(
            "Coverage: **{:.1}%** ({} confidence)",
            result.percentage, result.confidence
        ),
        String::new(),
    ];
    if result.mapped.is_empty() && result.unmapped.is_empty() && result.ignored.is_empty() {
        out.push("_No options._".to_string());
        return out.join("\n");
    }

    out.push("| Option | Value | Status | Notes |".to_string());
    out.push("|---|---|---|---|".to_string());
    for opt in &result.mapped {
        out.push(format!(
            "| `{}` | {} | mapped | |",
            opt.option,
            escape_cell(&opt.value)
        ));
    }
    for opt in &result.unmapped {
        let notes = opt.suggestion.as_deref().unwrap_or(&opt.reason);
        out.push(format!(
            "| `{}` | {} | unmapped | {} |",
            opt.option,
            escape_cell(&opt.value),
            escape_cell(notes)
        ));
    }
    for opt in &result.ignored {
        out.push(format!(
            "| `{}` | {} | ignored | |",
            opt.option,
            escape_cell(&opt.value)
        ));
    }
    out.join("\n")
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

/// Render the batch summary for terminal output.
pub fn render_coverage_summary(summary: &CoverageSummary) -> String {
    let mut out = vec![format!(
        "apps={} average={:.1}% high={} medium={} low={}",
        summary.apps, summary.average, summary.high, summary.medium, summary.low
    )
    .cyan()
    .to_string()];
    if !summary.top_unmapped.is_empty() {
        out.push("Top unmapped options".bold().to_string());
        for entry in &summary.top_unmapped {
            out.push(format!("  {:>4}  {}", entry.count, entry.option));
        }
    }
    out.join("\n")
}

/// Render per-application bulk build outcomes.
pub fn render_bulk(bulk: &BulkBuild) -> String {
    let mut out = Vec::new();
    for entry in &bulk.results {
        match (&entry.tenant, &entry.error) {
            (_, Some(err)) => out.push(format!("{} {}: {err}", "FAIL".red(), entry.app)),
            (Some(tenant), None) => {
                out.push(format!("{} {} -> {tenant}", "OK".green(), entry.app))
            }
            (None, None) => out.push(format!("{} {}", "OK".green(), entry.app)),
        }
    }
    out.push(
        format!("succeeded={} failed={}", bulk.succeeded, bulk.failed)
            .cyan()
            .to_string(),
    );
    out.join("\n")
}
