use anyhow::{Context, Result};
use ns2as3::coverage::{analyze_with, default_coverage_table, load_coverage_table, summarize};
use ns2as3::explode::explode;
use ns2as3::report::{render_coverage_markdown, render_coverage_summary, render_coverage_text};
use serde_json::json;

use crate::cli::{CoverageArgs, CoverageFormat};

pub fn run_coverage(args: CoverageArgs) -> Result<()> {
    let table = match &args.mappings_file {
        Some(path) => load_coverage_table(path)?,
        None => default_coverage_table(),
    };
    let explosion = explode(&args.input)
        .with_context(|| format!("failed to explode {}", args.input.display()))?;
    let apps = crate::selected_apps(&explosion, &args.apps)?;

    let results: Vec<_> = apps.iter().map(|app| analyze_with(app, &table)).collect();
    let summary = summarize(&results);

    match args.format {
        CoverageFormat::Text => {
            for result in &results {
                println!("{}", render_coverage_text(result));
            }
            println!();
            println!("{}", render_coverage_summary(&summary));
        }
        CoverageFormat::Markdown => {
            println!("# Coverage report");
            println!();
            println!(
                "{} applications, average coverage {:.1}% (high {}, medium {}, low {})",
                summary.apps, summary.average, summary.high, summary.medium, summary.low
            );
            for result in &results {
                println!();
                println!("{}", render_coverage_markdown(result));
            }
        }
        CoverageFormat::Json => {
            let report = json!({ "results": results, "summary": summary });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
