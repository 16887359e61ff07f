use anyhow::{Context, Result};
use ns2as3::explode::explode_with_rules;
use ns2as3::report::render_explosion;
use ns2as3::rules::{default_rules, load_rules};

use crate::cli::{ExplodeArgs, OutputFormat};

pub fn run_explode(args: ExplodeArgs) -> Result<()> {
    let rules = match &args.rules_file {
        Some(path) => load_rules(path)?,
        None => default_rules(),
    };
    let explosion = explode_with_rules(&args.input, &rules)
        .with_context(|| format!("failed to explode {}", args.input.display()))?;

    match args.format {
        OutputFormat::Text => {
            println!("{}", render_explosion(&explosion));
            if args.lines {
                for app in explosion.apps() {
                    println!();
                    println!("# {}", app.name);
                    for line in app.lines() {
                        println!("{line}");
                    }
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&explosion)?),
    }

    Ok(())
}
