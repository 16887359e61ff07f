use std::fs;

use anyhow::{bail, Context, Result};
use ns2as3::as3::{build_bulk, load_options, BuildOptions};
use ns2as3::explode::explode;
use ns2as3::report::render_bulk;

use crate::cli::ConvertArgs;
use crate::path_guard;

pub fn run_convert(args: ConvertArgs) -> Result<()> {
    if let Some(out) = &args.output {
        path_guard::ensure_output_not_input(out, &args.input)?;
    }

    let opts = resolve_options(&args)?;
    let explosion = explode(&args.input)
        .with_context(|| format!("failed to explode {}", args.input.display()))?;
    let apps = crate::selected_apps(&explosion, &args.apps)?;

    let bulk = build_bulk(&apps, &opts);
    let Some(declaration) = &bulk.declaration else {
        eprintln!("{}", render_bulk(&bulk));
        bail!("no application could be converted");
    };
    let rendered = serde_json::to_string_pretty(declaration)?;

    match &args.output {
        Some(out) => {
            fs::write(out, format!("{rendered}\n"))
                .with_context(|| format!("failed to write declaration {}", out.display()))?;
            println!("{}", render_bulk(&bulk));
            println!("wrote {}", out.display());
        }
        None => {
            println!("{rendered}");
            eprintln!("{}", render_bulk(&bulk));
        }
    }

    Ok(())
}

fn resolve_options(args: &ConvertArgs) -> Result<BuildOptions> {
    let mut opts = match &args.options_file {
        Some(path) => load_options(path)?,
        None => BuildOptions::default(),
    };
    if let Some(prefix) = &args.tenant_prefix {
        opts.tenant_prefix = prefix.clone();
    }
    if let Some(version) = &args.schema_version {
        opts.schema_version = version.clone();
    }
    if args.no_protocol_port {
        opts.include_protocol_port = false;
    }
    if args.skip_tls {
        opts.skip_tls = true;
    }
    Ok(opts)
}
