use anyhow::{bail, Result};
use clap::Parser;
use ns2as3::model::{AdcApp, Explosion};

mod cli;
mod convert_cmd;
mod coverage_cmd;
mod explode_cmd;
mod path_guard;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Explode(args) => explode_cmd::run_explode(args),
        Command::Convert(args) => convert_cmd::run_convert(args),
        Command::Coverage(args) => coverage_cmd::run_coverage(args),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

/// All applications, or only those named with `--app` in the order given.
fn selected_apps(explosion: &Explosion, names: &[String]) -> Result<Vec<AdcApp>> {
    if names.is_empty() {
        return Ok(explosion.apps().to_vec());
    }
    let missing: Vec<&str> = names
        .iter()
        .filter(|n| explosion.find_app(n).is_none())
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        bail!("unknown application(s): {}", missing.join(", "));
    }
    Ok(names
        .iter()
        .filter_map(|n| explosion.find_app(n).cloned())
        .collect())
}
