use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "ns2as3")]
#[command(about = "Extract NetScaler applications and convert them into AS3 declarations")]
pub struct Cli {
    /// Debug logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Extract every application from a config file or archive.
    Explode(ExplodeArgs),
    /// Build an AS3 declaration from the extracted applications.
    Convert(ConvertArgs),
    /// Report which application options map to AS3.
    Coverage(CoverageArgs),
}

#[derive(Parser, Debug)]
pub struct ExplodeArgs {
    /// ns.conf, .tgz or .tar bundle.
    pub input: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Print each application's attributed statements.
    #[arg(long)]
    pub lines: bool,
    /// Line diagnostic rules TOML. Defaults to the embedded rules.
    #[arg(long)]
    pub rules_file: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// ns.conf, .tgz or .tar bundle.
    pub input: PathBuf,
    /// Write the declaration here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Only convert the named application. Repeatable.
    #[arg(long = "app")]
    pub apps: Vec<String>,
    /// Build options TOML; flags below override its fields.
    #[arg(long)]
    pub options_file: Option<PathBuf>,
    #[arg(long)]
    pub tenant_prefix: Option<String>,
    /// Leave `_<protocol><port>` out of application names.
    #[arg(long)]
    pub no_protocol_port: bool,
    /// Use the platform default TLS profile instead of generating one.
    #[arg(long)]
    pub skip_tls: bool,
    #[arg(long)]
    pub schema_version: Option<String>,
}

#[derive(Parser, Debug)]
pub struct CoverageArgs {
    /// ns.conf, .tgz or .tar bundle.
    pub input: PathBuf,
    #[arg(long, value_enum, default_value_t = CoverageFormat::Text)]
    pub format: CoverageFormat,
    /// Only analyze the named application. Repeatable.
    #[arg(long = "app")]
    pub apps: Vec<String>,
    /// Coverage table TOML. Defaults to the embedded table.
    #[arg(long)]
    pub mappings_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CoverageFormat {
    Text,
    Json,
    Markdown,
}
