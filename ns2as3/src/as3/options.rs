use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_SCHEMA_VERSION: &str = "3.50.0";
pub const DEFAULT_TENANT_PREFIX: &str = "t";

/// Knobs for declaration building. Every field has a default, so an options
/// file only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    pub schema_version: String,
    pub tenant_prefix: String,
    /// Append `_<protocol><port>` to the application container name.
    pub include_protocol_port: bool,
    /// Reference the platform default TLS profile instead of generating
    /// TLS and certificate objects.
    pub skip_tls: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            tenant_prefix: DEFAULT_TENANT_PREFIX.to_string(),
            include_protocol_port: true,
            skip_tls: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum OptionsLoadError {
    #[error("failed to read options file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse options file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Load build options from a TOML file.
pub fn load_options(path: &Path) -> Result<BuildOptions, OptionsLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| OptionsLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| OptionsLoadError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{load_options, BuildOptions, OptionsLoadError, DEFAULT_SCHEMA_VERSION};
    use std::fs;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("options.toml");
        fs::write(&path, "tenant_prefix = \"prod\"\nskip_tls = true\n").expect("write options");

        let opts = load_options(&path).expect("options should parse");
        assert_eq!(opts.tenant_prefix, "prod");
        assert!(opts.skip_tls);
        assert!(opts.include_protocol_port);
        assert_eq!(opts.schema_version, DEFAULT_SCHEMA_VERSION);
    }

    #[test]
    fn wrong_type_is_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("options.toml");
        fs::write(&path, "skip_tls = \"maybe\"\n").expect("write options");

        match load_options(&path).expect_err("should fail") {
            OptionsLoadError::Parse { .. } => {}
            other => panic!("unexpected error variant: {other}"),
        }
    }

    #[test]
    fn defaults() {
        let opts = BuildOptions::default();
        assert_eq!(opts.tenant_prefix, "t");
        assert!(!opts.skip_tls);
    }
}
