//! Input loading for single config files and archive bundles.
//!
//! A path is classified by content, not extension:
//!
//! - gzip magic → gzip-compressed tar bundle (`.tgz`, `.tar.gz`)
//! - `ustar` header → plain tar bundle
//! - valid UTF-8 → plain `ns.conf` text
//!
//! Archives are read fully in memory; nothing is written to disk.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use serde::Serialize;
use thiserror::Error;

use crate::detect::{detect_version, VersionDetection};
use crate::model::Source;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
const TAR_MAGIC_OFFSET: usize = 257;
const MAIN_CONFIG_NAME: &str = "ns.conf";

/// Application-defining statement prefixes used for the empty-config check.
const APP_DEFINITIONS: &[&[&str]] = &[
    &["add", "lb", "vserver"],
    &["add", "cs", "vserver"],
    &["add", "gslb", "vserver"],
];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("input not found: {path}")]
    NotFound { path: String },
    #[error("unsupported input {path}: {reason}")]
    UnsupportedInput { path: String, reason: String },
    #[error("no application-defining statements found in {path}")]
    EmptyConfig { path: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to read archive {path}: {source}")]
    Archive {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFileType {
    Conf,
    Tgz,
    Tar,
}

/// What a source holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceRole {
    /// Main or included configuration text; parsed for statements.
    Config,
    /// Certificate or key material; carried along, never parsed.
    Certificate,
}

/// Sources read from one input, main config first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub sources: Vec<Source>,
    pub roles: Vec<SourceRole>,
    pub file_type: InputFileType,
    pub version: VersionDetection,
}

impl LoadedConfig {
    /// Configuration sources in parse order.
    pub fn config_sources(&self) -> impl Iterator<Item = &Source> {
        self.sources
            .iter()
            .zip(&self.roles)
            .filter(|(_, role)| **role == SourceRole::Config)
            .map(|(source, _)| source)
    }
}

/// Load a config file or archive from disk.
pub fn load(path: &Path) -> Result<LoadedConfig, LoadError> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(LoadError::NotFound { path: display });
    }
    if path.is_dir() {
        return Err(LoadError::UnsupportedInput {
            path: display,
            reason: "path is a directory".to_string(),
        });
    }

    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| display.clone());

    load_bytes(&file_name, &bytes).map_err(|err| match err {
        LoadError::UnsupportedInput { reason, .. } => LoadError::UnsupportedInput {
            path: display.clone(),
            reason,
        },
        LoadError::EmptyConfig { .. } => LoadError::EmptyConfig {
            path: display.clone(),
        },
        LoadError::Archive { source, .. } => LoadError::Archive {
            path: display.clone(),
            source,
        },
        other => other,
    })
}

/// Load from bytes already in memory; `name` labels the resulting sources.
pub fn load_bytes(name: &str, bytes: &[u8]) -> Result<LoadedConfig, LoadError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut raw = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut raw)
            .map_err(|source| LoadError::Archive {
                path: name.to_string(),
                source,
            })?;
        return load_tar(name, &raw, InputFileType::Tgz);
    }
    if is_tar(bytes) {
        return load_tar(name, bytes, InputFileType::Tar);
    }
    if bytes.starts_with(&ZIP_MAGIC) {
        return Err(LoadError::UnsupportedInput {
            path: name.to_string(),
            reason: "zip archives are not supported; use .tgz or .tar".to_string(),
        });
    }

    let text = std::str::from_utf8(bytes).map_err(|_| LoadError::UnsupportedInput {
        path: name.to_string(),
        reason: "not a text configuration or supported archive".to_string(),
    })?;
    load_text(name, text)
}

/// Load a single plain-text configuration.
pub fn load_text(name: &str, text: &str) -> Result<LoadedConfig, LoadError> {
    if !has_app_definitions(text) {
        return Err(LoadError::EmptyConfig {
            path: name.to_string(),
        });
    }
    let version = detect_version(name, text);
    log::info!(
        "loaded text config {name} ({} bytes), version {}",
        text.len(),
        version.value
    );
    Ok(LoadedConfig {
        sources: vec![Source::new(name, text)],
        roles: vec![SourceRole::Config],
        file_type: InputFileType::Conf,
        version,
    })
}

fn is_tar(bytes: &[u8]) -> bool {
    bytes
        .get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5)
        .is_some_and(|magic| magic == b"ustar")
}

fn load_tar(name: &str, bytes: &[u8], file_type: InputFileType) -> Result<LoadedConfig, LoadError> {
    let archive_err = |source: std::io::Error| LoadError::Archive {
        path: name.to_string(),
        source,
    };

    let mut configs: Vec<Source> = Vec::new();
    let mut certs: Vec<Source> = Vec::new();
    let mut archive = tar::Archive::new(Cursor::new(bytes));

    for entry in archive.entries().map_err(archive_err)? {
        let mut entry = entry.map_err(archive_err)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let member = entry
            .path()
            .map_err(archive_err)?
            .to_string_lossy()
            .trim_start_matches("./")
            .to_string();
        let Some(role) = member_role(&member) else {
            log::debug!("skipping archive member {member}");
            continue;
        };

        let mut raw = Vec::new();
        entry.read_to_end(&mut raw).map_err(archive_err)?;
        let Ok(content) = String::from_utf8(raw) else {
            log::debug!("skipping non-text archive member {member}");
            continue;
        };
        match role {
            SourceRole::Config => configs.push(Source::new(member, content)),
            SourceRole::Certificate => certs.push(Source::new(member, content)),
        }
    }

    let main_idx = main_config_index(&configs).ok_or_else(|| LoadError::UnsupportedInput {
        path: name.to_string(),
        reason: format!("archive contains no {MAIN_CONFIG_NAME}"),
    })?;
    let main = configs.remove(main_idx);
    let version = detect_version(&main.name, &main.content);
    log::info!(
        "loaded archive {name}: main={} includes={} certs={} version={}",
        main.name,
        configs.len(),
        certs.len(),
        version.value
    );

    let mut sources = vec![main];
    let mut roles = vec![SourceRole::Config];
    roles.extend(configs.iter().map(|_| SourceRole::Config));
    sources.extend(configs);
    roles.extend(certs.iter().map(|_| SourceRole::Certificate));
    sources.extend(certs);

    Ok(LoadedConfig {
        sources,
        roles,
        file_type,
        version,
    })
}

fn member_role(member: &str) -> Option<SourceRole> {
    let lower = member.to_ascii_lowercase();
    let file = lower.rsplit('/').next().unwrap_or(&lower);
    if file.ends_with(".conf") {
        return Some(SourceRole::Config);
    }
    let in_ssl_dir = lower.starts_with("ssl/") || lower.contains("/ssl/");
    let cert_ext = [".crt", ".cer", ".pem", ".key"]
        .iter()
        .any(|ext| file.ends_with(ext));
    (in_ssl_dir || cert_ext).then_some(SourceRole::Certificate)
}

/// Shallowest member named `ns.conf`, ties broken by name.
fn main_config_index(configs: &[Source]) -> Option<usize> {
    configs
        .iter()
        .enumerate()
        .filter(|(_, s)| {
            s.name
                .rsplit('/')
                .next()
                .is_some_and(|f| f.eq_ignore_ascii_case(MAIN_CONFIG_NAME))
        })
        .min_by(|(_, a), (_, b)| {
            depth(&a.name)
                .cmp(&depth(&b.name))
                .then_with(|| a.name.cmp(&b.name))
        })
        .map(|(idx, _)| idx)
}

fn depth(name: &str) -> usize {
    name.matches('/').count()
}

/// Quick scan for `add lb|cs|gslb vserver` without a full parse.
pub fn has_app_definitions(text: &str) -> bool {
    text.lines().any(|line| {
        let words: Vec<&str> = line.split_whitespace().take(3).collect();
        APP_DEFINITIONS.iter().any(|prefix| {
            words.len() == prefix.len()
                && words
                    .iter()
                    .zip(prefix.iter())
                    .all(|(w, p)| w.eq_ignore_ascii_case(p))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::{load, load_bytes, load_text, member_role, InputFileType, LoadError, SourceRole};

    #[test]
    fn text_without_vservers_is_empty_config() {
        let err = load_text("ns.conf", "add server s1 10.0.0.1\n").expect_err("should fail");
        assert!(matches!(err, LoadError::EmptyConfig { .. }));
    }

    #[test]
    fn text_config_loads_as_single_source() {
        let loaded = load_text("ns.conf", "add lb vserver a HTTP 10.0.0.1 80\n").expect("load");
        assert_eq!(loaded.file_type, InputFileType::Conf);
        assert_eq!(loaded.sources.len(), 1);
        assert_eq!(loaded.sources[0].size, 34);
        assert!(loaded.version.assumed);
    }

    #[test]
    fn missing_path_is_not_found() {
        let err = load(std::path::Path::new("/definitely/not/here.conf")).expect_err("missing");
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn binary_input_is_unsupported() {
        let err = load_bytes("blob.bin", &[0xff, 0xfe, 0x00, 0x81]).expect_err("binary");
        assert!(matches!(err, LoadError::UnsupportedInput { .. }));
    }

    #[test]
    fn zip_input_is_unsupported() {
        let err = load_bytes("bundle.zip", b"PK\x03\x04rest").expect_err("zip");
        match err {
            LoadError::UnsupportedInput { reason, .. } => assert!(reason.contains("zip")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn classifies_archive_members() {
        assert_eq!(member_role("nsconfig/ns.conf"), Some(SourceRole::Config));
        assert_eq!(
            member_role("nsconfig/ssl/web.crt"),
            Some(SourceRole::Certificate)
        );
        assert_eq!(member_role("var/log/ns.log"), None);
    }
}
