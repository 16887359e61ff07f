use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use flate2::write::GzEncoder;
use flate2::Compression;
use ns2as3::explode::explode;
use ns2as3::loader::{load, InputFileType, LoadError, SourceRole};
use predicates::prelude::*;
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn tar_bytes(members: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, content) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .expect("append member");
    }
    builder.into_inner().expect("finish tar")
}

fn write_tgz(path: &Path, members: &[(&str, &str)]) {
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(&tar_bytes(members)).expect("gzip");
    fs::write(path, gz.finish().expect("finish gzip")).expect("write archive");
}

fn bundle_members() -> Vec<(&'static str, String)> {
    vec![
        (
            "nsconfig/ns.conf",
            fs::read_to_string(fixture("fixtures/web_app.conf")).expect("fixture"),
        ),
        (
            "nsconfig/partitions/lab/ns.conf",
            "add lb vserver lab_app TCP 10.9.0.1 8443\n".to_string(),
        ),
        (
            "nsconfig/ssl/web.crt",
            "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n".to_string(),
        ),
        ("var/log/ns.log", "boot\n".to_string()),
    ]
}

#[test]
fn gzipped_bundle_loads_main_config_first() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("collector.tgz");
    let members = bundle_members();
    let refs: Vec<(&str, &str)> = members.iter().map(|(n, c)| (*n, c.as_str())).collect();
    write_tgz(&path, &refs);

    let loaded = load(&path).expect("load archive");
    assert_eq!(loaded.file_type, InputFileType::Tgz);
    assert_eq!(loaded.sources[0].name, "nsconfig/ns.conf");
    assert_eq!(loaded.version.value, "13.1");
    assert_eq!(loaded.config_sources().count(), 2);
    assert!(loaded
        .roles
        .iter()
        .zip(&loaded.sources)
        .any(|(role, src)| *role == SourceRole::Certificate && src.name == "nsconfig/ssl/web.crt"));
    assert!(!loaded.sources.iter().any(|s| s.name.ends_with("ns.log")));
}

#[test]
fn bundle_explodes_applications_from_every_config_source() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("collector.tgz");
    let members = bundle_members();
    let refs: Vec<(&str, &str)> = members.iter().map(|(n, c)| (*n, c.as_str())).collect();
    write_tgz(&path, &refs);

    let explosion = explode(&path).expect("explode archive");
    assert_eq!(explosion.input_file_type, InputFileType::Tgz);
    assert!(explosion.find_app("web_app").is_some());
    assert!(explosion.find_app("lab_app").is_some());
}

#[test]
fn plain_tar_is_accepted() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("collector.tar");
    fs::write(
        &path,
        tar_bytes(&[("ns.conf", "add lb vserver a HTTP 10.0.0.1 80\n")]),
    )
    .expect("write tar");

    let loaded = load(&path).expect("load tar");
    assert_eq!(loaded.file_type, InputFileType::Tar);
}

#[test]
fn archive_without_main_config_is_unsupported() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("collector.tgz");
    write_tgz(&path, &[("nsconfig/ssl/web.crt", "cert\n")]);

    let err = load(&path).expect_err("no ns.conf");
    match err {
        LoadError::UnsupportedInput { reason, .. } => assert!(reason.contains("ns.conf")),
        other => panic!("unexpected error variant: {other}"),
    }
}

#[test]
fn zip_input_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("collector.zip");
    fs::write(&path, b"PK\x03\x04rest").expect("write zip");

    let err = load(&path).expect_err("zip rejected");
    assert!(matches!(err, LoadError::UnsupportedInput { .. }));
}

#[test]
fn cli_converts_archive_input() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("collector.tgz");
    let members = bundle_members();
    let refs: Vec<(&str, &str)> = members.iter().map(|(n, c)| (*n, c.as_str())).collect();
    write_tgz(&path, &refs);

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ns2as3"));
    cmd.env("NO_COLOR", "1")
        .arg("convert")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"t_web_app\""))
        .stdout(predicate::str::contains("\"lab_app_tcp8443_vs\""));
}
