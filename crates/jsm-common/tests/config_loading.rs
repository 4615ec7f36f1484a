//! ---
//! jsm_section: "01-core-functionality"
//! jsm_subsection: "tests"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Configuration discovery against files on disk."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use std::fs;

use jsm_common::config::{AppConfig, CoercionPolicy};
use jsm_common::LogFormat;
use tempfile::tempdir;

#[test]
fn first_existing_candidate_wins() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("missing.toml");
    let present = dir.path().join("jsm.toml");
    fs::write(
        &present,
        "[translator]\njson_buffer = 1024\ncoercion = \"strict\"\n\n[logging]\nformat = \"pretty\"\n",
    )
    .unwrap();

    let loaded = AppConfig::load_with_source(&[missing, present.clone()]).unwrap();
    assert_eq!(loaded.source, present);
    assert_eq!(loaded.config.translator.json_buffer, 1024);
    assert_eq!(loaded.config.translator.coercion, CoercionPolicy::Strict);
    assert_eq!(loaded.config.logging.format, LogFormat::Pretty);
}

#[test]
fn discover_returns_none_without_candidates() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("nothing-here.toml");
    assert!(AppConfig::discover(&[missing.clone()]).unwrap().is_none());

    let err = AppConfig::load(&[missing]).unwrap_err();
    assert!(err.to_string().contains("no configuration files found"));
}

#[test]
fn invalid_file_reports_its_path() {
    let dir = tempdir().expect("tempdir");
    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "[translator\njson_buffer = ").unwrap();

    let err = AppConfig::from_path(broken.clone()).unwrap_err();
    assert!(format!("{err:#}").contains(&broken.display().to_string()));
}
