use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;

use gpml_convert::config::{Config, ConfigLoader, DEFAULT_LINKOUT_BASE};
use gpml_convert::error::ConvertError;

#[test]
fn parse_config_overrides() {
    let config: Config = serde_json::from_str(
        r#"{
            "sparql_endpoint": "https://example.org/sparql",
            "linkout_base": "https://www.wikidata.org/wiki",
            "batch_size": 4,
            "http_timeout_secs": 5,
            "keep_pre_validation": true,
            "svgo_config": "svgo-config.json",
            "tools": { "pvjs": "/opt/pvjs/bin/pvjs" }
        }"#,
    )
    .unwrap();

    let settings = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(settings.sparql_endpoint, "https://example.org/sparql");
    assert_eq!(settings.linkout_base, "https://www.wikidata.org/wiki/");
    assert_eq!(settings.batch_size, 4);
    assert_eq!(settings.http_timeout, Duration::from_secs(5));
    assert_eq!(settings.tool_timeout, Duration::from_secs(600));
    assert!(settings.keep_pre_validation);
    assert_eq!(
        settings.svgo_config.as_deref(),
        Some(std::path::Path::new("svgo-config.json"))
    );
    assert_eq!(settings.tools.pvjs, "/opt/pvjs/bin/pvjs");
    assert_eq!(settings.tools.svgo, "svgo");
}

#[test]
fn defaults_without_file() {
    let settings = ConfigLoader::resolve_config(Config::default()).unwrap();
    assert_eq!(settings.linkout_base, DEFAULT_LINKOUT_BASE);
    assert_eq!(settings.http_timeout, Duration::from_secs(60));
    assert!(settings.svgo_config.is_none());
}

#[test]
fn batch_size_is_bounded() {
    for batch_size in [0, 11] {
        let config = Config {
            batch_size: Some(batch_size),
            ..Config::default()
        };
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, ConvertError::InvalidConfig(_));
    }
}

#[test]
fn explicit_config_file_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gpml-convert.json");
    fs::write(&path, r#"{ "batch_size": 2 }"#).unwrap();

    let settings = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(settings.batch_size, 2);
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, ConvertError::ConfigRead(_));
}

#[test]
fn malformed_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gpml-convert.json");
    fs::write(&path, "{ batch_size: }").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, ConvertError::ConfigParse(_));
}

#[test]
fn unknown_config_keys_are_ignored() {
    let config: Config =
        serde_json::from_str(r#"{ "schema_version": 1, "batch_size": 3 }"#).unwrap();
    let settings = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(settings.batch_size, 3);
}
