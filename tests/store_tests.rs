//! Integration tests for resolving keys through a store backed by a real file.
//!
//! Every scenario runs against both a JSON and a YAML copy of the same
//! document.

use layerconf::config::{ConfigStore, LookupMode, StoreOptions};
use layerconf::{ConfigError, Format};
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

const JSON_EXAMPLE: &str = r#"{
"id": "0001",
"type": "donut",
"name": "Cake",
"ppu": 0.55,
"batters": {
        "batter": [
                { "type": "Regular" },
                { "type": "Chocolate" },
                { "type": "Blueberry" },
                { "type": "Devil's Food" }
            ]
    }
}"#;

const YAML_EXAMPLE: &str = r#"batters:
  batter:
  - type: Regular
  - type: Chocolate
  - type: Blueberry
  - type: Devil's Food
id: '0001'
name: Cake
ppu: 0.55
type: donut
"#;

/// Helper to write the example file of the given type and build a store
/// searching only that directory.
fn store_with_file(file_type: &str, env: &[(&str, &str)]) -> (TempDir, ConfigStore) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let content = match file_type {
        "json" => JSON_EXAMPLE,
        _ => YAML_EXAMPLE,
    };
    fs::write(temp.path().join(format!("config.{file_type}")), content).unwrap();

    let env: HashMap<String, String> = env
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let options = StoreOptions {
        search_paths: vec![temp.path().to_path_buf()],
        ..StoreOptions::default()
    };
    let store = ConfigStore::with_env_source(options, env);
    store.read().expect("Failed to read config");
    (temp, store)
}

fn for_each_type(test: impl Fn(&str)) {
    for file_type in ["json", "yaml"] {
        test(file_type);
    }
}

#[test]
fn test_reads_nested_document() {
    for_each_type(|file_type| {
        let (_temp, store) = store_with_file(file_type, &[]);
        assert_eq!(store.get("id"), Some(json!("0001")));
        assert_eq!(store.get("ids"), None);
        assert!(store.get("batters").is_some());
        assert!(store.get("batters.batter").is_some());
        assert_eq!(store.get("ppu"), Some(json!(0.55)));
        assert_eq!(store.resolve_type().unwrap().as_str(), file_type);
    });
}

#[test]
fn test_precedence_defaults_file_overrides() {
    for_each_type(|file_type| {
        let (_temp, store) = store_with_file(file_type, &[]);
        assert_eq!(store.get("foo"), None);
        store.set_default("foo", 123).unwrap();
        assert_eq!(store.get("foo"), Some(json!(123)));
        store.set("foo", 345).unwrap();
        assert_eq!(store.get("foo"), Some(json!(345)));

        store.set_default("id", "zzzz").unwrap();
        assert_eq!(store.get("id"), Some(json!("0001")));
        store.set("id", "0002").unwrap();
        assert_eq!(store.get("id"), Some(json!("0002")));
    });
}

#[test]
fn test_nested_overrides_and_invalid_write() {
    for_each_type(|file_type| {
        let (_temp, store) = store_with_file(file_type, &[]);
        store.set("host.address", "127.0.0.1").unwrap();
        store.set("host.port", "80").unwrap();
        assert_eq!(store.get("host.address"), Some(json!("127.0.0.1")));
        assert_eq!(store.get("host.port"), Some(json!("80")));

        let err = store.set("host.port.no", "no").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWritePath { .. }));
    });
}

#[test]
fn test_set_replaces_nested_map_then_blocks_deeper_write() {
    let store = ConfigStore::with_env_source(
        StoreOptions::default(),
        HashMap::<String, String>::new(),
    );
    store.set("host.port.no", "x").unwrap();
    assert_eq!(store.get("host.port"), Some(json!({"no": "x"})));

    store.set("host.port", "80").unwrap();
    assert_eq!(store.get("host.port"), Some(json!("80")));
    assert_eq!(store.get("host.port.no"), None);

    assert!(matches!(
        store.set("host.port.no", "x"),
        Err(ConfigError::InvalidWritePath { .. })
    ));
}

#[test]
fn test_unsupported_explicit_type() {
    for_each_type(|file_type| {
        let (_temp, store) = store_with_file(file_type, &[]);
        store.set_type("ini");
        assert!(matches!(store.read(), Err(ConfigError::UnsupportedFormat(ref t)) if t == "ini"));
        store.clear_type();
        assert!(store.read().is_ok());
    });
}

#[test]
fn test_explicit_type_overrides_extension() {
    let temp = TempDir::new().unwrap();
    // YAML content behind a .json extension.
    fs::write(temp.path().join("config.json"), "id: '0001'\n").unwrap();
    let store = ConfigStore::with_env_source(
        StoreOptions {
            search_paths: vec![temp.path().to_path_buf()],
            file_type: Some("yaml".to_string()),
            ..StoreOptions::default()
        },
        HashMap::<String, String>::new(),
    );
    assert_eq!(store.resolve_type().unwrap(), Format::Yaml);
    store.read().unwrap();
    assert_eq!(store.get("id"), Some(json!("0001")));
}

#[test]
fn test_env_binding() {
    for_each_type(|file_type| {
        let (_temp, store) = store_with_file(file_type, &[("PATH", "/usr/bin"), ("name", "taoqy")]);
        store.bind_env("PATH");
        assert_eq!(store.get("PATH"), Some(json!("/usr/bin")));

        assert_eq!(store.get("name"), Some(json!("Cake")));
        store.bind_env("name");
        assert_eq!(store.get("name"), Some(json!("taoqy")));
    });
}

#[test]
fn test_env_prefix() {
    for_each_type(|file_type| {
        let (_temp, store) =
            store_with_file(file_type, &[("PATH", "/usr/bin"), ("CONFIGER_PATH", "/opt/bin")]);
        store.set_env_prefix("CONFIGER_");
        store.bind_env("PATH");
        assert_eq!(store.get("PATH"), Some(json!("/opt/bin")));
    });
}

#[test]
fn test_falsy_file_values_fall_back_to_defaults() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("config.json"),
        r#"{"retries": 0, "label": "", "tags": [], "extra": {}, "enabled": false}"#,
    )
    .unwrap();
    let store = ConfigStore::with_env_source(
        StoreOptions {
            search_paths: vec![temp.path().to_path_buf()],
            ..StoreOptions::default()
        },
        HashMap::<String, String>::new(),
    );
    store.read().unwrap();

    for key in ["retries", "label", "tags", "extra", "enabled"] {
        assert_eq!(store.get(key), None, "{key}");
    }
    store.set_default("retries", 3).unwrap();
    assert_eq!(store.get("retries"), Some(json!(3)));

    store.set_lookup_mode(LookupMode::Present);
    assert_eq!(store.get("retries"), Some(json!(0)));
    assert_eq!(store.get("enabled"), Some(json!(false)));
}

#[test]
fn test_search_path_order_across_directories() {
    let low = TempDir::new().unwrap();
    let high = TempDir::new().unwrap();
    fs::write(low.path().join("config.json"), r#"{"origin": "low"}"#).unwrap();
    fs::write(high.path().join("config.yaml"), "origin: high\n").unwrap();

    let store = ConfigStore::with_env_source(
        StoreOptions {
            search_paths: vec![],
            ..StoreOptions::default()
        },
        HashMap::<String, String>::new(),
    );
    store.add_path(low.path());
    store.add_path(high.path());
    store.read().unwrap();

    assert_eq!(store.get("origin"), Some(json!("high")));
    assert_eq!(store.config_file_used(), Some(high.path().join("config.yaml")));
}

#[test]
fn test_global_store_is_shared() {
    let first = layerconf::global();
    let second = layerconf::global();
    first.set("global_marker", "set").unwrap();
    assert_eq!(second.get("global_marker"), Some(json!("set")));
}
