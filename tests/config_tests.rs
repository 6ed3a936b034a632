/* tests/config_tests.rs */

#![cfg(feature = "serde")]

use flagset::config::{DEFAULT_INTERVAL_MS, FileSourceConfig, FlagsetConfig};
use flagset::source::MemorySource;
use flagset::{Flag, Flagset};
use std::path::PathBuf;
use std::sync::Arc;

#[test]
fn test_flagset_config_json() {
	let config: FlagsetConfig = serde_json::from_str(
		r#"{
			"max_staleness_ms": 62000,
			"seed": 42,
			"tags": { "cluster": "south" },
			"overrides": { "beta": true }
		}"#,
	)
	.unwrap();

	assert_eq!(config.max_staleness_ms, Some(62_000));
	assert_eq!(config.seed, Some(42));
	assert_eq!(config.queue_capacity, None);

	let source = Arc::new(MemorySource::with_flags([Flag::constant("beta", false)]));
	let flags = Flagset::builder(source).config(&config).build().unwrap();
	assert!(flags.enabled("beta"));
	assert_eq!(flags.default_tags().get("cluster").map(String::as_str), Some("south"));
}

#[test]
fn test_file_source_config_toml() {
	let config: FileSourceConfig = toml::from_str(
		r#"
		path = "/etc/flags.csv"
		interval_ms = 500
		"#,
	)
	.unwrap();
	assert_eq!(config.path, PathBuf::from("/etc/flags.csv"));
	assert_eq!(config.interval_ms, 500);

	let defaults: FileSourceConfig = toml::from_str("").unwrap();
	assert_eq!(defaults.interval_ms, DEFAULT_INTERVAL_MS);
}

#[cfg(feature = "file")]
#[tokio::test(flavor = "multi_thread")]
async fn test_file_source_from_config() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("flags.csv");
	std::fs::write(&path, "on,1\n").unwrap();

	let source = flagset::source::FileSource::from_config(&FileSourceConfig {
		path: path.clone(),
		interval_ms: 3_600_000,
	});
	let snapshot = source.refresh().await.unwrap();
	assert_eq!(source.path(), path.as_path());
	assert!(snapshot.get("on").is_some());
}
