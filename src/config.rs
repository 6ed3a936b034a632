/* src/config.rs */

//!
//! Deserializable settings for engines and the file source.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Engine settings, applied with [`FlagsetBuilder::config`](crate::FlagsetBuilder::config).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagsetConfig {
	/// Stale-data threshold in milliseconds. Zero or absent disables it.
	pub max_staleness_ms: Option<u64>,
	pub seed: Option<u64>,
	pub tags: HashMap<String, String>,
	pub overrides: HashMap<String, bool>,
	pub queue_capacity: Option<usize>,
}

/// Settings for [`FileSource`](crate::source::FileSource).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSourceConfig {
	pub path: PathBuf,
	pub interval_ms: u64,
}

/// Default poll interval in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 15_000;

impl Default for FileSourceConfig {
	fn default() -> Self {
		Self {
			path: PathBuf::from("flags.csv"),
			interval_ms: DEFAULT_INTERVAL_MS,
		}
	}
}
