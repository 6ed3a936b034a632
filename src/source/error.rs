/* src/source/error.rs */

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Source-level errors. Cloneable so one event can reach every attached engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
	/// The backing file could not be read.
	#[error("flag source missing or unreadable at {path:?}: {source}")]
	Missing {
		path: PathBuf,
		#[source]
		source: Arc<io::Error>,
	},

	/// One line of the backing file was malformed and skipped.
	#[error("error parsing line {line} {content:?}: {reason}")]
	Parse {
		line: usize,
		content: String,
		reason: String,
	},

	/// No snapshot has been built yet.
	#[error("flag source has not loaded any data yet")]
	NotLoaded,

	#[error("{0}")]
	Custom(String),
}

impl SourceError {
	pub fn custom(message: impl Into<String>) -> Self {
		Self::Custom(message.into())
	}
}
