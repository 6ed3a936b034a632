/* src/source/mod.rs */

//!
//! Flag sources.
//!
//! - [`Source`] - the contract an engine evaluates against.
//! - [`Notifier`] - shared plumbing for pushing errors and ages to attached engines.
//! - [`MemorySource`] - programmatically populated source.
//! - [`FileSource`] - polls a `name,rate` text file (feature `file`).

mod error;
mod memory;
mod notifier;

#[cfg(feature = "file")]
mod file;

pub use error::SourceError;
pub use memory::MemorySource;
pub use notifier::{Listener, ListenerId, Notifier};

#[cfg(feature = "file")]
pub use file::{FileSource, MIN_POLL_INTERVAL, ParseOutcome, parse};

use std::sync::Arc;
use std::time::SystemTime;

use crate::flag::Flag;
use crate::snapshot::Snapshot;

/// Result of a [`Source::lookup`].
#[derive(Debug, Clone, Default)]
pub struct Lookup {
	/// The flag, if the source knows it.
	pub flag: Option<Arc<Flag>>,
	/// Timestamp of the data served. `None` means staleness does not apply.
	pub last_modified: Option<SystemTime>,
	/// A source-wide problem, independent of `flag`.
	pub error: Option<SourceError>,
}

impl Lookup {
	pub fn from_snapshot(snapshot: &Snapshot, name: &str) -> Self {
		Self {
			flag: snapshot.get(name),
			last_modified: snapshot.last_modified(),
			error: None,
		}
	}

	pub fn error(error: SourceError) -> Self {
		Self {
			flag: None,
			last_modified: None,
			error: Some(error),
		}
	}
}

/// A provider of the current flag table.
///
/// `lookup` must not block or perform I/O: it reads whatever the source's
/// own background activity last published.
pub trait Source: Send + Sync {
	fn lookup(&self, name: &str) -> Lookup;

	/// Plumbing used to push errors and ages to attached engines.
	fn notifier(&self) -> &Notifier;
}

