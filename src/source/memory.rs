/* src/source/memory.rs */

use std::time::SystemTime;

use arc_swap::{ArcSwap, ArcSwapOption};

use super::{Lookup, Notifier, Source, SourceError};
use crate::flag::Flag;
use crate::snapshot::Snapshot;

/// A source populated in-process, useful for testing and embedding.
///
/// Every mutation publishes a fresh snapshot, so readers never see a
/// partially applied change.
#[derive(Default)]
pub struct MemorySource {
	snapshot: ArcSwap<Snapshot>,
	error: ArcSwapOption<SourceError>,
	notifier: Notifier,
}

impl MemorySource {
	/// Creates a new empty MemorySource.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a source serving the given flags.
	pub fn with_flags(flags: impl IntoIterator<Item = Flag>) -> Self {
		let source = Self::new();
		source.replace(Snapshot::new(flags, None));
		source
	}

	/// Inserts or replaces a flag.
	pub fn insert(&self, flag: Flag) {
		self.snapshot.rcu(|current| current.with_flag(flag.clone()));
	}

	/// Removes a flag. Returns false if it was not present.
	pub fn remove(&self, name: &str) -> bool {
		let mut removed = false;
		self.snapshot.rcu(|current| {
			removed = current.get(name).is_some();
			current.without_flag(name)
		});
		removed
	}

	/// Replaces the whole table.
	pub fn replace(&self, snapshot: Snapshot) {
		self.snapshot.store(snapshot.into());
	}

	pub fn set_last_modified(&self, last_modified: Option<SystemTime>) {
		self.snapshot
			.rcu(|current| current.with_last_modified(last_modified));
	}

	/// Forces every lookup to carry `error` until cleared with `None`.
	pub fn set_error(&self, error: Option<SourceError>) {
		self.error.store(error.map(Into::into));
	}

	pub fn snapshot(&self) -> std::sync::Arc<Snapshot> {
		self.snapshot.load_full()
	}
}

impl Source for MemorySource {
	fn lookup(&self, name: &str) -> Lookup {
		let mut lookup = Lookup::from_snapshot(&self.snapshot.load(), name);
		lookup.error = self.error.load().as_deref().cloned();
		lookup
	}

	fn notifier(&self) -> &Notifier {
		&self.notifier
	}
}

impl std::fmt::Debug for MemorySource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemorySource")
			.field("flags", &self.snapshot.load().len())
			.field("error", &self.error.load().is_some())
			.field("notifier", &self.notifier)
			.finish()
	}
}
