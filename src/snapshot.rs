/* src/snapshot.rs */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use crate::flag::Flag;

/// An immutable point-in-time table of flags.
///
/// Sources publish a new snapshot wholesale instead of mutating one in place.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
	flags: HashMap<String, Arc<Flag>>,
	last_modified: Option<SystemTime>,
}

impl Snapshot {
	/// Builds a snapshot. Later flags replace earlier ones with the same name.
	pub fn new(flags: impl IntoIterator<Item = Flag>, last_modified: Option<SystemTime>) -> Self {
		let flags = flags
			.into_iter()
			.map(|flag| (flag.name().to_string(), Arc::new(flag)))
			.collect();
		Self {
			flags,
			last_modified,
		}
	}

	pub fn get(&self, name: &str) -> Option<Arc<Flag>> {
		self.flags.get(name).cloned()
	}

	/// When the underlying data last changed. `None` disables staleness checks.
	pub fn last_modified(&self) -> Option<SystemTime> {
		self.last_modified
	}

	pub fn names(&self) -> Vec<String> {
		self.flags.keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.flags.len()
	}

	pub fn is_empty(&self) -> bool {
		self.flags.is_empty()
	}

	pub(crate) fn with_flag(&self, flag: Flag) -> Self {
		let mut next = self.clone();
		next.flags.insert(flag.name().to_string(), Arc::new(flag));
		next
	}

	pub(crate) fn without_flag(&self, name: &str) -> Self {
		let mut next = self.clone();
		next.flags.remove(name);
		next
	}

	pub(crate) fn with_last_modified(&self, last_modified: Option<SystemTime>) -> Self {
		Self {
			flags: self.flags.clone(),
			last_modified,
		}
	}
}
