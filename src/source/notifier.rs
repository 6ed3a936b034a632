/* src/source/notifier.rs */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;

use super::SourceError;

/// Receives events pushed by a source's background activity.
pub trait Listener: Send + Sync {
	fn on_error(&self, error: SourceError);
	fn on_age(&self, age: Duration);
}

/// Handle returned by [`Notifier::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Inner {
	listeners: ArcSwap<HashMap<u64, Arc<dyn Listener>>>,
	next_id: AtomicU64,
}

/// Fans source events out to every attached listener.
///
/// Held by value inside each source. Cloning shares the listener set, so a
/// source's background task can keep its own handle.
#[derive(Clone)]
pub struct Notifier {
	inner: Arc<Inner>,
}

impl Notifier {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Inner {
				listeners: ArcSwap::from_pointee(HashMap::new()),
				next_id: AtomicU64::new(0),
			}),
		}
	}

	pub fn attach(&self, listener: Arc<dyn Listener>) -> ListenerId {
		let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
		self.inner.listeners.rcu(|map| {
			let mut next = (**map).clone();
			next.insert(id, Arc::clone(&listener));
			next
		});
		ListenerId(id)
	}

	/// Removes a listener. Returns false if it was not attached.
	pub fn detach(&self, id: ListenerId) -> bool {
		// Pre-check to avoid an rcu clone for unknown ids.
		if !self.inner.listeners.load().contains_key(&id.0) {
			return false;
		}
		let mut removed = false;
		self.inner.listeners.rcu(|map| {
			let mut next = (**map).clone();
			removed = next.remove(&id.0).is_some();
			next
		});
		removed
	}

	pub fn report_error(&self, error: SourceError) {
		let listeners = self.inner.listeners.load();
		for listener in listeners.values() {
			listener.on_error(error.clone());
		}
	}

	pub fn report_age(&self, age: Duration) {
		let listeners = self.inner.listeners.load();
		for listener in listeners.values() {
			listener.on_age(age);
		}
	}

	pub fn len(&self) -> usize {
		self.inner.listeners.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.listeners.load().is_empty()
	}
}

impl Default for Notifier {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for Notifier {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Notifier")
			.field("listeners", &self.len())
			.finish()
	}
}
