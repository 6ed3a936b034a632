/* src/engine/mod.rs */

//!
//! The evaluation engine.
//!
//! [`Flagset::enabled`] never blocks on I/O and never fails: overrides win,
//! otherwise the source's current snapshot decides, and anything worth
//! reporting (unknown flags, stale data, source and flag errors, ages,
//! checks) is queued for the engine's dispatcher.

mod builder;
mod random;

pub use builder::FlagsetBuilder;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwap;

use crate::Error;
use crate::dispatch::{AgeKind, Dispatcher, Notification};
use crate::flag::Tags;
use crate::source::{Listener, ListenerId, Source, SourceError};
use random::Random;

/// State shared between an engine and its source's notifier.
pub(crate) struct Shared {
	dispatcher: Dispatcher,
	max_staleness: Option<Duration>,
}

impl Shared {
	fn emit(&self, notification: Notification) {
		self.dispatcher.send(notification);
	}

	fn report_error(&self, error: Error) {
		self.emit(Notification::Error(error));
	}

	fn report_age(&self, kind: AgeKind, age: Duration) {
		self.emit(Notification::Age { kind, age });
		if let Some(max) = self.max_staleness
			&& age > max
		{
			self.report_error(Error::Stale { age, max });
		}
	}
}

impl Listener for Shared {
	fn on_error(&self, error: SourceError) {
		self.report_error(Error::Source(error));
	}

	fn on_age(&self, age: Duration) {
		self.report_age(AgeKind::Source, age);
	}
}

/// A feature flag evaluator bound to one [`Source`].
///
/// Safe to share across threads. Dropping the engine closes it.
pub struct Flagset {
	source: Arc<dyn Source>,
	overrides: ArcSwap<HashMap<String, bool>>,
	default_tags: ArcSwap<Tags>,
	random: Random,
	shared: Arc<Shared>,
	listener: ListenerId,
	closed: AtomicBool,
}

impl Flagset {
	pub fn builder(source: Arc<dyn Source>) -> FlagsetBuilder {
		FlagsetBuilder::new(source)
	}

	/// Builds an engine with default options.
	pub fn new(source: Arc<dyn Source>) -> Result<Self, Error> {
		FlagsetBuilder::new(source).build()
	}

	/// Checks a flag with only the default tags.
	pub fn enabled(&self, name: &str) -> bool {
		self.check(name, None)
	}

	/// Checks a flag with per-call tags layered over the default tags.
	pub fn enabled_with(&self, name: &str, tags: &Tags) -> bool {
		self.check(name, Some(tags))
	}

	fn check(&self, name: &str, tags: Option<&Tags>) -> bool {
		let enabled = self.evaluate(name, tags);
		self.shared.emit(Notification::Check {
			name: name.to_string(),
			enabled,
		});
		enabled
	}

	fn evaluate(&self, name: &str, tags: Option<&Tags>) -> bool {
		if let Some(&value) = self.overrides.load().get(name) {
			return value;
		}

		let tags = self.merge_tags(tags);
		let lookup = self.source.lookup(name);

		if let Some(error) = lookup.error {
			self.shared.report_error(Error::Source(error));
		}

		if let Some(last_modified) = lookup.last_modified {
			let age = SystemTime::now()
				.duration_since(last_modified)
				.unwrap_or_default();
			self.shared.report_age(AgeKind::Backend, age);
		}

		let Some(flag) = lookup.flag else {
			self.shared.report_error(Error::UnknownFlag {
				name: name.to_string(),
			});
			return false;
		};

		let evaluation = self.random.with(|rng| flag.evaluate(rng, &tags));
		if let Some(source) = evaluation.error {
			self.shared.report_error(Error::Flag {
				name: name.to_string(),
				source,
			});
		}
		evaluation.enabled
	}

	fn merge_tags(&self, tags: Option<&Tags>) -> Tags {
		let mut merged = Tags::clone(&self.default_tags.load());
		if let Some(tags) = tags {
			merged.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
		}
		merged
	}

	/// Forces `name` to `value`, bypassing the source.
	pub fn set_override(&self, name: impl Into<String>, value: bool) {
		let name = name.into();
		self.overrides.rcu(|current| {
			let mut next = (**current).clone();
			next.insert(name.clone(), value);
			next
		});
	}

	/// Returns `name` to normal evaluation. Returns the removed value, if any.
	pub fn clear_override(&self, name: &str) -> Option<bool> {
		let mut removed = None;
		self.overrides.rcu(|current| {
			let mut next = (**current).clone();
			removed = next.remove(name);
			next
		});
		removed
	}

	pub fn overrides(&self) -> Arc<HashMap<String, bool>> {
		self.overrides.load_full()
	}

	/// Merges tags into the defaults, overwriting existing keys.
	pub fn add_default_tags<I, K, V>(&self, tags: I)
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let tags: Vec<(String, String)> = tags
			.into_iter()
			.map(|(k, v)| (k.into(), v.into()))
			.collect();
		self.default_tags.rcu(|current| {
			let mut next = (**current).clone();
			next.extend(tags.iter().cloned());
			next
		});
	}

	pub fn default_tags(&self) -> Arc<Tags> {
		self.default_tags.load_full()
	}

	/// Stops notification delivery and detaches from the source.
	///
	/// Idempotent. Queued notifications may be dropped. The source keeps
	/// running.
	pub fn close(&self) {
		if self.closed.swap(true, Ordering::AcqRel) {
			return;
		}
		self.source.notifier().detach(self.listener);
		self.shared.dispatcher.close();
		tracing::debug!("flagset closed");
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire) || self.shared.dispatcher.is_closed()
	}
}

impl Drop for Flagset {
	fn drop(&mut self) {
		self.close();
	}
}

impl std::fmt::Debug for Flagset {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Flagset")
			.field("overrides", &self.overrides.load_full())
			.field("default_tags", &self.default_tags.load_full())
			.field("max_staleness", &self.shared.max_staleness)
			.field("seeded", &matches!(self.random, Random::Seeded(_)))
			.field("closed", &self.is_closed())
			.finish_non_exhaustive()
	}
}
