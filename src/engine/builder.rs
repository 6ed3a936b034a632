/* src/engine/builder.rs */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use arc_swap::ArcSwap;

use super::random::Random;
use super::{Flagset, Shared};
use crate::Error;
use crate::dispatch::{
	AgeCallback, AgeKind, Callbacks, CheckCallback, DEFAULT_QUEUE_CAPACITY, Dispatcher,
	ErrorCallback,
};
use crate::flag::Tags;
use crate::source::Source;

#[cfg(feature = "serde")]
use crate::config::FlagsetConfig;

enum ErrorSink {
	/// Emit through `tracing`.
	Trace,
	Discard,
	Callback(ErrorCallback),
}

/// Builder for [`Flagset`].
pub struct FlagsetBuilder {
	source: Arc<dyn Source>,
	overrides: HashMap<String, bool>,
	tags: Tags,
	seed: Option<u64>,
	max_staleness: Option<Duration>,
	on_error: ErrorSink,
	on_age: Option<AgeCallback>,
	on_check: Option<CheckCallback>,
	queue_capacity: usize,
}

impl FlagsetBuilder {
	pub fn new(source: Arc<dyn Source>) -> Self {
		Self {
			source,
			overrides: HashMap::new(),
			tags: Tags::new(),
			seed: None,
			max_staleness: None,
			on_error: ErrorSink::Trace,
			on_age: None,
			on_check: None,
			queue_capacity: DEFAULT_QUEUE_CAPACITY,
		}
	}

	/// Forces a flag's value regardless of the source.
	pub fn override_flag(mut self, name: impl Into<String>, value: bool) -> Self {
		self.overrides.insert(name.into(), value);
		self
	}

	pub fn overrides<I, K>(mut self, overrides: I) -> Self
	where
		I: IntoIterator<Item = (K, bool)>,
		K: Into<String>,
	{
		self.overrides
			.extend(overrides.into_iter().map(|(k, v)| (k.into(), v)));
		self
	}

	/// Replaces the default tags.
	pub fn tags(mut self, tags: Tags) -> Self {
		self.tags = tags;
		self
	}

	/// Adds one default tag.
	pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.tags.insert(key.into(), value.into());
		self
	}

	/// Makes sampling reproducible for a fixed sequence of calls.
	pub fn seed(mut self, seed: u64) -> Self {
		self.seed = Some(seed);
		self
	}

	/// Reports stale data older than `max`. Zero disables the check.
	pub fn max_staleness(mut self, max: Duration) -> Self {
		self.max_staleness = Some(max);
		self
	}

	pub fn on_error<F>(mut self, f: F) -> Self
	where
		F: Fn(Error) + Send + Sync + 'static,
	{
		self.on_error = ErrorSink::Callback(Arc::new(f));
		self
	}

	/// Drops errors silently instead of tracing them.
	pub fn discard_errors(mut self) -> Self {
		self.on_error = ErrorSink::Discard;
		self
	}

	/// Writes each error to `logger` at `Error` level.
	#[cfg(feature = "logging")]
	pub fn log_errors(self, logger: Arc<dyn log::Log>) -> Self {
		self.on_error(move |error| {
			logger.log(
				&log::Record::builder()
					.level(log::Level::Error)
					.target("flagset")
					.args(format_args!("{error}"))
					.build(),
			);
		})
	}

	pub fn on_age<F>(mut self, f: F) -> Self
	where
		F: Fn(AgeKind, Duration) + Send + Sync + 'static,
	{
		self.on_age = Some(Arc::new(f));
		self
	}

	pub fn on_check<F>(mut self, f: F) -> Self
	where
		F: Fn(&str, bool) + Send + Sync + 'static,
	{
		self.on_check = Some(Arc::new(f));
		self
	}

	/// Bounds the notification queue. Notifications beyond it are dropped.
	pub fn queue_capacity(mut self, capacity: usize) -> Self {
		self.queue_capacity = capacity;
		self
	}

	/// Applies a deserialized configuration on top of the current settings.
	#[cfg(feature = "serde")]
	pub fn config(mut self, config: &FlagsetConfig) -> Self {
		if let Some(ms) = config.max_staleness_ms {
			self.max_staleness = Some(Duration::from_millis(ms));
		}
		if let Some(seed) = config.seed {
			self.seed = Some(seed);
		}
		if let Some(capacity) = config.queue_capacity {
			self.queue_capacity = capacity;
		}
		self.tags
			.extend(config.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
		self.overrides
			.extend(config.overrides.iter().map(|(k, v)| (k.clone(), *v)));
		self
	}

	pub fn build(self) -> Result<Flagset, Error> {
		let on_error: Option<ErrorCallback> = match self.on_error {
			ErrorSink::Trace => Some(Arc::new(|error: Error| {
				tracing::warn!(%error, "flag error");
			})),
			ErrorSink::Discard => None,
			ErrorSink::Callback(cb) => Some(cb),
		};
		let callbacks = Callbacks {
			on_error,
			on_age: self.on_age,
			on_check: self.on_check,
		};

		let dispatcher = Dispatcher::spawn(callbacks, self.queue_capacity)
			.map_err(|e| Error::Dispatcher(Arc::new(e)))?;
		let shared = Arc::new(Shared {
			dispatcher,
			max_staleness: self.max_staleness.filter(|max| !max.is_zero()),
		});
		let listener = self.source.notifier().attach(shared.clone());
		tracing::debug!(
			overrides = self.overrides.len(),
			tags = self.tags.len(),
			seeded = self.seed.is_some(),
			"flagset attached to source"
		);

		Ok(Flagset {
			source: self.source,
			overrides: ArcSwap::from_pointee(self.overrides),
			default_tags: ArcSwap::from_pointee(self.tags),
			random: Random::new(self.seed),
			shared,
			listener,
			closed: AtomicBool::new(false),
		})
	}
}
