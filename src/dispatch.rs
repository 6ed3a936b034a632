/* src/dispatch.rs */

//!
//! Asynchronous delivery of engine notifications.
//!
//! Each engine owns one [`Dispatcher`]: a bounded queue drained by a single
//! consumer thread, so callbacks never run on the evaluating thread and never
//! run concurrently with each other.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::Semaphore;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::Error;

/// Default notification queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Where an age measurement came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeKind {
	/// Computed by the engine from a lookup's last-modified timestamp.
	Backend,
	/// Pushed by the source's own background activity.
	Source,
}

/// An event queued for delivery.
#[derive(Debug, Clone)]
pub enum Notification {
	Error(Error),
	Age { kind: AgeKind, age: Duration },
	Check { name: String, enabled: bool },
}

pub type ErrorCallback = Arc<dyn Fn(Error) + Send + Sync>;
pub type AgeCallback = Arc<dyn Fn(AgeKind, Duration) + Send + Sync>;
pub type CheckCallback = Arc<dyn Fn(&str, bool) + Send + Sync>;

/// The callbacks one engine delivers to.
#[derive(Clone, Default)]
pub struct Callbacks {
	pub on_error: Option<ErrorCallback>,
	pub on_age: Option<AgeCallback>,
	pub on_check: Option<CheckCallback>,
}

impl Callbacks {
	/// Whether a notification would reach any callback.
	pub(crate) fn wants(&self, notification: &Notification) -> bool {
		match notification {
			Notification::Error(_) => self.on_error.is_some(),
			Notification::Age { .. } => self.on_age.is_some(),
			Notification::Check { .. } => self.on_check.is_some(),
		}
	}

	fn deliver(&self, notification: Notification) {
		match notification {
			Notification::Error(error) => {
				if let Some(cb) = &self.on_error {
					cb(error);
				}
			}
			Notification::Age { kind, age } => {
				if let Some(cb) = &self.on_age {
					cb(kind, age);
				}
			}
			Notification::Check { name, enabled } => {
				if let Some(cb) = &self.on_check {
					cb(&name, enabled);
				}
			}
		}
	}
}

struct Gate {
	closed: AtomicBool,
	/// Held while a callback runs.
	running: Mutex<()>,
}

/// Single-consumer notification queue.
pub(crate) struct Dispatcher {
	tx: ArcSwapOption<mpsc::Sender<Notification>>,
	callbacks: Callbacks,
	gate: Arc<Gate>,
	consumer: ThreadId,
}

impl Dispatcher {
	/// Starts the consumer thread. `capacity` is clamped to what the channel
	/// supports.
	pub(crate) fn spawn(callbacks: Callbacks, capacity: usize) -> io::Result<Self> {
		let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
		let (tx, mut rx) = mpsc::channel::<Notification>(capacity);
		let gate = Arc::new(Gate {
			closed: AtomicBool::new(false),
			running: Mutex::new(()),
		});

		let consumer_gate = Arc::clone(&gate);
		let consumer_callbacks = callbacks.clone();
		let handle = thread::Builder::new()
			.name("flagset-dispatch".to_string())
			.spawn(move || {
				while let Some(notification) = rx.blocking_recv() {
					let _running = consumer_gate
						.running
						.lock()
						.unwrap_or_else(PoisonError::into_inner);
					if consumer_gate.closed.load(Ordering::Acquire) {
						break;
					}
					let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
						consumer_callbacks.deliver(notification)
					}));
					if delivered.is_err() {
						tracing::error!("flagset callback panicked");
					}
				}
				tracing::debug!("flagset dispatcher stopped");
			})?;

		Ok(Self {
			tx: ArcSwapOption::from_pointee(tx),
			callbacks,
			gate,
			consumer: handle.thread().id(),
		})
	}

	/// Queues a notification without blocking. Dropped when the queue is full,
	/// the dispatcher is closed, or no callback wants it.
	pub(crate) fn send(&self, notification: Notification) {
		if !self.callbacks.wants(&notification) {
			return;
		}
		let tx = self.tx.load();
		let Some(tx) = tx.as_ref() else {
			return;
		};
		match tx.try_send(notification) {
			Ok(()) => {}
			Err(TrySendError::Full(dropped)) => {
				tracing::warn!(?dropped, "flagset notification queue full, dropping");
			}
			Err(TrySendError::Closed(_)) => {}
		}
	}

	/// Stops delivery. Once this returns no callback is running or will run,
	/// unless called from a callback itself.
	pub(crate) fn close(&self) {
		if self.gate.closed.swap(true, Ordering::AcqRel) {
			return;
		}
		self.tx.store(None);
		if thread::current().id() != self.consumer {
			drop(
				self.gate
					.running
					.lock()
					.unwrap_or_else(PoisonError::into_inner),
			);
		}
	}

	pub(crate) fn is_closed(&self) -> bool {
		self.gate.closed.load(Ordering::Acquire)
	}
}

impl Drop for Dispatcher {
	fn drop(&mut self) {
		self.close();
	}
}
