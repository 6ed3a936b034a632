/* src/lib.rs */

//!
//! Feature flag evaluation backed by a periodically refreshed source.
//!
//! - **flag**: Decision units (constant, sampled, tag rules, custom).
//! - **source**: The [`Source`](source::Source) contract, shared notifier
//!   plumbing, and the in-memory and polling file sources.
//! - **engine**: [`Flagset`], which resolves overrides, merges tags, samples
//!   and tracks staleness without blocking on I/O.
//! - **dispatch**: Per-engine asynchronous delivery of errors, ages and checks.
//!
//! ## Feature Flags
//!
//! - `file`: Enables [`source::FileSource`] (requires a tokio runtime).
//! - `logging`: Enables [`FlagsetBuilder::log_errors`] via the `log` crate.
//! - `serde`: Enables the [`config`] module.
//! - `full`: Enables all features.
//!
//! ## Basic Usage
//!
//! ```
//! use std::sync::Arc;
//! use flagset::{Flag, Flagset, source::MemorySource};
//!
//! let source = Arc::new(MemorySource::with_flags([Flag::constant("new-ui", true)]));
//! let flags = Flagset::builder(source).override_flag("beta", false).build().unwrap();
//! assert!(flags.enabled("new-ui"));
//! assert!(!flags.enabled("beta"));
//! ```

pub mod dispatch;
pub mod duration;
pub mod engine;
pub mod error;
pub mod flag;
pub mod snapshot;
pub mod source;

#[cfg(feature = "serde")]
pub mod config;

pub use dispatch::{AgeKind, Notification};
pub use engine::{Flagset, FlagsetBuilder};
pub use error::Error;
pub use flag::{Flag, FlagError, FlagKind, Rate, Tags};
pub use snapshot::Snapshot;
