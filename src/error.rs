/* src/error.rs */

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::duration::compact;
use crate::flag::FlagError;
use crate::source::SourceError;

/// Errors reported by a [`Flagset`](crate::Flagset).
///
/// Evaluation never returns these to the caller; they are delivered to the
/// error callback asynchronously.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
	/// The flag is neither overridden nor known to the source.
	#[error("unknown flag: {name}")]
	UnknownFlag { name: String },

	/// The source data is older than the configured maximum staleness.
	#[error("flag data is stale: {} old, over max staleness {}", compact(.age), compact(.max))]
	Stale { age: Duration, max: Duration },

	/// The source reported a problem.
	#[error(transparent)]
	Source(#[from] SourceError),

	/// A flag returned an advisory error alongside its result.
	#[error("flag {name}: {source}")]
	Flag {
		name: String,
		#[source]
		source: FlagError,
	},

	/// The notification dispatcher could not be started.
	#[error("failed to start notification dispatcher: {0}")]
	Dispatcher(Arc<io::Error>),
}
