/* src/source/file.rs */

//!
//! Polling source backed by a `name,rate` text file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwapOption;
use tokio::fs;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

use super::{Lookup, Notifier, Source, SourceError};
use crate::flag::Flag;
use crate::snapshot::Snapshot;

#[cfg(feature = "serde")]
use crate::config::FileSourceConfig;

/// Shortest accepted poll interval. Shorter values, including zero, are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Flags and per-line errors from one parse.
#[derive(Debug, Default)]
pub struct ParseOutcome {
	pub flags: Vec<Flag>,
	pub errors: Vec<SourceError>,
}

/// Parses `name,rate` lines. Blank lines are skipped; malformed lines,
/// including lines that are not valid UTF-8, are reported individually
/// without affecting the rest.
pub fn parse(content: &[u8]) -> ParseOutcome {
	let mut outcome = ParseOutcome::default();
	for (index, raw) in content.split(|&b| b == b'\n').enumerate() {
		let parsed = match std::str::from_utf8(raw) {
			Ok(text) => {
				let line = text.trim();
				if line.is_empty() {
					continue;
				}
				parse_line(line).map_err(|reason| (line.to_string(), reason))
			}
			Err(e) => Err((
				String::from_utf8_lossy(raw).trim().to_string(),
				format!("invalid UTF-8: {e}"),
			)),
		};
		match parsed {
			Ok(flag) => outcome.flags.push(flag),
			Err((content, reason)) => outcome.errors.push(SourceError::Parse {
				line: index + 1,
				content,
				reason,
			}),
		}
	}
	outcome
}

fn parse_line(line: &str) -> Result<Flag, String> {
	let (name, rate) = line
		.split_once(',')
		.ok_or_else(|| "expected name,rate".to_string())?;
	let (name, rate) = (name.trim(), rate.trim());
	if name.is_empty() {
		return Err("empty flag name".to_string());
	}
	if rate.contains(',') {
		return Err("too many fields".to_string());
	}
	let rate: f64 = rate
		.parse()
		.map_err(|e| format!("invalid rate {rate:?}: {e}"))?;
	Flag::sample(name, rate).map_err(|e| e.to_string())
}

struct Shared {
	path: PathBuf,
	snapshot: ArcSwapOption<Snapshot>,
	notifier: Notifier,
}

impl Shared {
	async fn refresh(&self) -> Result<Arc<Snapshot>, SourceError> {
		let (content, modified) = match read(&self.path).await {
			Ok(read) => read,
			Err(e) => {
				tracing::debug!(path = ?self.path, error = %e, "flag file unreadable");
				let error = SourceError::Missing {
					path: self.path.clone(),
					source: Arc::new(e),
				};
				self.notifier.report_error(error.clone());
				return Err(error);
			}
		};

		let outcome = parse(&content);
		for error in outcome.errors {
			self.notifier.report_error(error);
		}

		let snapshot = Arc::new(Snapshot::new(outcome.flags, Some(modified)));
		self.snapshot.store(Some(Arc::clone(&snapshot)));
		tracing::debug!(path = ?self.path, flags = snapshot.len(), "flag snapshot replaced");

		let age = SystemTime::now()
			.duration_since(modified)
			.unwrap_or_default();
		self.notifier.report_age(age);
		Ok(snapshot)
	}
}

async fn read(path: &Path) -> std::io::Result<(Vec<u8>, SystemTime)> {
	let content = fs::read(path).await?;
	let modified = fs::metadata(path)
		.await
		.and_then(|meta| meta.modified())
		.unwrap_or_else(|_| SystemTime::now());
	Ok((content, modified))
}

/// Polls a file on a fixed interval and serves its latest parsed snapshot.
///
/// Polling starts immediately and runs until the source is dropped or
/// [`stop`](FileSource::stop)ped, independent of any engine using it.
/// A failed read keeps the previous snapshot.
pub struct FileSource {
	shared: Arc<Shared>,
	task: AbortHandle,
}

impl FileSource {
	/// Starts polling `path` on the current tokio runtime.
	///
	/// `interval` is raised to at least [`MIN_POLL_INTERVAL`].
	///
	/// # Panics
	///
	/// Outside a tokio runtime. See [`try_new`](FileSource::try_new).
	pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
		Self::start(path.into(), interval, &Handle::current())
	}

	/// Like [`new`](FileSource::new), but fails instead of panicking when no
	/// tokio runtime is running.
	pub fn try_new(path: impl Into<PathBuf>, interval: Duration) -> Result<Self, TryCurrentError> {
		let runtime = Handle::try_current()?;
		Ok(Self::start(path.into(), interval, &runtime))
	}

	fn start(path: PathBuf, interval: Duration, runtime: &Handle) -> Self {
		let interval = interval.max(MIN_POLL_INTERVAL);
		let shared = Arc::new(Shared {
			path,
			snapshot: ArcSwapOption::empty(),
			notifier: Notifier::new(),
		});

		let poller = Arc::clone(&shared);
		let handle = runtime.spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				ticker.tick().await;
				// Errors are already reported through the notifier.
				let _ = poller.refresh().await;
			}
		});

		Self {
			shared,
			task: handle.abort_handle(),
		}
	}

	#[cfg(feature = "serde")]
	pub fn from_config(config: &FileSourceConfig) -> Self {
		Self::new(
			config.path.clone(),
			Duration::from_millis(config.interval_ms),
		)
	}

	/// Runs one poll cycle now.
	pub async fn refresh(&self) -> Result<Arc<Snapshot>, SourceError> {
		self.shared.refresh().await
	}

	/// The currently served snapshot, if any read has succeeded.
	pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
		self.shared.snapshot.load_full()
	}

	pub fn path(&self) -> &Path {
		&self.shared.path
	}

	/// Stops polling. The last snapshot keeps being served.
	pub fn stop(&self) {
		self.task.abort();
	}
}

impl Source for FileSource {
	fn lookup(&self, name: &str) -> Lookup {
		match self.shared.snapshot.load().as_deref() {
			Some(snapshot) => Lookup::from_snapshot(snapshot, name),
			None => Lookup::error(SourceError::NotLoaded),
		}
	}

	fn notifier(&self) -> &Notifier {
		&self.shared.notifier
	}
}

impl Drop for FileSource {
	fn drop(&mut self) {
		self.task.abort();
	}
}

impl std::fmt::Debug for FileSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FileSource")
			.field("path", &self.shared.path)
			.field("loaded", &self.shared.snapshot.load().is_some())
			.field("notifier", &self.shared.notifier)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::flag::FlagKind;

	fn rate_of(flag: &Flag) -> f64 {
		match flag.kind() {
			FlagKind::Sample(rate) => rate.get(),
			other => panic!("expected sample flag, got {other:?}"),
		}
	}

	#[test]
	fn test_parse_valid_lines() {
		let outcome = parse(b"a,0\n\n  b , 0.25 \r\nc,1\n");
		assert!(outcome.errors.is_empty());
		let names: Vec<_> = outcome.flags.iter().map(|f| f.name().to_string()).collect();
		assert_eq!(names, ["a", "b", "c"]);
		assert_eq!(rate_of(&outcome.flags[1]), 0.25);
		assert_eq!(rate_of(&outcome.flags[2]), 1.0);
	}

	#[test]
	fn test_parse_isolates_bad_lines() {
		let outcome = parse(b"myflag,XXX\ngood,1\nnocomma\n,0.5\nhigh,1.5\nx,1,2\n");
		assert_eq!(outcome.flags.len(), 1);
		assert_eq!(outcome.flags[0].name(), "good");
		assert_eq!(outcome.errors.len(), 5);

		let first = outcome.errors[0].to_string();
		assert!(first.contains("parsing"), "{first}");
		assert!(first.contains("myflag,XXX"), "{first}");
		assert!(matches!(outcome.errors[0], SourceError::Parse { line: 1, .. }));
		assert!(matches!(outcome.errors[3], SourceError::Parse { line: 5, .. }));
	}

	#[test]
	fn test_parse_isolates_invalid_utf8() {
		let outcome = parse(b"a,1\n\xff\xfe,1\nb,1\n");
		let names: Vec<_> = outcome.flags.iter().map(|f| f.name().to_string()).collect();
		assert_eq!(names, ["a", "b"]);
		assert_eq!(outcome.errors.len(), 1);
		assert!(matches!(outcome.errors[0], SourceError::Parse { line: 2, .. }));
		let message = outcome.errors[0].to_string();
		assert!(message.contains("parsing"), "{message}");
		assert!(message.contains("UTF-8"), "{message}");
	}

	#[test]
	fn test_try_new_outside_runtime() {
		assert!(FileSource::try_new("flags.csv", Duration::from_secs(1)).is_err());
	}

	#[test]
	fn test_parse_empty() {
		let outcome = parse(b"\n   \n");
		assert!(outcome.flags.is_empty());
		assert!(outcome.errors.is_empty());
	}

	#[test]
	fn test_parse_duplicate_last_wins() {
		let snapshot = Snapshot::new(parse(b"a,0\na,1\n").flags, None);
		assert_eq!(snapshot.len(), 1);
		assert_eq!(rate_of(&snapshot.get("a").unwrap()), 1.0);
	}
}
