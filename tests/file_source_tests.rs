/* tests/file_source_tests.rs */

#![cfg(all(feature = "file", feature = "logging"))]

use flagset::source::{FileSource, Source, SourceError};
use flagset::{AgeKind, Error, Flagset};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Captures formatted log records.
#[derive(Default)]
struct Capture {
	lines: Mutex<Vec<String>>,
}

impl Capture {
	fn take(&self) -> Vec<String> {
		std::mem::take(&mut *self.lines.lock().unwrap())
	}
}

impl log::Log for Capture {
	fn enabled(&self, _: &log::Metadata) -> bool {
		true
	}

	fn log(&self, record: &log::Record) {
		self.lines
			.lock()
			.unwrap()
			.push(format!("{} {}", record.target(), record.args()));
	}

	fn flush(&self) {}
}

/// Replaces the file in one rename so the poller never reads a partial write.
fn write_atomic(path: &Path, content: &str) {
	let dir = path.parent().unwrap();
	let mut tmp = tempfile::NamedTempFile::new_in(dir).unwrap();
	tmp.write_all(content.as_bytes()).unwrap();
	tmp.persist(path).unwrap();
}

async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
	for _ in 0..100 {
		if cond() {
			return true;
		}
		tokio::time::sleep(Duration::from_millis(20)).await;
	}
	cond()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_source_end_to_end() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("flags.csv");

	let logger = Arc::new(Capture::default());
	let source = Arc::new(FileSource::new(&path, Duration::from_millis(10)));
	let flags = Flagset::builder(source.clone())
		.log_errors(logger.clone())
		.build()
		.unwrap();

	// No file yet: missing errors.
	tokio::time::sleep(Duration::from_millis(80)).await;
	let lines = logger.take();
	assert!(!lines.is_empty());
	assert!(lines.iter().all(|l| l.contains("missing")), "{lines:?}");
	assert!(lines.iter().all(|l| l.starts_with("flagset ")));

	// Malformed content: parse errors.
	write_atomic(&path, "myflag,XXX");
	assert!(
		wait_until(|| logger
			.lines
			.lock()
			.unwrap()
			.iter()
			.any(|l| l.contains("parsing") && l.contains("myflag,XXX")))
		.await
	);

	write_atomic(&path, "myflag,0");
	assert!(wait_until(|| source.snapshot().is_some_and(|s| s.get("myflag").is_some())).await);
	assert!(!flags.enabled("myflag"));

	write_atomic(&path, "myflag,1");
	assert!(wait_until(|| flags.enabled("myflag")).await);

	// Valid file: the error stream goes quiet.
	tokio::time::sleep(Duration::from_millis(80)).await;
	logger.take();
	tokio::time::sleep(Duration::from_millis(80)).await;
	assert!(logger.take().is_empty());

	assert!(!flags.enabled("fakeflag"));
	assert!(
		wait_until(|| logger
			.lines
			.lock()
			.unwrap()
			.iter()
			.any(|l| l.contains("fakeflag")))
		.await
	);
	let lines = logger.take();
	assert_eq!(lines.len(), 1, "{lines:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_source_partial_parse() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("flags.csv");
	write_atomic(&path, "a,1\nbad line\n\nb,0.0\n");

	let source = FileSource::new(&path, Duration::from_secs(3600));
	let errors = Arc::new(Mutex::new(Vec::new()));
	let sink = errors.clone();
	let source = Arc::new(source);
	let flags = Flagset::builder(source.clone())
		.on_error(move |e: Error| sink.lock().unwrap().push(e.to_string()))
		.build()
		.unwrap();

	let snapshot = source.refresh().await.unwrap();
	assert_eq!(snapshot.len(), 2);
	assert!(flags.enabled("a"));
	assert!(!flags.enabled("b"));

	assert!(wait_until(|| !errors.lock().unwrap().is_empty()).await);
	let errors = errors.lock().unwrap();
	assert!(errors.iter().all(|e| e.contains("parsing") && e.contains("bad line")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_source_keeps_snapshot_on_read_failure() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("flags.csv");
	write_atomic(&path, "a,1\n");

	let source = FileSource::new(&path, Duration::from_secs(3600));
	source.refresh().await.unwrap();

	std::fs::remove_file(&path).unwrap();
	let err = source.refresh().await.unwrap_err();
	assert!(matches!(err, SourceError::Missing { .. }));
	assert!(err.to_string().contains("missing"));

	let lookup = source.lookup("a");
	assert!(lookup.flag.is_some());
	assert!(lookup.error.is_none());
	assert!(lookup.last_modified.is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_source_not_loaded() {
	let dir = tempfile::tempdir().unwrap();
	let source = FileSource::new(dir.path().join("absent.csv"), Duration::from_secs(3600));

	let lookup = source.lookup("a");
	assert!(lookup.flag.is_none());
	assert!(matches!(lookup.error, Some(SourceError::NotLoaded)));
	assert!(source.snapshot().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_source_pushes_age() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("flags.csv");
	write_atomic(&path, "a,1\n");

	let source = Arc::new(FileSource::new(&path, Duration::from_secs(3600)));
	let ages = Arc::new(Mutex::new(Vec::new()));
	let sink = ages.clone();
	let _flags = Flagset::builder(source.clone())
		.on_age(move |kind, age| sink.lock().unwrap().push((kind, age)))
		.build()
		.unwrap();

	source.refresh().await.unwrap();
	assert!(
		wait_until(|| ages
			.lock()
			.unwrap()
			.iter()
			.any(|(kind, _)| *kind == AgeKind::Source))
		.await
	);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_source_outlives_engine() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("flags.csv");

	let source = Arc::new(FileSource::new(&path, Duration::from_millis(10)));
	let first = Flagset::builder(source.clone())
		.discard_errors()
		.build()
		.unwrap();
	let errors = Arc::new(Mutex::new(0usize));
	let sink = errors.clone();
	let second = Flagset::builder(source.clone())
		.on_error(move |_| *sink.lock().unwrap() += 1)
		.build()
		.unwrap();
	assert_eq!(source.notifier().len(), 2);

	first.close();
	assert_eq!(source.notifier().len(), 1);

	// The poller keeps reporting the missing file to the remaining engine.
	let before = *errors.lock().unwrap();
	assert!(wait_until(|| *errors.lock().unwrap() > before + 1).await);

	write_atomic(&path, "a,1\n");
	assert!(wait_until(|| second.enabled("a")).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_source_invalid_utf8_line() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("flags.csv");
	std::fs::write(&path, b"a,1\n\xff\xfe,1\nb,1\n").unwrap();

	let source = FileSource::new(&path, Duration::from_secs(3600));
	let snapshot = source.refresh().await.unwrap();
	assert_eq!(snapshot.len(), 2);
	assert!(source.lookup("a").flag.is_some());
	assert!(source.lookup("b").flag.is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_source_zero_interval_polls() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("flags.csv");
	write_atomic(&path, "a,1\n");

	let source = FileSource::new(&path, Duration::ZERO);
	assert!(wait_until(|| source.snapshot().is_some()).await);
	assert!(source.lookup("a").flag.is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_source_stop_keeps_snapshot() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("flags.csv");
	write_atomic(&path, "a,1\n");

	let source = FileSource::new(&path, Duration::from_millis(10));
	assert!(wait_until(|| source.snapshot().is_some()).await);
	source.stop();
	// Let an in-flight poll finish before changing the file.
	tokio::time::sleep(Duration::from_millis(30)).await;

	write_atomic(&path, "b,1\n");
	tokio::time::sleep(Duration::from_millis(100)).await;
	assert!(source.lookup("a").flag.is_some());
	assert!(source.lookup("b").flag.is_none());
}
