/* src/flag/error.rs */

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlagError {
	/// A sample rate fell outside `[0, 1]` or was not a number.
	#[error("rate {0} is outside [0, 1]")]
	InvalidRate(f64),
	/// Advisory error raised by a custom evaluator.
	#[error("{0}")]
	Custom(String),
}
