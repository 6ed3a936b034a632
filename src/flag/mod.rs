/* src/flag/mod.rs */

//!
//! Flags: named decision units evaluated to a boolean.
//!
//! - [`FlagKind::Constant`] - always the same value.
//! - [`FlagKind::Sample`] - on with probability [`Rate`].
//! - [`FlagKind::Tags`] - first matching [`TagRule`] decides.
//! - [`FlagKind::Custom`] - user supplied [`Evaluate`] implementation.

mod error;
mod rate;
mod rule;

pub use error::FlagError;
pub use rate::Rate;
pub use rule::{Outcome, TagMatch, TagRule};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand::RngCore;

/// Request tags used for targeting.
pub type Tags = HashMap<String, String>;

/// Result of evaluating a flag.
///
/// `error` is advisory: a flag may be enabled and still report a warning.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
	pub enabled: bool,
	pub error: Option<FlagError>,
}

impl Evaluation {
	pub fn new(enabled: bool) -> Self {
		Self {
			enabled,
			error: None,
		}
	}

	pub fn with_error(enabled: bool, error: FlagError) -> Self {
		Self {
			enabled,
			error: Some(error),
		}
	}
}

/// Extension point for flag kinds not covered by the built-in variants.
///
/// Implementations must draw from `rng` at most a fixed number of times per
/// call so seeded engines stay reproducible.
pub trait Evaluate: Send + Sync {
	fn evaluate(&self, rng: &mut dyn RngCore, tags: &Tags) -> Evaluation;
}

/// How a flag decides.
#[derive(Clone)]
pub enum FlagKind {
	Constant(bool),
	Sample(Rate),
	Tags(Vec<TagRule>),
	Custom(Arc<dyn Evaluate>),
}

impl fmt::Debug for FlagKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FlagKind::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
			FlagKind::Sample(rate) => f.debug_tuple("Sample").field(rate).finish(),
			FlagKind::Tags(rules) => f.debug_tuple("Tags").field(rules).finish(),
			FlagKind::Custom(_) => f.write_str("Custom(..)"),
		}
	}
}

/// A named flag. Immutable once built.
#[derive(Debug, Clone)]
pub struct Flag {
	name: String,
	kind: FlagKind,
}

impl Flag {
	pub fn new(name: impl Into<String>, kind: FlagKind) -> Self {
		Self {
			name: name.into(),
			kind,
		}
	}

	pub fn constant(name: impl Into<String>, value: bool) -> Self {
		Self::new(name, FlagKind::Constant(value))
	}

	/// Creates a sampled flag, rejecting rates outside `[0, 1]`.
	pub fn sample(name: impl Into<String>, rate: f64) -> Result<Self, FlagError> {
		Ok(Self::new(name, FlagKind::Sample(Rate::new(rate)?)))
	}

	pub fn tags(name: impl Into<String>, rules: Vec<TagRule>) -> Self {
		Self::new(name, FlagKind::Tags(rules))
	}

	pub fn custom(name: impl Into<String>, evaluator: Arc<dyn Evaluate>) -> Self {
		Self::new(name, FlagKind::Custom(evaluator))
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn kind(&self) -> &FlagKind {
		&self.kind
	}

	/// Evaluates the flag.
	///
	/// Sampled flags draw exactly one value from `rng`. Tag flags draw once
	/// only when the matching rule samples, and not at all when no rule
	/// matches.
	pub fn evaluate(&self, rng: &mut dyn RngCore, tags: &Tags) -> Evaluation {
		match &self.kind {
			FlagKind::Constant(value) => Evaluation::new(*value),
			FlagKind::Sample(rate) => Evaluation::new(rate.draw(rng)),
			FlagKind::Tags(rules) => match rules.iter().find(|rule| rule.matches(tags)) {
				Some(rule) => Evaluation::new(rule.outcome.decide(rng)),
				None => Evaluation::new(false),
			},
			FlagKind::Custom(evaluator) => evaluator.evaluate(rng, tags),
		}
	}
}
