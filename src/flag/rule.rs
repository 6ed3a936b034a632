/* src/flag/rule.rs */

use rand::RngCore;

use super::{Rate, Tags};

/// Matches one tag key against a set of accepted values.
#[derive(Debug, Clone, PartialEq)]
pub struct TagMatch {
	pub key: String,
	/// Accepted values. Empty means the key only has to be present.
	pub values: Vec<String>,
}

impl TagMatch {
	pub fn present(key: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			values: Vec::new(),
		}
	}

	pub fn any_of<I, V>(key: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<String>,
	{
		Self {
			key: key.into(),
			values: values.into_iter().map(Into::into).collect(),
		}
	}

	pub fn matches(&self, tags: &Tags) -> bool {
		match tags.get(&self.key) {
			None => false,
			Some(_) if self.values.is_empty() => true,
			Some(value) => self.values.iter().any(|v| v == value),
		}
	}
}

/// What a matched rule decides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
	On,
	Off,
	Sample(Rate),
}

impl Outcome {
	pub(crate) fn decide(self, rng: &mut dyn RngCore) -> bool {
		match self {
			Outcome::On => true,
			Outcome::Off => false,
			Outcome::Sample(rate) => rate.draw(rng),
		}
	}
}

/// A rule matches when all of its tag matches hold.
#[derive(Debug, Clone, PartialEq)]
pub struct TagRule {
	pub matches: Vec<TagMatch>,
	pub outcome: Outcome,
}

impl TagRule {
	pub fn new(matches: Vec<TagMatch>, outcome: Outcome) -> Self {
		Self { matches, outcome }
	}

	pub fn matches(&self, tags: &Tags) -> bool {
		self.matches.iter().all(|m| m.matches(tags))
	}
}
