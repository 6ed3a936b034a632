/* src/flag/rate.rs */

use rand::{Rng, RngCore};

use super::FlagError;

/// A probability in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Rate(f64);

impl Rate {
	pub fn new(rate: f64) -> Result<Self, FlagError> {
		if (0.0..=1.0).contains(&rate) {
			Ok(Self(rate))
		} else {
			Err(FlagError::InvalidRate(rate))
		}
	}

	pub fn get(self) -> f64 {
		self.0
	}

	/// Draws one value in `[0, 1)` and compares it against the rate.
	pub(crate) fn draw(self, rng: &mut dyn RngCore) -> bool {
		rng.random::<f64>() < self.0
	}
}

impl TryFrom<f64> for Rate {
	type Error = FlagError;

	fn try_from(rate: f64) -> Result<Self, Self::Error> {
		Self::new(rate)
	}
}
