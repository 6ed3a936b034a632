/* src/engine/random.rs */

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Random draws for sampled flags.
pub(crate) enum Random {
	/// Reproducible sequence. Draws are serialized by the lock.
	Seeded(Mutex<StdRng>),
	/// Non-reproducible thread-local entropy.
	Entropy,
}

impl Random {
	pub(crate) fn new(seed: Option<u64>) -> Self {
		match seed {
			Some(seed) => Random::Seeded(Mutex::new(StdRng::seed_from_u64(seed))),
			None => Random::Entropy,
		}
	}

	pub(crate) fn with<R>(&self, f: impl FnOnce(&mut dyn RngCore) -> R) -> R {
		match self {
			Random::Seeded(rng) => {
				let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
				f(&mut *rng)
			}
			Random::Entropy => f(&mut rand::rng()),
		}
	}
}
