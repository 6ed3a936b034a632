/* src/duration.rs */

//!
//! Compact duration rendering, e.g. `1m2s`, `1h0m0s`, `1.5ms`.

use std::fmt;
use std::time::Duration;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Displays a [`Duration`] in the compact `XhYmZs` form used by error messages.
///
/// Durations under a second use the largest fitting sub-second unit
/// (`ms`, `µs`, `ns`). Fractions are printed without trailing zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compact(pub Duration);

/// Shorthand for `Compact(*d)`.
pub fn compact(d: &Duration) -> Compact {
	Compact(*d)
}

impl fmt::Display for Compact {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let nanos = self.0.as_nanos();
		if nanos == 0 {
			return f.write_str("0s");
		}

		if nanos < NANOS_PER_SEC {
			let (unit, per, digits) = if nanos < NANOS_PER_MICRO {
				("ns", 1, 0)
			} else if nanos < NANOS_PER_MILLI {
				("µs", NANOS_PER_MICRO, 3)
			} else {
				("ms", NANOS_PER_MILLI, 6)
			};
			write!(f, "{}", nanos / per)?;
			write_fraction(f, nanos % per, digits)?;
			return f.write_str(unit);
		}

		let secs = self.0.as_secs();
		let hours = secs / 3600;
		let minutes = (secs / 60) % 60;
		let seconds = secs % 60;

		if hours > 0 {
			write!(f, "{hours}h")?;
		}
		if hours > 0 || minutes > 0 {
			write!(f, "{minutes}m")?;
		}
		write!(f, "{seconds}")?;
		write_fraction(f, u128::from(self.0.subsec_nanos()), 9)?;
		f.write_str("s")
	}
}

fn write_fraction(f: &mut fmt::Formatter<'_>, value: u128, digits: usize) -> fmt::Result {
	if value == 0 || digits == 0 {
		return Ok(());
	}
	let padded = format!("{value:0digits$}");
	write!(f, ".{}", padded.trim_end_matches('0'))
}
