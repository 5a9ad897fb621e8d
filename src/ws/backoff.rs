// std
use std::time::Duration;
// crates.io
use rand::Rng;

/// Jittered exponential reconnect delay.
///
/// The delay for attempt `n` is `min * factor^n`, moved up or down by a random share of
/// itself bounded by `jitter`, and capped at `max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Backoff {
	/// Base delay for the first attempt.
	pub min: Duration,
	/// Upper bound for any delay.
	pub max: Duration,
	/// Growth factor per attempt.
	pub factor: f64,
	/// Random deviation as a fraction of the computed delay, in `0.0..=1.0`.
	pub jitter: f64,
}
impl Default for Backoff {
	fn default() -> Self {
		Self { min: Duration::from_secs(1), max: Duration::from_secs(30), factor: 1.2, jitter: 0.5 }
	}
}
impl Backoff {
	/// Delay to wait before reconnect attempt `attempt` (0-based).
	pub fn delay(&self, attempt: u32) -> Duration {
		let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
		let mut secs = self.min.as_secs_f64() * self.factor.powi(exponent);
		let jitter = if self.jitter.is_nan() { 0.0 } else { self.jitter.clamp(0.0, 1.0) };

		if jitter > 0.0 && secs.is_finite() {
			let mut rng = rand::rng();
			let deviation = rng.random::<f64>() * jitter * secs;

			secs = if rng.random_bool(0.5) { secs - deviation } else { secs + deviation };
		}

		// `0 * inf` and a NaN factor both land here.
		if secs.is_nan() {
			return self.max;
		}

		Duration::try_from_secs_f64(secs.clamp(0.0, self.max.as_secs_f64())).unwrap_or(self.max)
	}
}
