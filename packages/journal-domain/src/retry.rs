use time::Duration;

const MAX_BACKOFF_EXPONENT: u32 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_retries: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub max_jitter: Duration,
}

/// What the queue does with a row whose analysis attempt just failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
	/// Keep the row and try again later with the incremented attempt count.
	Reschedule { attempt_count: i32 },
	/// Drop the row; `attempts` failed attempts were made.
	GiveUp { attempts: i32 },
}

impl RetryPolicy {
	pub fn from_config(cfg: &journal_config::Retry) -> Self {
		Self {
			max_retries: cfg.max_retries,
			base_delay: millis(cfg.base_delay_ms),
			max_delay: millis(cfg.max_delay_ms),
			max_jitter: millis(cfg.max_jitter_ms),
		}
	}

	/// `min(max_delay, base_delay * 2^attempt_count)`, before jitter.
	///
	/// `attempt_count` is the number of failures already recorded on the queue row when the failing
	/// attempt was claimed.
	pub fn backoff(&self, attempt_count: i32) -> Duration {
		let exp = u32::try_from(attempt_count.max(0)).unwrap_or(0).min(MAX_BACKOFF_EXPONENT);
		let factor = 1_i32 << exp;
		let delay = self.base_delay.saturating_mul(factor);

		if delay > self.max_delay { self.max_delay } else { delay }
	}

	/// Adds `jitter` (clamped to `max_jitter`) to the exponential delay.
	pub fn delay_with_jitter(&self, attempt_count: i32, jitter: Duration) -> Duration {
		let jitter = jitter.clamp(Duration::ZERO, self.max_jitter);

		self.backoff(attempt_count).saturating_add(jitter)
	}

	pub fn after_failure(&self, attempt_count: i32) -> RetryDecision {
		let attempts = attempt_count.max(0).saturating_add(1);
		let limit = i32::try_from(self.max_retries).unwrap_or(i32::MAX);

		if attempts >= limit {
			RetryDecision::GiveUp { attempts }
		} else {
			RetryDecision::Reschedule { attempt_count: attempts }
		}
	}
}

fn millis(value: u64) -> Duration {
	Duration::milliseconds(i64::try_from(value).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn policy() -> RetryPolicy {
		RetryPolicy {
			max_retries: 3,
			base_delay: Duration::seconds(2),
			max_delay: Duration::seconds(30),
			max_jitter: Duration::milliseconds(500),
		}
	}

	#[test]
	fn backoff_doubles_until_capped() {
		let policy = policy();

		assert_eq!(policy.backoff(0), Duration::seconds(2));
		assert_eq!(policy.backoff(1), Duration::seconds(4));
		assert_eq!(policy.backoff(3), Duration::seconds(16));
		assert_eq!(policy.backoff(4), Duration::seconds(30));
		assert_eq!(policy.backoff(i32::MAX), Duration::seconds(30));
	}

	#[test]
	fn negative_attempt_counts_use_the_base_delay() {
		assert_eq!(policy().backoff(-4), Duration::seconds(2));
	}

	#[test]
	fn jitter_is_clamped() {
		let policy = policy();

		assert_eq!(
			policy.delay_with_jitter(0, Duration::seconds(10)),
			Duration::milliseconds(2_500)
		);
		assert_eq!(policy.delay_with_jitter(0, Duration::seconds(-1)), Duration::seconds(2));
	}

	#[test]
	fn gives_up_after_max_retries_failures() {
		let policy = policy();

		assert_eq!(policy.after_failure(0), RetryDecision::Reschedule { attempt_count: 1 });
		assert_eq!(policy.after_failure(1), RetryDecision::Reschedule { attempt_count: 2 });
		assert_eq!(policy.after_failure(2), RetryDecision::GiveUp { attempts: 3 });
	}
}
