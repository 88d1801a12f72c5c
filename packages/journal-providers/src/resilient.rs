use std::sync::Arc;

use rand::Rng;
use time::Duration;

use crate::{EnrichmentProvider, Error, Prompt, Result, redact, task::EnrichmentTask};
use journal_domain::retry::RetryPolicy;

/// Upper bound on how far a `Retry-After` hint may push a retry out.
pub const MAX_RETRY_AFTER: Duration = Duration::days(1);

/// Source of the random component added to every backoff delay.
pub trait BackoffJitter: Send + Sync {
	fn sample(&self, max: Duration) -> Duration;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RandomJitter;
impl BackoffJitter for RandomJitter {
	fn sample(&self, max: Duration) -> Duration {
		let max_ms = max.whole_milliseconds().max(0) as i64;

		Duration::milliseconds(rand::thread_rng().gen_range(0..=max_ms))
	}
}

#[derive(Debug)]
pub struct Enriched<T> {
	pub output: T,
	pub provider_id: String,
	pub failed_over: bool,
}

/// How the queue should treat a call that produced no output.
#[derive(Debug)]
pub enum CallFailure {
	/// Retryable on every configured provider. Reschedule no sooner than `delay` from now.
	RetryLater { delay: Duration, error: Error },
	/// Not worth retrying. Drop the work item.
	Permanent { error: Error },
}
impl CallFailure {
	pub fn error(&self) -> &Error {
		match self {
			Self::RetryLater { error, .. } | Self::Permanent { error } => error,
		}
	}

	/// Redacted, length-capped error text suitable for logs and `last_error`.
	pub fn describe(&self) -> String {
		redact::redact_secrets(&self.error().to_string())
	}
}

/// Primary provider with a hard timeout, then one immediate fallback attempt on a retryable
/// failure. Never sleeps: exhausted calls come back as `RetryLater` for the queue to reschedule.
pub struct ResilientCaller {
	primary: Arc<dyn EnrichmentProvider>,
	fallback: Option<Arc<dyn EnrichmentProvider>>,
	policy: RetryPolicy,
	jitter: Arc<dyn BackoffJitter>,
}
impl ResilientCaller {
	pub fn new(
		primary: Arc<dyn EnrichmentProvider>,
		fallback: Option<Arc<dyn EnrichmentProvider>>,
		policy: RetryPolicy,
	) -> Self {
		Self { primary, fallback, policy, jitter: Arc::new(RandomJitter) }
	}

	pub fn from_config(cfg: &journal_config::Config) -> Result<Self> {
		let primary = crate::build_provider(&cfg.providers.primary)?;
		let fallback = cfg.providers.fallback.as_ref().map(crate::build_provider).transpose()?;

		Ok(Self::new(primary, fallback, RetryPolicy::from_config(&cfg.retry)))
	}

	pub fn with_jitter(mut self, jitter: Arc<dyn BackoffJitter>) -> Self {
		self.jitter = jitter;

		self
	}

	pub fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	/// Runs `task`. `attempt_count` is the number of failures already recorded for the work item
	/// and only drives the backoff of a `RetryLater` result.
	pub async fn call<T>(
		&self,
		task: &T,
		attempt_count: i32,
	) -> std::result::Result<Enriched<T::Output>, CallFailure>
	where
		T: EnrichmentTask,
	{
		let prompt = task.prompt();
		let primary_err = match attempt(self.primary.as_ref(), task, &prompt).await {
			Ok(output) => {
				return Ok(Enriched {
					output,
					provider_id: self.primary.provider_id().to_string(),
					failed_over: false,
				});
			},
			Err(err) if !err.is_retryable() => return Err(CallFailure::Permanent { error: err }),
			Err(err) => err,
		};
		let Some(fallback) = self.fallback.as_ref() else {
			return Err(self.retry_later(primary_err, None, attempt_count));
		};

		tracing::warn!(
			task = task.name(),
			primary = self.primary.provider_id(),
			fallback = fallback.provider_id(),
			error = %redact::redact_secrets(&primary_err.to_string()),
			"Primary provider failed. Trying fallback."
		);

		match attempt(fallback.as_ref(), task, &prompt).await {
			Ok(output) => Ok(Enriched {
				output,
				provider_id: fallback.provider_id().to_string(),
				failed_over: true,
			}),
			// A permanent fallback error does not drop work the primary may still serve.
			Err(fallback_err) =>
				Err(self.retry_later(primary_err, Some(fallback_err), attempt_count)),
		}
	}

	fn retry_later(
		&self,
		primary: Error,
		fallback: Option<Error>,
		attempt_count: i32,
	) -> CallFailure {
		let jitter = self.jitter.sample(self.policy.max_jitter);
		let mut delay = self.policy.delay_with_jitter(attempt_count, jitter);
		let hinted = [primary.retry_after(), fallback.as_ref().and_then(Error::retry_after)]
			.into_iter()
			.flatten()
			.max();

		if let Some(hint) = hinted {
			let hint = Duration::try_from(hint).unwrap_or(MAX_RETRY_AFTER).min(MAX_RETRY_AFTER);

			delay = delay.max(hint);
		}

		let error = match fallback {
			Some(fallback) if fallback.is_retryable() => fallback,
			_ => primary,
		};

		CallFailure::RetryLater { delay, error }
	}
}

async fn attempt<T>(
	provider: &dyn EnrichmentProvider,
	task: &T,
	prompt: &Prompt,
) -> Result<T::Output>
where
	T: EnrichmentTask,
{
	let provider_id = provider.provider_id();
	let timeout = provider.timeout();
	let completion = tokio::time::timeout(timeout, provider.complete(prompt))
		.await
		.map_err(|_| {
			Error::transient(provider_id, format!("Timed out after {} ms.", timeout.as_millis()))
		})??;

	// Malformed or out-of-range output is treated like a flaky upstream.
	task.parse(&completion).map_err(|err| {
		Error::transient(provider_id, format!("Invalid {} output: {err}", task.name()))
	})
}
