use std::time::Duration;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Provider {provider_id} is rate limited: {message}")]
	RateLimited { provider_id: String, retry_after: Option<Duration>, message: String },
	#[error("Provider {provider_id} failed transiently: {message}")]
	Transient { provider_id: String, message: String },
	#[error("Provider {provider_id} failed permanently: {message}")]
	Permanent { provider_id: String, message: String },
	#[error("{message}")]
	InvalidConfig { message: String },
}
impl Error {
	pub fn transient(provider_id: &str, message: impl Into<String>) -> Self {
		Self::Transient { provider_id: provider_id.to_string(), message: message.into() }
	}

	pub fn permanent(provider_id: &str, message: impl Into<String>) -> Self {
		Self::Permanent { provider_id: provider_id.to_string(), message: message.into() }
	}

	/// Rate limits and transient failures are absorbed by fail-over and rescheduling.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::RateLimited { .. } | Self::Transient { .. })
	}

	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::RateLimited { retry_after, .. } => *retry_after,
			_ => None,
		}
	}

	/// Maps a transport-level failure. Connection, timeout and body decode errors are transient.
	pub(crate) fn from_reqwest(provider_id: &str, err: reqwest::Error) -> Self {
		if let Some(status) = err.status() {
			return classify_status(provider_id, status, None, err.to_string());
		}
		if err.is_builder() {
			return Self::permanent(provider_id, err.to_string());
		}

		Self::transient(provider_id, err.to_string())
	}
}

pub(crate) fn classify_status(
	provider_id: &str,
	status: reqwest::StatusCode,
	retry_after: Option<Duration>,
	message: String,
) -> Error {
	match status.as_u16() {
		429 => Error::RateLimited { provider_id: provider_id.to_string(), retry_after, message },
		408 | 500..=599 => Error::transient(provider_id, message),
		_ => Error::permanent(provider_id, message),
	}
}
