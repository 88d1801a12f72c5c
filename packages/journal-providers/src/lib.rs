//! AI provider clients for journal enrichment and the fail-over wrapper around them.

pub mod gemini;
pub mod openai;
pub mod redact;
pub mod resilient;
pub mod task;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use reqwest::{
	Client, Response,
	header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER},
};
use serde_json::{Map, Value};

use journal_config::{LlmProviderConfig, ProviderKind};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A system instruction plus the user content it applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
	pub system: String,
	pub user: String,
}

/// One upstream model endpoint. Implementations return the raw completion text.
pub trait EnrichmentProvider: Send + Sync {
	fn provider_id(&self) -> &str;

	/// Hard deadline the fail-over wrapper enforces around `complete`.
	fn timeout(&self) -> Duration;

	fn complete<'a>(&'a self, prompt: &'a Prompt) -> BoxFuture<'a, Result<String>>;
}

pub fn build_provider(cfg: &LlmProviderConfig) -> Result<Arc<dyn EnrichmentProvider>> {
	let provider: Arc<dyn EnrichmentProvider> = match cfg.kind {
		ProviderKind::Openai => Arc::new(openai::OpenAiProvider::new(cfg.clone())?),
		ProviderKind::Gemini => Arc::new(gemini::GeminiProvider::new(cfg.clone())?),
	};

	Ok(provider)
}

/// Builds request headers for a provider. OpenAI-compatible endpoints take a bearer token, Gemini
/// takes `x-goog-api-key`.
pub fn auth_headers(
	kind: ProviderKind,
	api_key: &str,
	default_headers: &Map<String, Value>,
) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();
	let key = match kind {
		ProviderKind::Openai => (AUTHORIZATION, format!("Bearer {api_key}")),
		ProviderKind::Gemini => (HeaderName::from_static("x-goog-api-key"), api_key.to_string()),
	};

	headers.insert(key.0, header_value(&key.1)?);

	for (name, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {name} must be a string."),
			});
		};
		let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| Error::InvalidConfig {
			message: format!("Invalid default header name {name:?}: {err}."),
		})?;

		headers.insert(name, header_value(raw)?);
	}

	Ok(headers)
}

fn header_value(raw: &str) -> Result<HeaderValue> {
	raw.parse().map_err(|_| Error::InvalidConfig {
		message: "Header values must be visible ASCII.".to_string(),
	})
}

fn http_client(cfg: &LlmProviderConfig) -> Result<Client> {
	Client::builder()
		.timeout(Duration::from_millis(cfg.timeout_ms))
		.build()
		.map_err(|err| Error::InvalidConfig { message: format!("Failed to build HTTP client: {err}.") })
}

/// Posts `body` and returns the decoded JSON, classifying non-success statuses.
async fn post_json(
	client: &Client,
	provider_id: &str,
	url: &str,
	headers: HeaderMap,
	body: &Value,
) -> Result<Value> {
	let res = client
		.post(url)
		.headers(headers)
		.json(body)
		.send()
		.await
		.map_err(|err| Error::from_reqwest(provider_id, err))?;
	let status = res.status();

	if !status.is_success() {
		let retry_after = retry_after(&res);
		let text = res.text().await.unwrap_or_default();
		let message = redact::redact_secrets(&format!("HTTP {status}: {text}"));

		return Err(error::classify_status(provider_id, status, retry_after, message));
	}

	res.json().await.map_err(|err| Error::from_reqwest(provider_id, err))
}

/// Only the delta-seconds form of `Retry-After` is honored.
fn retry_after(res: &Response) -> Option<Duration> {
	let raw = res.headers().get(RETRY_AFTER)?.to_str().ok()?;

	raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}
