use reqwest::{Client, header::HeaderMap};
use serde_json::Value;

use crate::{BoxFuture, EnrichmentProvider, Error, Prompt, Result};
use journal_config::LlmProviderConfig;

/// Chat-completions compatible endpoint.
pub struct OpenAiProvider {
	cfg: LlmProviderConfig,
	client: Client,
	headers: HeaderMap,
}
impl OpenAiProvider {
	pub fn new(cfg: LlmProviderConfig) -> Result<Self> {
		let client = crate::http_client(&cfg)?;
		let headers = crate::auth_headers(cfg.kind, &cfg.api_key, &cfg.default_headers)?;

		Ok(Self { cfg, client, headers })
	}

	fn request_body(&self, prompt: &Prompt) -> Value {
		serde_json::json!({
			"model": self.cfg.model,
			"temperature": self.cfg.temperature,
			"response_format": { "type": "json_object" },
			"messages": [
				{ "role": "system", "content": prompt.system },
				{ "role": "user", "content": prompt.user },
			],
		})
	}
}
impl EnrichmentProvider for OpenAiProvider {
	fn provider_id(&self) -> &str {
		&self.cfg.provider_id
	}

	fn timeout(&self) -> std::time::Duration {
		std::time::Duration::from_millis(self.cfg.timeout_ms)
	}

	fn complete<'a>(&'a self, prompt: &'a Prompt) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			let url = format!("{}{}", self.cfg.api_base, self.cfg.path);
			let json = crate::post_json(
				&self.client,
				&self.cfg.provider_id,
				&url,
				self.headers.clone(),
				&self.request_body(prompt),
			)
			.await?;

			parse_content(&json).map(str::to_string).ok_or_else(|| {
				Error::transient(
					&self.cfg.provider_id,
					"Response is missing choices[0].message.content.",
				)
			})
		})
	}
}

pub(crate) fn parse_content(json: &Value) -> Option<&str> {
	json.get("choices")?
		.as_array()?
		.first()?
		.get("message")?
		.get("content")?
		.as_str()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reads_first_choice_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "role": "assistant", "content": "{\"mood_score\": 6}" } },
				{ "message": { "role": "assistant", "content": "ignored" } }
			]
		});

		assert_eq!(parse_content(&json), Some("{\"mood_score\": 6}"));
	}

	#[test]
	fn missing_choices_yield_none() {
		assert_eq!(parse_content(&serde_json::json!({ "choices": [] })), None);
		assert_eq!(parse_content(&serde_json::json!({ "error": "nope" })), None);
	}
}
