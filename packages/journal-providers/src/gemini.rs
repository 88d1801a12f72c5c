use reqwest::{Client, header::HeaderMap};
use serde_json::Value;

use crate::{BoxFuture, EnrichmentProvider, Error, Prompt, Result};
use journal_config::LlmProviderConfig;

/// Gemini `generateContent` endpoint. A `{model}` placeholder in the configured path is replaced
/// with the configured model.
pub struct GeminiProvider {
	cfg: LlmProviderConfig,
	client: Client,
	headers: HeaderMap,
	url: String,
}
impl GeminiProvider {
	pub fn new(cfg: LlmProviderConfig) -> Result<Self> {
		let client = crate::http_client(&cfg)?;
		let headers = crate::auth_headers(cfg.kind, &cfg.api_key, &cfg.default_headers)?;
		let url = format!("{}{}", cfg.api_base, cfg.path.replace("{model}", &cfg.model));

		Ok(Self { cfg, client, headers, url })
	}

	fn request_body(&self, prompt: &Prompt) -> Value {
		serde_json::json!({
			"systemInstruction": { "parts": [{ "text": prompt.system }] },
			"contents": [{ "role": "user", "parts": [{ "text": prompt.user }] }],
			"generationConfig": {
				"temperature": self.cfg.temperature,
				"responseMimeType": "application/json",
			},
		})
	}
}
impl EnrichmentProvider for GeminiProvider {
	fn provider_id(&self) -> &str {
		&self.cfg.provider_id
	}

	fn timeout(&self) -> std::time::Duration {
		std::time::Duration::from_millis(self.cfg.timeout_ms)
	}

	fn complete<'a>(&'a self, prompt: &'a Prompt) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			let json = crate::post_json(
				&self.client,
				&self.cfg.provider_id,
				&self.url,
				self.headers.clone(),
				&self.request_body(prompt),
			)
			.await?;

			parse_text(&json).ok_or_else(|| {
				Error::transient(
					&self.cfg.provider_id,
					"Response is missing candidates[0].content.parts[].text.",
				)
			})
		})
	}
}

/// Concatenates the text parts of the first candidate.
pub(crate) fn parse_text(json: &Value) -> Option<String> {
	let parts = json
		.get("candidates")?
		.as_array()?
		.first()?
		.get("content")?
		.get("parts")?
		.as_array()?;
	let text: String = parts.iter().filter_map(|part| part.get("text")?.as_str()).collect();

	if text.is_empty() { None } else { Some(text) }
}
