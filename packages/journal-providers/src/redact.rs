const MAX_ERROR_CHARS: usize = 1_024;
const SECRET_KEYS: [&str; 6] = ["api_key", "apikey", "key", "password", "secret", "token"];

/// Scrubs credentials from provider error text before it is logged or persisted, and caps its
/// length.
pub fn redact_secrets(text: &str) -> String {
	let mut words: Vec<String> = Vec::new();
	let mut after_bearer = false;

	for word in text.split_whitespace() {
		if after_bearer {
			words.push("[REDACTED]".to_string());

			after_bearer = false;

			continue;
		}

		after_bearer = word.eq_ignore_ascii_case("bearer");

		words.push(redact_pairs(word));
	}

	let mut out = words.join(" ");

	if out.chars().count() > MAX_ERROR_CHARS {
		out = out.chars().take(MAX_ERROR_CHARS).collect();

		out.push_str("...");
	}

	out
}

/// Redacts `name=value` and `name:value` pairs (including query string parameters) whose name
/// looks like a credential.
fn redact_pairs(word: &str) -> String {
	word.split('&')
		.map(|chunk| chunk.split('?').map(redact_pair).collect::<Vec<_>>().join("?"))
		.collect::<Vec<_>>()
		.join("&")
}

fn redact_pair(pair: &str) -> String {
	let Some(idx) = pair.find(['=', ':']) else {
		return pair.to_string();
	};
	let name = pair[..idx].trim_end_matches(['"', '\'']);
	let name = name.rsplit(['"', '\'', '{', ',']).next().unwrap_or_default().to_ascii_lowercase();

	if idx + 1 < pair.len() && SECRET_KEYS.iter().any(|key| name.ends_with(key)) {
		format!("{}[REDACTED]", &pair[..=idx])
	} else {
		pair.to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn redacts_bearer_tokens_and_key_pairs() {
		let text = "401 Authorization: Bearer sk-live-123 url=https://host/v1?key=abc&alt=json";

		assert_eq!(
			redact_secrets(text),
			"401 Authorization: Bearer [REDACTED] url=https://host/v1?key=[REDACTED]&alt=json"
		);
	}

	#[test]
	fn redacts_json_credential_fields() {
		assert_eq!(redact_secrets("{\"api_key\":\"abc\"}"), "{\"api_key\":[REDACTED]");
	}

	#[test]
	fn leaves_plain_text_alone() {
		assert_eq!(redact_secrets("HTTP 503   upstream busy"), "HTTP 503 upstream busy");
	}

	#[test]
	fn caps_long_messages() {
		let out = redact_secrets(&"x".repeat(5_000));

		assert_eq!(out.chars().count(), MAX_ERROR_CHARS + 3);
		assert!(out.ends_with("..."));
	}
}
