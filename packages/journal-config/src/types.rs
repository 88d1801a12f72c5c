use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub pipeline: Pipeline,
	#[serde(default)]
	pub retry: Retry,
	#[serde(default)]
	pub quotes: Quotes,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub primary: LlmProviderConfig,
	/// Optional. Tried once, immediately, when the primary fails with a retryable error.
	pub fallback: Option<LlmProviderConfig>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
	/// Chat-completions compatible endpoint (`choices[0].message.content`).
	Openai,
	/// Gemini `generateContent` endpoint (`candidates[0].content.parts[0].text`).
	Gemini,
}
impl ProviderKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Openai => "openai",
			Self::Gemini => "gemini",
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub kind: ProviderKind,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	#[serde(default = "default_temperature")]
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pipeline {
	/// Quiet period after the last body edit before analysis may run.
	pub debounce_window_ms: u64,
	pub mood_poll_interval_ms: u64,
	pub quote_poll_interval_ms: u64,
	/// Upper bound on concurrently running enrichment tasks per worker process.
	pub worker_pool_size: usize,
	/// Upper bound on rows claimed per tick, further limited by free workers.
	pub claim_batch_size: u32,
	/// Claims not acknowledged within this window become claimable again.
	pub claim_lease_seconds: i64,
}
impl Default for Pipeline {
	fn default() -> Self {
		Self {
			debounce_window_ms: 5_000,
			mood_poll_interval_ms: 3_000,
			quote_poll_interval_ms: 30_000,
			worker_pool_size: 8,
			claim_batch_size: 16,
			claim_lease_seconds: 120,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retry {
	/// Failed attempts after which a queued analysis is dropped.
	pub max_retries: u32,
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
	pub max_jitter_ms: u64,
}
impl Default for Retry {
	fn default() -> Self {
		Self { max_retries: 5, base_delay_ms: 2_000, max_delay_ms: 300_000, max_jitter_ms: 1_000 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Quotes {
	pub staleness_hours: i64,
	/// Number of most recent entries fed into quote generation.
	pub fan_in_entries: u32,
}
impl Default for Quotes {
	fn default() -> Self {
		Self { staleness_hours: 24, fan_in_entries: 20 }
	}
}

fn default_temperature() -> f32 {
	0.7
}
