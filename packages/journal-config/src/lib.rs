mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, LlmProviderConfig, Pipeline, Postgres, ProviderKind, Providers, Quotes, Retry, Service,
	Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::validation(
			"storage.postgres.dsn",
			"storage.postgres.dsn must be non-empty.",
		));
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::validation(
			"storage.postgres.pool_max_conns",
			"storage.postgres.pool_max_conns must be greater than zero.",
		));
	}

	validate_provider("providers.primary", &cfg.providers.primary)?;

	if let Some(fallback) = cfg.providers.fallback.as_ref() {
		validate_provider("providers.fallback", fallback)?;

		if fallback.provider_id == cfg.providers.primary.provider_id {
			return Err(Error::validation(
				"providers.fallback.provider_id",
				"providers.fallback.provider_id must differ from providers.primary.provider_id.",
			));
		}
	}

	for (field, value) in [
		("pipeline.debounce_window_ms", cfg.pipeline.debounce_window_ms),
		("pipeline.mood_poll_interval_ms", cfg.pipeline.mood_poll_interval_ms),
		("pipeline.quote_poll_interval_ms", cfg.pipeline.quote_poll_interval_ms),
		("retry.base_delay_ms", cfg.retry.base_delay_ms),
		("retry.max_delay_ms", cfg.retry.max_delay_ms),
	] {
		if value == 0 {
			return Err(Error::validation(field, format!("{field} must be greater than zero.")));
		}
	}

	if cfg.pipeline.worker_pool_size == 0 {
		return Err(Error::validation(
			"pipeline.worker_pool_size",
			"pipeline.worker_pool_size must be greater than zero.",
		));
	}
	if cfg.pipeline.claim_batch_size == 0 {
		return Err(Error::validation(
			"pipeline.claim_batch_size",
			"pipeline.claim_batch_size must be greater than zero.",
		));
	}
	if cfg.pipeline.claim_lease_seconds <= 0 {
		return Err(Error::validation(
			"pipeline.claim_lease_seconds",
			"pipeline.claim_lease_seconds must be greater than zero.",
		));
	}

	// A claim must outlive the primary call plus one fail-over call.
	let worst_case_call_ms = cfg.providers.primary.timeout_ms.saturating_add(
		cfg.providers.fallback.as_ref().map(|fallback| fallback.timeout_ms).unwrap_or(0),
	);
	let lease_ms = (cfg.pipeline.claim_lease_seconds as u64).saturating_mul(1_000);

	if lease_ms <= worst_case_call_ms {
		return Err(Error::validation(
			"pipeline.claim_lease_seconds",
			"pipeline.claim_lease_seconds must exceed the combined primary and fallback timeouts.",
		));
	}

	if cfg.retry.max_retries == 0 {
		return Err(Error::validation(
			"retry.max_retries",
			"retry.max_retries must be greater than zero.",
		));
	}
	if cfg.retry.base_delay_ms > cfg.retry.max_delay_ms {
		return Err(Error::validation(
			"retry.base_delay_ms",
			"retry.base_delay_ms must not exceed retry.max_delay_ms.",
		));
	}
	if cfg.quotes.staleness_hours <= 0 {
		return Err(Error::validation(
			"quotes.staleness_hours",
			"quotes.staleness_hours must be greater than zero.",
		));
	}
	if cfg.quotes.fan_in_entries == 0 {
		return Err(Error::validation(
			"quotes.fan_in_entries",
			"quotes.fan_in_entries must be greater than zero.",
		));
	}

	Ok(())
}

fn validate_provider(label: &'static str, provider: &LlmProviderConfig) -> Result<()> {
	for (field, value) in [
		("provider_id", &provider.provider_id),
		("api_base", &provider.api_base),
		("api_key", &provider.api_key),
		("model", &provider.model),
	] {
		if value.trim().is_empty() {
			return Err(Error::validation(label, format!("{label}.{field} must be non-empty.")));
		}
	}

	if provider.timeout_ms == 0 {
		return Err(Error::validation(
			label,
			format!("{label}.timeout_ms must be greater than zero."),
		));
	}
	if !provider.temperature.is_finite() || !(0.0..=2.0).contains(&provider.temperature) {
		return Err(Error::validation(
			label,
			format!("{label}.temperature must be a finite number in the range 0.0-2.0."),
		));
	}

	for (key, value) in &provider.default_headers {
		if !value.is_string() {
			return Err(Error::validation(
				label,
				format!("{label}.default_headers.{key} must be a string."),
			));
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}

	normalize_provider(&mut cfg.providers.primary);

	if let Some(fallback) = cfg.providers.fallback.as_mut() {
		normalize_provider(fallback);
	}
}

fn normalize_provider(provider: &mut LlmProviderConfig) {
	let trimmed = provider.api_base.trim().trim_end_matches('/').to_string();

	provider.api_base = trimmed;

	if !provider.path.is_empty() && !provider.path.starts_with('/') {
		provider.path = format!("/{}", provider.path);
	}
}
