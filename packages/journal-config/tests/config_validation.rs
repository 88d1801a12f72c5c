use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use journal_config::{Config, Error, ProviderKind};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let table = root.as_table_mut().expect("Template config must be a table.");
	let section = table
		.entry(section.to_string())
		.or_insert_with(|| Value::Table(Default::default()))
		.as_table_mut()
		.expect("Section must be a table.");

	section.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("journal_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn load_applies_pipeline_defaults_and_normalizes_providers() {
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML.to_string());
	let result = journal_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected template config to load.");

	assert_eq!(cfg.pipeline.debounce_window_ms, 5_000);
	assert_eq!(cfg.pipeline.mood_poll_interval_ms, 3_000);
	assert_eq!(cfg.pipeline.quote_poll_interval_ms, 30_000);
	assert_eq!(cfg.pipeline.claim_lease_seconds, 30);
	assert_eq!(cfg.retry.max_retries, 3);
	assert_eq!(cfg.retry.base_delay_ms, 2_000);
	assert_eq!(cfg.quotes.staleness_hours, 24);
	assert_eq!(cfg.quotes.fan_in_entries, 20);
	assert_eq!(cfg.providers.primary.api_base, "http://localhost:9000");
	assert_eq!(cfg.providers.primary.path, "/v1/chat/completions");
	assert_eq!(cfg.providers.primary.kind, ProviderKind::Openai);
	assert!((cfg.providers.primary.temperature - 0.7).abs() < f32::EPSILON);
	assert_eq!(cfg.providers.fallback.as_ref().map(|p| p.kind), Some(ProviderKind::Gemini));
}

#[test]
fn missing_file_reports_read_error() {
	let mut path = env::temp_dir();

	path.push("journal_config_test_definitely_missing.toml");

	let err = journal_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn unknown_provider_kind_is_a_parse_error() {
	let payload = SAMPLE_CONFIG_TEMPLATE_TOML.replace("kind        = \"gemini\"", "kind = \"llama\"");
	let path = write_temp_config(payload);
	let result = journal_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn debounce_window_must_be_positive() {
	let payload = sample_toml_with("pipeline", "debounce_window_ms", Value::Integer(0));
	let path = write_temp_config(payload);
	let result = journal_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected debounce validation error.");

	assert!(
		matches!(err, Error::Validation { field: "pipeline.debounce_window_ms", .. }),
		"Unexpected error: {err}"
	);
	assert!(
		err.to_string().contains("pipeline.debounce_window_ms must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn lease_must_outlive_primary_and_fallback_calls() {
	let mut cfg = base_config();

	cfg.pipeline.claim_lease_seconds = 2;
	cfg.providers.primary.timeout_ms = 1_500;

	let err = journal_config::validate(&cfg).expect_err("Expected lease validation error.");

	assert!(
		err.to_string().contains(
			"pipeline.claim_lease_seconds must exceed the combined primary and fallback timeouts."
		),
		"Unexpected error: {err}"
	);

	cfg.providers.fallback = None;

	journal_config::validate(&cfg).expect("Expected lease to cover the primary alone.");
}

#[test]
fn backoff_base_cannot_exceed_cap() {
	let mut cfg = base_config();

	cfg.retry.base_delay_ms = 10_000;
	cfg.retry.max_delay_ms = 5_000;

	let err = journal_config::validate(&cfg).expect_err("Expected backoff validation error.");

	assert!(
		err.to_string().contains("retry.base_delay_ms must not exceed retry.max_delay_ms."),
		"Unexpected error: {err}"
	);
}

#[test]
fn max_retries_must_be_positive() {
	let mut cfg = base_config();

	cfg.retry.max_retries = 0;

	let err = journal_config::validate(&cfg).expect_err("Expected max_retries validation error.");

	assert!(matches!(err, Error::Validation { field: "retry.max_retries", .. }));
}

#[test]
fn provider_api_key_must_be_non_empty() {
	let mut cfg = base_config();

	if let Some(fallback) = cfg.providers.fallback.as_mut() {
		fallback.api_key = "  ".to_string();
	}

	let err = journal_config::validate(&cfg).expect_err("Expected api_key validation error.");

	assert!(
		err.to_string().contains("providers.fallback.api_key must be non-empty."),
		"Unexpected error: {err}"
	);
}

#[test]
fn fallback_must_be_a_distinct_provider() {
	let mut cfg = base_config();

	if let Some(fallback) = cfg.providers.fallback.as_mut() {
		fallback.provider_id = cfg.providers.primary.provider_id.clone();
	}

	let err = journal_config::validate(&cfg).expect_err("Expected fallback validation error.");

	assert!(matches!(err, Error::Validation { field: "providers.fallback.provider_id", .. }));
}

#[test]
fn temperature_must_be_in_range() {
	let mut cfg = base_config();

	cfg.providers.primary.temperature = 3.5;

	let err = journal_config::validate(&cfg).expect_err("Expected temperature validation error.");

	assert!(
		err.to_string()
			.contains("providers.primary.temperature must be a finite number in the range 0.0-2.0."),
		"Unexpected error: {err}"
	);

	cfg.providers.primary.temperature = f32::NAN;

	assert!(journal_config::validate(&cfg).is_err());
}

#[test]
fn default_header_values_must_be_strings() {
	let mut cfg = base_config();

	cfg.providers.primary.default_headers.insert("x-retries".to_string(), serde_json::json!(3));

	let err = journal_config::validate(&cfg).expect_err("Expected header validation error.");

	assert!(
		err.to_string().contains("providers.primary.default_headers.x-retries must be a string."),
		"Unexpected error: {err}"
	);
}

#[test]
fn quote_fan_in_must_be_positive() {
	let mut cfg = base_config();

	cfg.quotes.fan_in_entries = 0;

	assert!(matches!(
		journal_config::validate(&cfg),
		Err(Error::Validation { field: "quotes.fan_in_entries", .. })
	));
}

#[test]
fn journal_example_toml_is_valid() {
	let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

	path.push("../../journal.example.toml");

	journal_config::load(&path).expect("Expected journal.example.toml to be a valid config.");
}
