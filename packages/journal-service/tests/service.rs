use sqlx::PgPool;
use time::Duration;
use uuid::Uuid;

use journal_domain::{debounce::DebounceWindow, quote::QuotePolicy};
use journal_service::{
	CreateEntryRequest, Error, JournalService, UpdateBodyRequest, UpdateMetadataRequest,
};
use journal_storage::db::Db;

fn lazy_service() -> JournalService {
	let pool = PgPool::connect_lazy("postgres://postgres@localhost/journal_unreachable")
		.expect("Failed to build lazy pool.");

	JournalService::with_policies(
		Db::from_pool(pool),
		DebounceWindow::from_millis(5_000),
		QuotePolicy { staleness: Duration::hours(24), fan_in_entries: 20 },
	)
}

#[tokio::test]
async fn metadata_update_without_fields_is_rejected() {
	let service = lazy_service();
	let result = service
		.update_metadata(UpdateMetadataRequest {
			user_id: Uuid::new_v4(),
			entry_id: Uuid::new_v4(),
			title: None,
			entry_date: None,
			expected_version: None,
		})
		.await;

	assert!(matches!(result, Err(Error::InvalidRequest { .. })));
}

#[tokio::test]
async fn negative_expected_version_is_rejected() {
	let service = lazy_service();
	let result = service
		.update_body(UpdateBodyRequest {
			user_id: Uuid::new_v4(),
			entry_id: Uuid::new_v4(),
			body: "had a great day".to_string(),
			expected_version: Some(-1),
		})
		.await;

	assert!(matches!(result, Err(Error::InvalidRequest { .. })));
}

#[tokio::test]
async fn overlong_title_is_rejected() {
	let service = lazy_service();
	let result = service
		.create_entry(CreateEntryRequest {
			user_id: Uuid::new_v4(),
			title: Some("t".repeat(journal_service::entries::MAX_TITLE_CHARS + 1)),
			entry_date: None,
		})
		.await;

	assert!(matches!(result, Err(Error::InvalidRequest { .. })));
}

#[test]
fn conflict_reports_both_versions() {
	let err = Error::Conflict { expected: 3, current: 5 };

	assert_eq!(err.to_string(), "Version conflict: expected 3, current 5.");
}
