use journal_storage::db::Db;
use journal_testkit::TestDatabase;

#[tokio::test]
#[ignore = "Requires external Postgres. Set JOURNAL_PG_DSN to run."]
async fn bootstraps_idempotently() {
	let Some(test_db) = TestDatabase::from_env().await.expect("Failed to create test database.")
	else {
		eprintln!("Skipping bootstraps_idempotently; set JOURNAL_PG_DSN to run this test.");

		return;
	};
	let db = Db::connect(&test_db.postgres_config(1)).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");
	db.ensure_schema().await.expect("Failed to re-run schema bootstrap.");

	for table in ["journal_entries", "analysis_queue", "inspirational_quotes"] {
		let count: i64 = sqlx::query_scalar(
			"SELECT count(*) FROM information_schema.tables WHERE table_name = $1",
		)
		.bind(table)
		.fetch_one(&db.pool)
		.await
		.expect("Failed to query schema tables.");

		assert_eq!(count, 1, "{table}");
	}

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set JOURNAL_PG_DSN to run."]
async fn quote_rows_require_exactly_four_tags() {
	let Some(test_db) = TestDatabase::from_env().await.expect("Failed to create test database.")
	else {
		eprintln!("Skipping quote_rows_require_exactly_four_tags; set JOURNAL_PG_DSN to run.");

		return;
	};
	let db = Db::connect(&test_db.postgres_config(1)).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let insert = "\
INSERT INTO inspirational_quotes (user_id, quote_text, tags, last_generated_at)
VALUES (gen_random_uuid(), 'Breathe.', $1, now())";
	let three = vec!["a".to_string(), "b".to_string(), "c".to_string()];
	let four = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];

	assert!(sqlx::query(insert).bind(&three).execute(&db.pool).await.is_err());
	assert!(sqlx::query(insert).bind(&four).execute(&db.pool).await.is_ok());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
