use sqlx::{PgConnection, PgExecutor};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{Error, Result, models::JournalEntry};

const ENTRY_COLUMNS: &str = "\
entry_id,
	user_id,
	title,
	body,
	mood_score,
	entry_date,
	version,
	created_at,
	updated_at";

pub async fn insert_entry<'e, E>(executor: E, entry: &JournalEntry) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO journal_entries (
	entry_id,
	user_id,
	title,
	body,
	mood_score,
	entry_date,
	version,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
	)
	.bind(entry.entry_id)
	.bind(entry.user_id)
	.bind(entry.title.as_deref())
	.bind(entry.body.as_str())
	.bind(entry.mood_score)
	.bind(entry.entry_date)
	.bind(entry.version)
	.bind(entry.created_at)
	.bind(entry.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

/// Owner-scoped read. An entry belonging to another user reads as absent.
pub async fn get_entry<'e, E>(
	executor: E,
	user_id: Uuid,
	entry_id: Uuid,
) -> Result<Option<JournalEntry>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"SELECT {ENTRY_COLUMNS}\nFROM journal_entries\nWHERE entry_id = $1 AND user_id = $2"
	);
	let entry = sqlx::query_as::<_, JournalEntry>(&sql)
		.bind(entry_id)
		.bind(user_id)
		.fetch_optional(executor)
		.await?;

	Ok(entry)
}

/// Unscoped read for the enrichment pipeline, which only knows entry ids.
pub async fn get_entry_by_id<'e, E>(executor: E, entry_id: Uuid) -> Result<Option<JournalEntry>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {ENTRY_COLUMNS}\nFROM journal_entries\nWHERE entry_id = $1");
	let entry =
		sqlx::query_as::<_, JournalEntry>(&sql).bind(entry_id).fetch_optional(executor).await?;

	Ok(entry)
}

/// Row-locks an owned entry for the rest of the transaction.
pub async fn lock_entry(
	conn: &mut PgConnection,
	user_id: Uuid,
	entry_id: Uuid,
) -> Result<JournalEntry> {
	let sql = format!(
		"SELECT {ENTRY_COLUMNS}\nFROM journal_entries\nWHERE entry_id = $1 AND user_id = $2\n\
		 FOR UPDATE"
	);

	sqlx::query_as::<_, JournalEntry>(&sql)
		.bind(entry_id)
		.bind(user_id)
		.fetch_optional(conn)
		.await?
		.ok_or_else(|| Error::NotFound(format!("journal entry {entry_id}")))
}

/// Fields a content write may change. `None` leaves the column as is.
#[derive(Debug, Default)]
pub struct EntryChanges<'a> {
	pub body: Option<&'a str>,
	pub title: Option<Option<&'a str>>,
	pub entry_date: Option<Date>,
}

/// Applies a content write and bumps `version` by one, provided the row is still at `version`.
/// Returns the new version.
pub async fn apply_changes(
	conn: &mut PgConnection,
	entry_id: Uuid,
	version: i64,
	changes: &EntryChanges<'_>,
	now: OffsetDateTime,
) -> Result<i64> {
	let next: Option<i64> = sqlx::query_scalar(
		"\
UPDATE journal_entries
SET body = COALESCE($1, body),
	title = CASE WHEN $2 THEN $3 ELSE title END,
	entry_date = COALESCE($4, entry_date),
	version = version + 1,
	updated_at = $5
WHERE entry_id = $6 AND version = $7
RETURNING version",
	)
	.bind(changes.body)
	.bind(changes.title.is_some())
	.bind(changes.title.flatten())
	.bind(changes.entry_date)
	.bind(now)
	.bind(entry_id)
	.bind(version)
	.fetch_optional(conn)
	.await?;

	next.ok_or_else(|| {
		Error::Conflict(format!("journal entry {entry_id} moved past version {version}"))
	})
}

/// Stores an analysis result. Does not touch `version` or `updated_at`. Returns `false` when the
/// entry no longer exists.
pub async fn write_mood_score<'e, E>(executor: E, entry_id: Uuid, mood_score: i16) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("UPDATE journal_entries SET mood_score = $1 WHERE entry_id = $2")
		.bind(mood_score)
		.bind(entry_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn delete_entry<'e, E>(executor: E, user_id: Uuid, entry_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM journal_entries WHERE entry_id = $1 AND user_id = $2")
		.bind(entry_id)
		.bind(user_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

/// Bodies of the user's latest non-blank entries, newest first.
pub async fn recent_bodies<'e, E>(executor: E, user_id: Uuid, limit: u32) -> Result<Vec<String>>
where
	E: PgExecutor<'e>,
{
	let bodies = sqlx::query_scalar(
		"\
SELECT body
FROM journal_entries
WHERE user_id = $1 AND body ~ '[^[:space:]]'
ORDER BY entry_date DESC, created_at DESC
LIMIT $2",
	)
	.bind(user_id)
	.bind(i64::from(limit))
	.fetch_all(executor)
	.await?;

	Ok(bodies)
}
