//! The debounced analysis queue: at most one row per entry, claimed under a lease.

use sqlx::{PgConnection, PgExecutor};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{AnalysisClaim, AnalysisQueueEntry},
};

/// How an acknowledged claim left the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ack {
	/// The row is gone.
	Removed,
	/// A newer edit rescheduled the entry during the claim. The row stays, unleased.
	KeptForNewerEdit,
	/// The lease expired and someone else owns the row now. Nothing changed.
	LeaseLost,
}

/// Upserts the entry's row so that it becomes due at `scheduled_for`. A burst of edits keeps
/// pushing the same row out. Existing attempt counts and leases are left alone. Returns the new
/// generation.
pub async fn schedule<'e, E>(
	executor: E,
	entry_id: Uuid,
	scheduled_for: OffsetDateTime,
	now: OffsetDateTime,
) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let generation = sqlx::query_scalar(
		"\
INSERT INTO analysis_queue (entry_id, scheduled_for, attempt_count, generation, created_at, updated_at)
VALUES ($1, $2, 0, 1, $3, $3)
ON CONFLICT (entry_id) DO UPDATE
SET scheduled_for = EXCLUDED.scheduled_for,
	generation = analysis_queue.generation + 1,
	updated_at = EXCLUDED.updated_at
RETURNING generation",
	)
	.bind(entry_id)
	.bind(scheduled_for)
	.bind(now)
	.fetch_one(executor)
	.await?;

	Ok(generation)
}

/// Leases up to `limit` due rows in one statement. Rows leased by a live claim are skipped, as are
/// rows another transaction is claiming concurrently.
pub async fn claim_ready(
	db: &Db,
	now: OffsetDateTime,
	limit: u32,
	lease: Duration,
) -> Result<Vec<AnalysisClaim>> {
	if limit == 0 {
		return Ok(Vec::new());
	}
	if lease <= Duration::ZERO {
		return Err(Error::InvalidArgument("claim lease must be positive".to_string()));
	}

	let claims = sqlx::query_as::<_, AnalysisClaim>(
		"\
UPDATE analysis_queue AS q
SET claim_token = gen_random_uuid(),
	claimed_until = $2,
	updated_at = $1
FROM (
	SELECT entry_id
	FROM analysis_queue
	WHERE scheduled_for <= $1
		AND (claimed_until IS NULL OR claimed_until <= $1)
	ORDER BY scheduled_for ASC
	LIMIT $3
	FOR UPDATE SKIP LOCKED
) AS due
WHERE q.entry_id = due.entry_id
RETURNING q.entry_id, q.claim_token, q.generation, q.attempt_count",
	)
	.bind(now)
	.bind(now + lease)
	.bind(i64::from(limit))
	.fetch_all(&db.pool)
	.await?;

	Ok(claims)
}

/// Acknowledges a successful analysis. Deletes the row unless the entry was edited again while
/// the claim was out.
pub async fn complete(
	conn: &mut PgConnection,
	claim: AnalysisClaim,
	now: OffsetDateTime,
) -> Result<Ack> {
	if delete_if_unchanged(&mut *conn, &claim).await? {
		return Ok(Ack::Removed);
	}

	let released = sqlx::query(
		"\
UPDATE analysis_queue
SET claim_token = NULL,
	claimed_until = NULL,
	last_error = NULL,
	updated_at = $1
WHERE entry_id = $2 AND claim_token = $3",
	)
	.bind(now)
	.bind(claim.entry_id)
	.bind(claim.claim_token)
	.execute(conn)
	.await?;

	Ok(if released.rows_affected() > 0 { Ack::KeptForNewerEdit } else { Ack::LeaseLost })
}

/// Records a failed attempt and releases the lease. The row becomes due at `retry_at`, or later
/// if a newer edit already pushed it out. Returns `false` if the lease was lost.
pub async fn reschedule<'e, E>(
	executor: E,
	claim: AnalysisClaim,
	retry_at: OffsetDateTime,
	error_text: &str,
	now: OffsetDateTime,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE analysis_queue
SET attempt_count = attempt_count + 1,
	scheduled_for = GREATEST(scheduled_for, $1),
	last_error = $2,
	claim_token = NULL,
	claimed_until = NULL,
	updated_at = $3
WHERE entry_id = $4 AND claim_token = $5",
	)
	.bind(retry_at)
	.bind(error_text)
	.bind(now)
	.bind(claim.entry_id)
	.bind(claim.claim_token)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// Gives up on the claimed work. The row is dropped, unless a newer edit arrived during the claim;
/// that edit starts over with a fresh attempt count.
pub async fn abandon(
	conn: &mut PgConnection,
	claim: AnalysisClaim,
	error_text: &str,
	now: OffsetDateTime,
) -> Result<Ack> {
	if delete_if_unchanged(&mut *conn, &claim).await? {
		return Ok(Ack::Removed);
	}

	let released = sqlx::query(
		"\
UPDATE analysis_queue
SET attempt_count = 0,
	last_error = $1,
	claim_token = NULL,
	claimed_until = NULL,
	updated_at = $2
WHERE entry_id = $3 AND claim_token = $4",
	)
	.bind(error_text)
	.bind(now)
	.bind(claim.entry_id)
	.bind(claim.claim_token)
	.execute(conn)
	.await?;

	Ok(if released.rows_affected() > 0 { Ack::KeptForNewerEdit } else { Ack::LeaseLost })
}

pub async fn remove<'e, E>(executor: E, entry_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM analysis_queue WHERE entry_id = $1")
		.bind(entry_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn get<'e, E>(executor: E, entry_id: Uuid) -> Result<Option<AnalysisQueueEntry>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, AnalysisQueueEntry>(
		"\
SELECT
	entry_id,
	scheduled_for,
	attempt_count,
	generation,
	claim_token,
	claimed_until,
	last_error,
	created_at,
	updated_at
FROM analysis_queue
WHERE entry_id = $1",
	)
	.bind(entry_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

async fn delete_if_unchanged(conn: &mut PgConnection, claim: &AnalysisClaim) -> Result<bool> {
	let result = sqlx::query(
		"DELETE FROM analysis_queue WHERE entry_id = $1 AND claim_token = $2 AND generation = $3",
	)
	.bind(claim.entry_id)
	.bind(claim.claim_token)
	.bind(claim.generation)
	.execute(conn)
	.await?;

	Ok(result.rows_affected() > 0)
}
