//! Per-user quote rows and the tracker columns that decide when they are regenerated.

use sqlx::PgExecutor;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{InspirationalQuote, QuoteClaim},
};

/// Raises the regeneration flag, creating the tracker row on first use.
pub async fn mark_needs_regeneration<'e, E>(
	executor: E,
	user_id: Uuid,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO inspirational_quotes (user_id, needs_regeneration, generation, updated_at)
VALUES ($1, TRUE, 1, $2)
ON CONFLICT (user_id) DO UPDATE
SET needs_regeneration = TRUE,
	generation = inspirational_quotes.generation + 1,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(user_id)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(())
}

/// Leases up to `limit` trackers that are flagged, never generated, or last generated before
/// `stale_before`. Staleness is evaluated here on every scan rather than stored.
pub async fn claim_due(
	db: &Db,
	now: OffsetDateTime,
	stale_before: OffsetDateTime,
	limit: u32,
	lease: Duration,
) -> Result<Vec<QuoteClaim>> {
	if limit == 0 {
		return Ok(Vec::new());
	}
	if lease <= Duration::ZERO {
		return Err(Error::InvalidArgument("claim lease must be positive".to_string()));
	}

	let claims = sqlx::query_as::<_, QuoteClaim>(
		"\
UPDATE inspirational_quotes AS q
SET claim_token = gen_random_uuid(),
	claimed_until = $2
FROM (
	SELECT user_id
	FROM inspirational_quotes
	WHERE (needs_regeneration OR last_generated_at IS NULL OR last_generated_at < $3)
		AND (claimed_until IS NULL OR claimed_until <= $1)
	ORDER BY last_generated_at ASC NULLS FIRST
	LIMIT $4
	FOR UPDATE SKIP LOCKED
) AS due
WHERE q.user_id = due.user_id
RETURNING q.user_id, q.claim_token, q.generation",
	)
	.bind(now)
	.bind(now + lease)
	.bind(stale_before)
	.bind(i64::from(limit))
	.fetch_all(&db.pool)
	.await?;

	Ok(claims)
}

/// Overwrites the quote and releases the lease. The flag is cleared only if no entry was created
/// since the claim. Returns `false` if the lease was lost and nothing was written.
pub async fn save_generated<'e, E>(
	executor: E,
	claim: QuoteClaim,
	quote_text: &str,
	tags: &[String],
	now: OffsetDateTime,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE inspirational_quotes
SET quote_text = $1,
	tags = $2,
	last_generated_at = $3,
	needs_regeneration = needs_regeneration AND generation <> $4,
	claim_token = NULL,
	claimed_until = NULL,
	updated_at = $3
WHERE user_id = $5 AND claim_token = $6",
	)
	.bind(quote_text)
	.bind(tags)
	.bind(now)
	.bind(claim.generation)
	.bind(claim.user_id)
	.bind(claim.claim_token)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// Drops the lease after a failed generation. The tracker stays due for the next scan.
pub async fn release<'e, E>(executor: E, claim: QuoteClaim) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE inspirational_quotes
SET claim_token = NULL,
	claimed_until = NULL
WHERE user_id = $1 AND claim_token = $2",
	)
	.bind(claim.user_id)
	.bind(claim.claim_token)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn get<'e, E>(executor: E, user_id: Uuid) -> Result<Option<InspirationalQuote>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, InspirationalQuote>(
		"\
SELECT
	user_id,
	quote_text,
	tags,
	needs_regeneration,
	last_generated_at,
	generation,
	claim_token,
	claimed_until,
	updated_at
FROM inspirational_quotes
WHERE user_id = $1",
	)
	.bind(user_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}
