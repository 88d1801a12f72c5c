use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct JournalEntry {
	pub entry_id: Uuid,
	pub user_id: Uuid,
	pub title: Option<String>,
	pub body: String,
	pub mood_score: Option<i16>,
	pub entry_date: Date,
	pub version: i64,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct AnalysisQueueEntry {
	pub entry_id: Uuid,
	pub scheduled_for: OffsetDateTime,
	pub attempt_count: i32,
	pub generation: i64,
	pub claim_token: Option<Uuid>,
	pub claimed_until: Option<OffsetDateTime>,
	pub last_error: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct InspirationalQuote {
	pub user_id: Uuid,
	pub quote_text: Option<String>,
	pub tags: Option<Vec<String>>,
	pub needs_regeneration: bool,
	pub last_generated_at: Option<OffsetDateTime>,
	pub generation: i64,
	pub claim_token: Option<Uuid>,
	pub claimed_until: Option<OffsetDateTime>,
	pub updated_at: OffsetDateTime,
}

/// Lease on one queue row. Only `queue::claim_ready` creates claims, and every acknowledgement
/// consumes one.
#[derive(Debug, sqlx::FromRow)]
pub struct AnalysisClaim {
	pub(crate) entry_id: Uuid,
	pub(crate) claim_token: Uuid,
	pub(crate) generation: i64,
	pub(crate) attempt_count: i32,
}
impl AnalysisClaim {
	pub fn entry_id(&self) -> Uuid {
		self.entry_id
	}

	/// Failures recorded on the row before this claim.
	pub fn attempt_count(&self) -> i32 {
		self.attempt_count
	}
}

/// Lease on one user's quote tracker, created by `quotes::claim_due`.
#[derive(Debug, sqlx::FromRow)]
pub struct QuoteClaim {
	pub(crate) user_id: Uuid,
	pub(crate) claim_token: Uuid,
	pub(crate) generation: i64,
}
impl QuoteClaim {
	pub fn user_id(&self) -> Uuid {
		self.user_id
	}
}
