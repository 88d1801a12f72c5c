//! Journal entry store with the enrichment fan-out hooks, plus the read side the API layer
//! consumes.

pub mod analysis;
pub mod entries;
pub mod quotes;
pub mod time_serde;

mod error;

pub use analysis::AnalysisStateResponse;
pub use entries::{
	CreateEntryRequest, EntryView, UpdateBodyRequest, UpdateMetadataRequest, UpdateResponse,
};
pub use error::{Error, Result};
pub use quotes::QuoteView;

use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use journal_config::Config;
use journal_domain::{debounce::DebounceWindow, quote::QuotePolicy};
use journal_storage::{db::Db, queue, quotes as quote_store};

pub struct JournalService {
	pub db: Db,
	pub debounce: DebounceWindow,
	pub quotes: QuotePolicy,
}
impl JournalService {
	pub fn new(cfg: &Config, db: Db) -> Self {
		Self::with_policies(
			db,
			DebounceWindow::from_config(&cfg.pipeline),
			QuotePolicy::from_config(&cfg.quotes),
		)
	}

	pub fn with_policies(db: Db, debounce: DebounceWindow, quotes: QuotePolicy) -> Self {
		Self { db, debounce, quotes }
	}

	/// Pushes the entry's analysis out to one debounce window after `edited_at`. Run it in the
	/// transaction that wrote the body.
	pub async fn on_body_updated<'e, E>(
		&self,
		executor: E,
		entry_id: Uuid,
		edited_at: OffsetDateTime,
	) -> Result<()>
	where
		E: PgExecutor<'e>,
	{
		let scheduled_for = self.debounce.scheduled_for(edited_at);
		let generation = queue::schedule(executor, entry_id, scheduled_for, edited_at).await?;

		tracing::debug!(%entry_id, generation, %scheduled_for, "Scheduled mood analysis.");

		Ok(())
	}

	/// Flags the user's quote for regeneration. Run it in the transaction that created the entry.
	pub async fn on_entry_created<'e, E>(
		&self,
		executor: E,
		user_id: Uuid,
		created_at: OffsetDateTime,
	) -> Result<()>
	where
		E: PgExecutor<'e>,
	{
		quote_store::mark_needs_regeneration(executor, user_id, created_at).await?;

		tracing::debug!(%user_id, "Flagged quote for regeneration.");

		Ok(())
	}

	pub async fn on_entry_deleted<'e, E>(&self, executor: E, entry_id: Uuid) -> Result<()>
	where
		E: PgExecutor<'e>,
	{
		if queue::remove(executor, entry_id).await? {
			tracing::debug!(%entry_id, "Dropped pending mood analysis.");
		}

		Ok(())
	}
}

/// Current time truncated to the microsecond precision Postgres stores.
pub(crate) fn now_utc() -> OffsetDateTime {
	let now = OffsetDateTime::now_utc();

	now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000).unwrap_or(now)
}
