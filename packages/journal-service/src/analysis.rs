use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{JournalService, Result, entries};
use journal_domain::analysis::{self, AnalysisState, EntrySnapshot, QueueSnapshot};
use journal_storage::{
	entries as entry_store,
	models::{AnalysisQueueEntry, JournalEntry},
	queue,
};

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisStateResponse {
	pub entry_id: Uuid,
	pub state: AnalysisState,
	pub mood_score: Option<i16>,
	/// Failures recorded for the pending analysis, if one is queued.
	pub attempt_count: Option<i32>,
	#[serde(with = "crate::time_serde::option")]
	pub scheduled_for: Option<OffsetDateTime>,
}

impl JournalService {
	pub async fn pending_analysis_state(
		&self,
		user_id: Uuid,
		entry_id: Uuid,
	) -> Result<AnalysisStateResponse> {
		let entry = entry_store::get_entry(&self.db.pool, user_id, entry_id)
			.await?
			.ok_or_else(|| entries::not_found(entry_id))?;
		let queued = queue::get(&self.db.pool, entry_id).await?;
		let state = derive(&entry, queued.as_ref(), crate::now_utc());

		Ok(AnalysisStateResponse {
			entry_id,
			state,
			mood_score: entry.mood_score,
			attempt_count: queued.as_ref().map(|row| row.attempt_count),
			scheduled_for: queued.map(|row| row.scheduled_for),
		})
	}
}

pub(crate) fn derive(
	entry: &JournalEntry,
	queued: Option<&AnalysisQueueEntry>,
	now: OffsetDateTime,
) -> AnalysisState {
	analysis::derive_state(
		EntrySnapshot { body: &entry.body, has_mood_score: entry.mood_score.is_some() },
		queued.map(|row| QueueSnapshot {
			attempt_count: row.attempt_count,
			claimed_until: row.claimed_until,
		}),
		now,
	)
}
