use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Externally visible progress of an entry's mood analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisState {
	Pending,
	Processing,
	Completed,
	Failed,
}
impl AnalysisState {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "PENDING",
			Self::Processing => "PROCESSING",
			Self::Completed => "COMPLETED",
			Self::Failed => "FAILED",
		}
	}
}

/// Queue row fields the analysis state depends on.
#[derive(Clone, Copy, Debug)]
pub struct QueueSnapshot {
	pub attempt_count: i32,
	pub claimed_until: Option<OffsetDateTime>,
}

#[derive(Clone, Copy, Debug)]
pub struct EntrySnapshot<'a> {
	pub body: &'a str,
	pub has_mood_score: bool,
}

pub fn derive_state(
	entry: EntrySnapshot<'_>,
	queue: Option<QueueSnapshot>,
	now: OffsetDateTime,
) -> AnalysisState {
	if let Some(row) = queue {
		let leased = row.claimed_until.is_some_and(|until| until > now);

		return if leased || row.attempt_count > 0 {
			AnalysisState::Processing
		} else {
			AnalysisState::Pending
		};
	}

	if entry.has_mood_score {
		return AnalysisState::Completed;
	}
	// Nothing was ever queued for a blank body.
	if entry.body.trim().is_empty() {
		return AnalysisState::Pending;
	}

	AnalysisState::Failed
}
