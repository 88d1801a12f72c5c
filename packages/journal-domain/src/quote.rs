use serde::Serialize;
use time::{Duration, OffsetDateTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotePolicy {
	pub staleness: Duration,
	pub fan_in_entries: u32,
}

/// Per-user quote lifecycle. `Regenerating` exists only while a scan holds an unexpired claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum QuoteState {
	Fresh,
	Stale(StaleReason),
	Regenerating,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleReason {
	/// A new entry was created since the last generation.
	Flagged,
	/// The last generation is older than the staleness threshold.
	Expired,
	/// No quote has been generated for this user yet.
	NeverGenerated,
}

/// The tracker columns a state is derived from.
#[derive(Clone, Copy, Debug)]
pub struct QuoteTracker {
	pub needs_regeneration: bool,
	pub last_generated_at: Option<OffsetDateTime>,
	pub claimed_until: Option<OffsetDateTime>,
}

impl QuotePolicy {
	pub fn from_config(cfg: &journal_config::Quotes) -> Self {
		Self { staleness: Duration::hours(cfg.staleness_hours), fan_in_entries: cfg.fan_in_entries }
	}

	/// Generations strictly before this instant are stale.
	pub fn stale_before(&self, now: OffsetDateTime) -> OffsetDateTime {
		now.saturating_sub(self.staleness)
	}

	pub fn state(&self, tracker: &QuoteTracker, now: OffsetDateTime) -> QuoteState {
		if tracker.claimed_until.is_some_and(|until| until > now) {
			return QuoteState::Regenerating;
		}
		if tracker.needs_regeneration {
			return QuoteState::Stale(StaleReason::Flagged);
		}

		match tracker.last_generated_at {
			None => QuoteState::Stale(StaleReason::NeverGenerated),
			Some(at) if at < self.stale_before(now) => QuoteState::Stale(StaleReason::Expired),
			Some(_) => QuoteState::Fresh,
		}
	}

	/// Whether a scan at `now` may claim this tracker.
	pub fn is_due(&self, tracker: &QuoteTracker, now: OffsetDateTime) -> bool {
		matches!(self.state(tracker, now), QuoteState::Stale(_))
	}
}
