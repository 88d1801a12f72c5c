use time::{Duration, OffsetDateTime};

/// Quiet period an entry must observe after its last body edit before it is analyzed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebounceWindow(Duration);
impl DebounceWindow {
	pub fn from_millis(millis: u64) -> Self {
		Self(Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX)))
	}

	pub fn from_config(cfg: &journal_config::Pipeline) -> Self {
		Self::from_millis(cfg.debounce_window_ms)
	}

	/// Every edit pushes the deadline out, so a burst fires once, one window after its last edit.
	pub fn scheduled_for(self, edited_at: OffsetDateTime) -> OffsetDateTime {
		edited_at.saturating_add(self.0)
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn burst_of_edits_is_due_one_window_after_the_last() {
		let window = DebounceWindow::from_millis(5_000);
		let edits = [
			datetime!(2026-03-01 09:00:00 UTC),
			datetime!(2026-03-01 09:00:01 UTC),
			datetime!(2026-03-01 09:00:03.5 UTC),
		];
		let due = edits.iter().fold(None, |_, edit| Some(window.scheduled_for(*edit)));

		assert_eq!(due, Some(datetime!(2026-03-01 09:00:08.5 UTC)));
	}
}
