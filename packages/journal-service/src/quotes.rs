use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, JournalService, Result};
use journal_domain::quote::{QuoteState, QuoteTracker};
use journal_storage::quotes;

#[derive(Clone, Debug, Serialize)]
pub struct QuoteView {
	pub user_id: Uuid,
	pub quote_text: String,
	pub tags: Vec<String>,
	#[serde(with = "crate::time_serde")]
	pub last_generated_at: OffsetDateTime,
	/// Whether a newer quote is owed or being generated.
	pub state: QuoteState,
}

impl JournalService {
	/// The user's current quote. Users whose first quote has not been generated yet get
	/// `NotFound`.
	pub async fn get_quote(&self, user_id: Uuid) -> Result<QuoteView> {
		let row = quotes::get(&self.db.pool, user_id).await?;
		let Some(row) = row else {
			return Err(no_quote(user_id));
		};
		let (Some(quote_text), Some(tags), Some(last_generated_at)) =
			(row.quote_text, row.tags, row.last_generated_at)
		else {
			return Err(no_quote(user_id));
		};
		let tracker = QuoteTracker {
			needs_regeneration: row.needs_regeneration,
			last_generated_at: Some(last_generated_at),
			claimed_until: row.claimed_until,
		};

		Ok(QuoteView {
			user_id,
			quote_text,
			tags,
			last_generated_at,
			state: self.quotes.state(&tracker, crate::now_utc()),
		})
	}
}

fn no_quote(user_id: Uuid) -> Error {
	Error::NotFound { message: format!("inspirational quote for user {user_id}") }
}
