use serde::Serialize;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{Error, JournalService, Result, analysis};
use journal_domain::analysis::AnalysisState;
use journal_storage::{
	entries::{self, EntryChanges},
	models::JournalEntry,
	queue,
};

pub const MAX_TITLE_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub struct CreateEntryRequest {
	pub user_id: Uuid,
	pub title: Option<String>,
	/// Defaults to today (UTC).
	pub entry_date: Option<Date>,
}

#[derive(Clone, Debug)]
pub struct UpdateBodyRequest {
	pub user_id: Uuid,
	pub entry_id: Uuid,
	pub body: String,
	/// When set, the write is rejected unless the entry is still at this version.
	pub expected_version: Option<i64>,
}

/// `title: Some("")` clears the title. `None` fields are left unchanged.
#[derive(Clone, Debug)]
pub struct UpdateMetadataRequest {
	pub user_id: Uuid,
	pub entry_id: Uuid,
	pub title: Option<String>,
	pub entry_date: Option<Date>,
	pub expected_version: Option<i64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct UpdateResponse {
	pub entry_id: Uuid,
	pub version: i64,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
	/// Whether this write queued a mood analysis.
	pub analysis_scheduled: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct EntryView {
	pub entry_id: Uuid,
	pub user_id: Uuid,
	pub title: Option<String>,
	pub body: String,
	pub mood_score: Option<i16>,
	#[serde(with = "crate::time_serde::date")]
	pub entry_date: Date,
	pub version: i64,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
	pub analysis_state: AnalysisState,
}

impl JournalService {
	/// Creates an empty-bodied entry at version 0 and flags the user's quote in the same
	/// transaction.
	pub async fn create_entry(&self, req: CreateEntryRequest) -> Result<EntryView> {
		let title = normalize_title(req.title.as_deref())?;
		let now = crate::now_utc();
		let entry = JournalEntry {
			entry_id: Uuid::new_v4(),
			user_id: req.user_id,
			title: title.map(str::to_string),
			body: String::new(),
			mood_score: None,
			entry_date: req.entry_date.unwrap_or_else(|| now.date()),
			version: 0,
			created_at: now,
			updated_at: now,
		};
		let mut tx = self.db.pool.begin().await?;

		entries::insert_entry(&mut *tx, &entry).await?;
		self.on_entry_created(&mut *tx, entry.user_id, now).await?;

		tx.commit().await?;

		tracing::info!(
			entry_id = %entry.entry_id,
			user_id = %entry.user_id,
			"Created journal entry."
		);

		let analysis_state = analysis::derive(&entry, None, now);

		Ok(view(entry, analysis_state))
	}

	/// Replaces the body and schedules mood analysis in one transaction. An unchanged body is not
	/// a write: the current version comes back and nothing is scheduled.
	pub async fn update_body(&self, req: UpdateBodyRequest) -> Result<UpdateResponse> {
		validate_expected_version(req.expected_version)?;

		let mut tx = self.db.pool.begin().await?;
		let entry = entries::lock_entry(&mut tx, req.user_id, req.entry_id).await?;

		check_version(req.expected_version, entry.version)?;

		if entry.body == req.body {
			tx.commit().await?;

			return Ok(UpdateResponse {
				entry_id: entry.entry_id,
				version: entry.version,
				updated_at: entry.updated_at,
				analysis_scheduled: false,
			});
		}

		let now = crate::now_utc();
		let changes = EntryChanges { body: Some(&req.body), ..Default::default() };
		let version = entries::apply_changes(&mut tx, entry.entry_id, entry.version, &changes, now)
			.await?;

		self.on_body_updated(&mut *tx, entry.entry_id, now).await?;

		tx.commit().await?;

		tracing::info!(entry_id = %entry.entry_id, version, "Updated journal entry body.");

		Ok(UpdateResponse {
			entry_id: entry.entry_id,
			version,
			updated_at: now,
			analysis_scheduled: true,
		})
	}

	/// Title and date edits bump the version but never touch the mood score or the queue.
	pub async fn update_metadata(&self, req: UpdateMetadataRequest) -> Result<UpdateResponse> {
		validate_expected_version(req.expected_version)?;

		if req.title.is_none() && req.entry_date.is_none() {
			return Err(Error::InvalidRequest { message: "No updates provided.".to_string() });
		}

		let title = req.title.as_deref().map(|title| normalize_title(Some(title))).transpose()?;
		let mut tx = self.db.pool.begin().await?;
		let entry = entries::lock_entry(&mut tx, req.user_id, req.entry_id).await?;

		check_version(req.expected_version, entry.version)?;

		let now = crate::now_utc();
		let changes = EntryChanges { body: None, title, entry_date: req.entry_date };
		let version = entries::apply_changes(&mut tx, entry.entry_id, entry.version, &changes, now)
			.await?;

		tx.commit().await?;

		tracing::info!(entry_id = %entry.entry_id, version, "Updated journal entry metadata.");

		Ok(UpdateResponse {
			entry_id: entry.entry_id,
			version,
			updated_at: now,
			analysis_scheduled: false,
		})
	}

	pub async fn delete_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<()> {
		let mut tx = self.db.pool.begin().await?;
		// Locking first keeps the queue untouched when the entry belongs to someone else.
		let _ = entries::lock_entry(&mut tx, user_id, entry_id).await?;

		self.on_entry_deleted(&mut *tx, entry_id).await?;
		entries::delete_entry(&mut *tx, user_id, entry_id).await?;

		tx.commit().await?;

		tracing::info!(%entry_id, %user_id, "Deleted journal entry.");

		Ok(())
	}

	pub async fn get_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<EntryView> {
		let entry = entries::get_entry(&self.db.pool, user_id, entry_id)
			.await?
			.ok_or_else(|| not_found(entry_id))?;
		let queued = queue::get(&self.db.pool, entry_id).await?;
		let analysis_state = analysis::derive(&entry, queued.as_ref(), crate::now_utc());

		Ok(view(entry, analysis_state))
	}
}

pub(crate) fn not_found(entry_id: Uuid) -> Error {
	Error::NotFound { message: format!("journal entry {entry_id}") }
}

fn view(entry: JournalEntry, analysis_state: AnalysisState) -> EntryView {
	EntryView {
		entry_id: entry.entry_id,
		user_id: entry.user_id,
		title: entry.title,
		body: entry.body,
		mood_score: entry.mood_score,
		entry_date: entry.entry_date,
		version: entry.version,
		created_at: entry.created_at,
		updated_at: entry.updated_at,
		analysis_state,
	}
}

/// Trims the title. Blank titles become `None`.
fn normalize_title(title: Option<&str>) -> Result<Option<&str>> {
	let Some(title) = title.map(str::trim).filter(|title| !title.is_empty()) else {
		return Ok(None);
	};

	if title.chars().count() > MAX_TITLE_CHARS {
		return Err(Error::InvalidRequest {
			message: format!("title must be at most {MAX_TITLE_CHARS} characters."),
		});
	}

	Ok(Some(title))
}

fn validate_expected_version(expected: Option<i64>) -> Result<()> {
	if expected.is_some_and(|version| version < 0) {
		return Err(Error::InvalidRequest {
			message: "expected_version must be zero or greater.".to_string(),
		});
	}

	Ok(())
}

fn check_version(expected: Option<i64>, current: i64) -> Result<()> {
	match expected {
		Some(expected) if expected != current => Err(Error::Conflict { expected, current }),
		_ => Ok(()),
	}
}
