use std::{future::Future, sync::Arc, time::Duration as StdDuration};

use color_eyre::Result;
use time::{Duration, OffsetDateTime};
use tokio::{
	sync::Semaphore,
	task::{JoinError, JoinSet},
	time::{Instant, MissedTickBehavior},
};

use journal_config::Config;
use journal_domain::{quote::QuotePolicy, retry::RetryDecision};
use journal_providers::{
	resilient::{CallFailure, ResilientCaller},
	task::{MoodTask, QuoteTask},
};
use journal_storage::{
	db::Db,
	entries,
	models::{AnalysisClaim, QuoteClaim},
	queue::{self, Ack},
	quotes,
};

#[derive(Clone, Copy, Debug)]
pub struct Settings {
	pub mood_poll_interval: StdDuration,
	pub quote_poll_interval: StdDuration,
	pub worker_pool_size: usize,
	pub claim_batch_size: u32,
	pub claim_lease: Duration,
}
impl Settings {
	pub fn from_config(cfg: &journal_config::Pipeline) -> Self {
		Self {
			mood_poll_interval: StdDuration::from_millis(cfg.mood_poll_interval_ms),
			quote_poll_interval: StdDuration::from_millis(cfg.quote_poll_interval_ms),
			worker_pool_size: cfg.worker_pool_size,
			claim_batch_size: cfg.claim_batch_size,
			claim_lease: Duration::seconds(cfg.claim_lease_seconds),
		}
	}
}

pub struct WorkerState {
	pub db: Db,
	pub caller: ResilientCaller,
	pub quotes: QuotePolicy,
	pub settings: Settings,
}
impl WorkerState {
	pub fn new(cfg: &Config, db: Db, caller: ResilientCaller) -> Self {
		Self {
			db,
			caller,
			quotes: QuotePolicy::from_config(&cfg.quotes),
			settings: Settings::from_config(&cfg.pipeline),
		}
	}
}

/// Enrichment tasks in flight, bounded by the semaphore.
struct Pool {
	permits: Arc<Semaphore>,
	tasks: JoinSet<()>,
}
impl Pool {
	fn new(size: usize) -> Self {
		Self { permits: Arc::new(Semaphore::new(size)), tasks: JoinSet::new() }
	}

	fn free(&self) -> u32 {
		u32::try_from(self.permits.available_permits()).unwrap_or(u32::MAX)
	}

	async fn spawn<F>(&mut self, task: F) -> Result<()>
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let permit = self.permits.clone().acquire_owned().await?;

		self.tasks.spawn(async move {
			task.await;

			drop(permit);
		});

		Ok(())
	}

	async fn drain(&mut self) {
		while let Some(joined) = self.tasks.join_next().await {
			log_join(joined);
		}
	}
}

/// Polls both queues until `shutdown` resolves, then waits for in-flight tasks.
pub async fn run_worker<S>(state: WorkerState, shutdown: S) -> Result<()>
where
	S: Future<Output = ()>,
{
	let state = Arc::new(state);
	let mut pool = Pool::new(state.settings.worker_pool_size);
	let mut mood_tick = tokio::time::interval(state.settings.mood_poll_interval);
	let mut quote_tick = tokio::time::interval(state.settings.quote_poll_interval);

	mood_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
	quote_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

	tokio::pin!(shutdown);

	tracing::info!(
		mood_poll_ms = state.settings.mood_poll_interval.as_millis() as u64,
		quote_poll_ms = state.settings.quote_poll_interval.as_millis() as u64,
		pool_size = state.settings.worker_pool_size,
		"Worker loop started."
	);

	loop {
		tokio::select! {
			_ = &mut shutdown => {
				tracing::info!(in_flight = pool.tasks.len(), "Shutdown requested. Draining tasks.");

				break;
			},
			_ = mood_tick.tick() => {
				let now = OffsetDateTime::now_utc();

				if let Err(err) = dispatch_analysis(&state, &mut pool, now).await {
					tracing::error!(error = %err, "Mood analysis dispatch failed.");
				}
			},
			_ = quote_tick.tick() => {
				let now = OffsetDateTime::now_utc();

				if let Err(err) = dispatch_quotes(&state, &mut pool, now).await {
					tracing::error!(error = %err, "Quote regeneration dispatch failed.");
				}
			},
			Some(joined) = pool.tasks.join_next(), if !pool.tasks.is_empty() => log_join(joined),
		}
	}

	pool.drain().await;

	tracing::info!("Worker stopped.");

	Ok(())
}

/// One mood tick at `now` that waits for every task it started. Returns the number of claims.
pub async fn run_analysis_once(state: &Arc<WorkerState>, now: OffsetDateTime) -> Result<usize> {
	let mut pool = Pool::new(state.settings.worker_pool_size);
	let claimed = dispatch_analysis(state, &mut pool, now).await?;

	pool.drain().await;

	Ok(claimed)
}

/// One quote tick at `now` that waits for every task it started. Returns the number of claims.
pub async fn run_quotes_once(state: &Arc<WorkerState>, now: OffsetDateTime) -> Result<usize> {
	let mut pool = Pool::new(state.settings.worker_pool_size);
	let claimed = dispatch_quotes(state, &mut pool, now).await?;

	pool.drain().await;

	Ok(claimed)
}

async fn dispatch_analysis(
	state: &Arc<WorkerState>,
	pool: &mut Pool,
	now: OffsetDateTime,
) -> Result<usize> {
	let limit = state.settings.claim_batch_size.min(pool.free());

	if limit == 0 {
		tracing::debug!("Mood tick skipped. No free workers.");

		return Ok(0);
	}

	let claims = queue::claim_ready(&state.db, now, limit, state.settings.claim_lease).await?;
	let claimed = claims.len();

	for claim in claims {
		let state = state.clone();

		pool.spawn(async move {
			let entry_id = claim.entry_id();

			if let Err(err) = process_analysis(&state, claim, now).await {
				tracing::error!(entry_id = %entry_id, error = %err, "Mood analysis task failed.");
			}
		})
		.await?;
	}

	tracing::debug!(claimed, "Mood tick dispatched.");

	Ok(claimed)
}

async fn dispatch_quotes(
	state: &Arc<WorkerState>,
	pool: &mut Pool,
	now: OffsetDateTime,
) -> Result<usize> {
	let limit = state.settings.claim_batch_size.min(pool.free());

	if limit == 0 {
		tracing::debug!("Quote tick skipped. No free workers.");

		return Ok(0);
	}

	let claims = quotes::claim_due(
		&state.db,
		now,
		state.quotes.stale_before(now),
		limit,
		state.settings.claim_lease,
	)
	.await?;
	let claimed = claims.len();

	for claim in claims {
		let state = state.clone();

		pool.spawn(async move {
			let user_id = claim.user_id();

			if let Err(err) = process_quote(&state, claim, now).await {
				tracing::error!(user_id = %user_id, error = %err, "Quote regeneration task failed.");
			}
		})
		.await?;
	}

	tracing::debug!(claimed, "Quote tick dispatched.");

	Ok(claimed)
}

async fn process_analysis(
	state: &WorkerState,
	claim: AnalysisClaim,
	claimed_at: OffsetDateTime,
) -> Result<()> {
	let started = Instant::now();
	let entry_id = claim.entry_id();
	let Some(entry) = entries::get_entry_by_id(&state.db.pool, entry_id).await? else {
		queue::remove(&state.db.pool, entry_id).await?;

		return Ok(());
	};

	if entry.body.trim().is_empty() {
		let mut conn = state.db.pool.acquire().await?;
		let ack = queue::complete(&mut conn, claim, claimed_at).await?;

		tracing::debug!(entry_id = %entry_id, ack = ?ack, "Blank body. Nothing to analyze.");

		return Ok(());
	}

	let task = MoodTask { body: entry.body };
	let result = state.caller.call(&task, claim.attempt_count()).await;
	let now = finished_at(claimed_at, started);

	match result {
		Ok(enriched) => {
			let mood_score = enriched.output.get();
			let mut tx = state.db.pool.begin().await?;

			entries::write_mood_score(&mut *tx, entry_id, mood_score).await?;

			let ack = queue::complete(&mut tx, claim, now).await?;

			if ack == Ack::LeaseLost {
				tx.rollback().await?;

				tracing::warn!(entry_id = %entry_id, "Lease lost before completion. Mood discarded.");

				return Ok(());
			}

			tx.commit().await?;

			tracing::info!(
				entry_id = %entry_id,
				mood_score,
				provider_id = %enriched.provider_id,
				failed_over = enriched.failed_over,
				ack = ?ack,
				"Mood analysis stored."
			);
		},
		Err(failure) => record_analysis_failure(state, claim, failure, now).await?,
	}

	Ok(())
}

async fn record_analysis_failure(
	state: &WorkerState,
	claim: AnalysisClaim,
	failure: CallFailure,
	now: OffsetDateTime,
) -> Result<()> {
	let entry_id = claim.entry_id();
	let error_text = failure.describe();
	let delay = match failure {
		CallFailure::RetryLater { delay, .. } => delay,
		CallFailure::Permanent { .. } => {
			tracing::error!(
				entry_id = %entry_id,
				attempt = claim.attempt_count() + 1,
				error = %error_text,
				"Mood analysis failed permanently. Dropping the task."
			);

			return abandon(state, claim, &error_text, now).await;
		},
	};

	match state.caller.policy().after_failure(claim.attempt_count()) {
		RetryDecision::Reschedule { attempt_count } => {
			let retry_at = now.saturating_add(delay);

			tracing::warn!(
				entry_id = %entry_id,
				attempt = attempt_count,
				retry_in_ms = delay.whole_milliseconds() as i64,
				error = %error_text,
				"Mood analysis failed. Rescheduling."
			);

			if !queue::reschedule(&state.db.pool, claim, retry_at, &error_text, now).await? {
				tracing::warn!(entry_id = %entry_id, "Lease lost before the failure was recorded.");
			}

			Ok(())
		},
		RetryDecision::GiveUp { attempts } => {
			tracing::error!(
				entry_id = %entry_id,
				attempt = attempts,
				error = %error_text,
				"Mood analysis exhausted its retries. Dropping the task."
			);

			abandon(state, claim, &error_text, now).await
		},
	}
}

async fn abandon(
	state: &WorkerState,
	claim: AnalysisClaim,
	error_text: &str,
	now: OffsetDateTime,
) -> Result<()> {
	let entry_id = claim.entry_id();
	let mut conn = state.db.pool.acquire().await?;
	let ack = queue::abandon(&mut conn, claim, error_text, now).await?;

	if ack == Ack::KeptForNewerEdit {
		tracing::info!(entry_id = %entry_id, "Entry was edited during the attempt. Starting over.");
	}

	Ok(())
}

async fn process_quote(
	state: &WorkerState,
	claim: QuoteClaim,
	claimed_at: OffsetDateTime,
) -> Result<()> {
	let started = Instant::now();
	let user_id = claim.user_id();
	let bodies =
		entries::recent_bodies(&state.db.pool, user_id, state.quotes.fan_in_entries).await?;
	let fan_in = bodies.len();
	let result = state.caller.call(&QuoteTask { entries: bodies }, 0).await;
	let now = finished_at(claimed_at, started);

	match result {
		Ok(enriched) => {
			let quote = enriched.output;
			let saved =
				quotes::save_generated(&state.db.pool, claim, &quote.text, &quote.tags, now).await?;

			if saved {
				tracing::info!(
					user_id = %user_id,
					fan_in,
					provider_id = %enriched.provider_id,
					failed_over = enriched.failed_over,
					"Quote regenerated."
				);
			} else {
				tracing::warn!(user_id = %user_id, "Lease lost before the quote was saved.");
			}
		},
		Err(failure) => {
			// The tracker stays due, so the next scan retries it.
			tracing::warn!(
				user_id = %user_id,
				error = %failure.describe(),
				"Quote regeneration failed. Releasing the claim."
			);

			quotes::release(&state.db.pool, claim).await?;
		},
	}

	Ok(())
}

fn log_join(joined: std::result::Result<(), JoinError>) {
	match joined {
		Ok(()) => {},
		Err(err) if err.is_panic() => tracing::error!(error = %err, "Enrichment task panicked."),
		Err(err) => tracing::warn!(error = %err, "Enrichment task was cancelled."),
	}
}

/// Tick time advanced by how long the task took.
fn finished_at(claimed_at: OffsetDateTime, started: Instant) -> OffsetDateTime {
	claimed_at.saturating_add(Duration::try_from(started.elapsed()).unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn settings_follow_the_pipeline_config() {
		let settings = Settings::from_config(&journal_config::Pipeline::default());

		assert_eq!(settings.mood_poll_interval, StdDuration::from_secs(3));
		assert_eq!(settings.quote_poll_interval, StdDuration::from_secs(30));
		assert_eq!(settings.claim_lease, Duration::seconds(120));
	}

	#[test]
	fn finished_at_never_precedes_the_tick() {
		let tick = datetime!(2026-03-01 09:00:00 UTC);

		assert!(finished_at(tick, Instant::now()) >= tick);
	}

	#[tokio::test]
	async fn pool_reports_free_permits() {
		let mut pool = Pool::new(2);

		pool.spawn(async {}).await.expect("Failed to spawn.");
		pool.drain().await;

		assert_eq!(pool.free(), 2);
	}
}
