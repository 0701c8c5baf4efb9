// ABOUTME: Background processor - periodically drains buffers into the storage gateway
// ABOUTME: Routes points by measurement type, merges partial day rows and rolls up daily summaries
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Background Processor
//!
//! One cycle snapshots the device-to-user map, drains every buffer, and
//! persists each point on its own:
//!
//! - `heart_rate` points become heart-rate samples
//! - activity types are merged into the user's activity row for that day
//! - sleep types are merged into the user's sleep row for that day
//! - anything else is dropped after draining
//!
//! It then rolls the drained points into per-user summaries for the current
//! UTC day, on top of the day's summary already held in memory or, failing
//! that, already persisted. A failed write fails the cycle but not the loop: the supervised
//! loop logs it and backs off. Points whose write failed are not retried.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use wearable_core::errors::StorageError;
use wearable_core::models::{
    DailyActivity, DailySleep, DailySummary, HealthDataPoint, MeasurementType, UserId,
};

use crate::collector::DataCollector;
use crate::config::ProcessorConfig;
use crate::lifecycle::{LoopSchedule, StopOutcome, SupervisedLoop};
use crate::logging::PipelineLogger;
use crate::storage::{with_timeout, StorageGateway};

/// Daily summary rollups
pub mod summary;

pub use summary::{merge_summaries, summarize_user};

/// Failure of one processing cycle
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// Some points could not be written
    #[error("{failed} of {attempted} points failed to persist")]
    PersistFailed {
        /// Points whose write failed
        failed: usize,
        /// Points drained this cycle
        attempted: usize,
        /// First storage error seen
        #[source]
        first: StorageError,
    },

    /// A daily summary could not be written
    #[error("Failed to persist daily summary for user {user_id}")]
    SummaryFailed {
        /// Owning user
        user_id: UserId,
        /// Underlying storage error
        #[source]
        source: StorageError,
    },
}

/// What one cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Points drained from the buffers
    pub drained: usize,
    /// Points written to storage
    pub stored: usize,
    /// Points of types with no storage route
    pub skipped: usize,
    /// Points whose write failed
    pub failed: usize,
    /// Summaries persisted
    pub summaries: usize,
}

enum Routed {
    Stored,
    Skipped,
}

/// Periodic drain-and-persist loop
pub struct BackgroundProcessor {
    collector: Arc<DataCollector>,
    storage: Arc<dyn StorageGateway>,
    config: ProcessorConfig,
    summaries: RwLock<HashMap<UserId, DailySummary>>,
    task: Mutex<Option<SupervisedLoop>>,
}

impl BackgroundProcessor {
    /// Processor draining `collector` into `storage`
    #[must_use]
    pub fn new(
        collector: Arc<DataCollector>,
        storage: Arc<dyn StorageGateway>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            collector,
            storage,
            config,
            summaries: RwLock::new(HashMap::new()),
            task: Mutex::new(None),
        }
    }

    /// Start the loop; returns `false` if it is already running
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut slot = self.task.lock().await;
        if slot.as_ref().is_some_and(|running| !running.is_finished()) {
            debug!("Background processor already running");
            return false;
        }

        let processor: Weak<Self> = Arc::downgrade(self);
        let schedule = LoopSchedule {
            period: self.config.interval,
            error_backoff: self.config.error_backoff,
            cancel_in_flight: false,
        };
        *slot = Some(SupervisedLoop::spawn(
            "background-processor",
            schedule,
            move || {
                let processor = processor.clone();
                async move {
                    match processor.upgrade() {
                        Some(processor) => processor.run_cycle().await.map(|_| ()),
                        None => Ok(()),
                    }
                }
            },
        ));
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Background processor started"
        );
        true
    }

    /// Signal the loop and wait at most the configured stop timeout
    pub async fn stop(&self) {
        let running = self.task.lock().await.take();
        if let Some(running) = running {
            if running.stop(self.config.stop_timeout).await == StopOutcome::Aborted {
                warn!("Background processor aborted after stop timeout");
            }
            info!("Background processor stopped");
        }
    }

    /// Whether the loop is running
    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|running| !running.is_finished())
    }

    /// Run one drain-persist-summarize cycle now
    ///
    /// # Errors
    ///
    /// Returns `ProcessorError` when any point or summary failed to persist.
    /// The buffers are empty afterwards either way.
    pub async fn run_cycle(&self) -> Result<CycleReport, ProcessorError> {
        let started = Instant::now();
        let users = self.collector.device_users().await;
        let drained = self.collector.buffers().drain_all().await;

        let mut report = CycleReport::default();
        let mut first_error = None;

        for (measurement_type, points) in &drained {
            debug!(
                measurement_type = %measurement_type,
                count = points.len(),
                "Processing buffer"
            );
            for point in points {
                report.drained += 1;
                match self.persist(point).await {
                    Ok(Routed::Stored) => report.stored += 1,
                    Ok(Routed::Skipped) => report.skipped += 1,
                    Err(e) => {
                        warn!(
                            device = %point.device_address,
                            measurement_type = %measurement_type,
                            error = %e,
                            "Failed to persist data point"
                        );
                        report.failed += 1;
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        let summary_result = self.store_summaries(&drained, &users).await;
        if let Ok(count) = summary_result {
            report.summaries = count;
        }

        PipelineLogger::log_cycle(
            report.drained,
            report.stored,
            report.summaries,
            started.elapsed().as_millis() as u64,
        );

        if let Some(first) = first_error {
            return Err(ProcessorError::PersistFailed {
                failed: report.failed,
                attempted: report.drained,
                first,
            });
        }
        summary_result?;
        Ok(report)
    }

    /// Route one point to its storage call
    async fn persist(&self, point: &HealthDataPoint) -> Result<Routed, StorageError> {
        let timeout = self.config.storage_timeout;
        let user_id = point.user_id;
        let date = point.date();

        if point.measurement_type.is_heart_rate() {
            with_timeout(
                "store_heart_rate",
                timeout,
                self.storage.store_heart_rate(
                    user_id,
                    point.timestamp,
                    point.value as i64,
                    &point.device_address,
                ),
            )
            .await?;
            return Ok(Routed::Stored);
        }

        if let Some(partial) = DailyActivity::from_measurement(&point.measurement_type, point.value) {
            let existing = with_timeout(
                "get_daily_activity",
                timeout,
                self.storage.get_daily_activity(user_id, date),
            )
            .await?;
            let merged = existing.map_or(partial, |row| row.merge_nonzero(&partial));
            with_timeout(
                "store_daily_activity",
                timeout,
                self.storage.store_daily_activity(user_id, date, &merged),
            )
            .await?;
            return Ok(Routed::Stored);
        }

        if let Some(partial) = DailySleep::from_measurement(&point.measurement_type, point.value) {
            let existing =
                with_timeout("get_sleep", timeout, self.storage.get_sleep(user_id, date)).await?;
            let merged = existing.map_or(partial, |row| row.merge_nonzero(&partial));
            with_timeout(
                "store_sleep",
                timeout,
                self.storage.store_sleep(user_id, date, &merged),
            )
            .await?;
            return Ok(Routed::Stored);
        }

        debug!(
            measurement_type = %point.measurement_type,
            "No storage route, point drained without write"
        );
        Ok(Routed::Skipped)
    }

    /// Fold this cycle's points into today's summaries and persist the non-empty ones
    async fn store_summaries(
        &self,
        drained: &[(MeasurementType, Vec<Arc<HealthDataPoint>>)],
        users: &HashMap<String, UserId>,
    ) -> Result<usize, ProcessorError> {
        let today = Utc::now().date_naive();
        let users: BTreeSet<UserId> = users.values().copied().collect();
        let mut stored = 0;

        for user_id in users {
            let fresh = summarize_user(drained, user_id, today);
            if fresh.is_empty() {
                continue;
            }

            let cached = self
                .summaries
                .read()
                .await
                .get(&user_id)
                .filter(|cached| cached.date == today)
                .cloned();
            let previous = match cached {
                Some(cached) => Some(cached),
                None => with_timeout(
                    "get_daily_summary",
                    self.config.storage_timeout,
                    self.storage.get_daily_summary(user_id, today),
                )
                .await
                .map_err(|source| ProcessorError::SummaryFailed { user_id, source })?,
            };
            let summary = match previous {
                Some(previous) => merge_summaries(&previous, &fresh),
                None => fresh,
            };

            with_timeout(
                "store_daily_summary",
                self.config.storage_timeout,
                self.storage.store_daily_summary(&summary),
            )
            .await
            .map_err(|source| ProcessorError::SummaryFailed { user_id, source })?;

            debug!(user_id, data_points = summary.data_points, "Daily summary stored");
            self.summaries.write().await.insert(user_id, summary);
            stored += 1;
        }
        Ok(stored)
    }

    /// Latest summary per user, ordered by user
    pub async fn summaries(&self) -> Vec<DailySummary> {
        let mut summaries: Vec<_> = self.summaries.read().await.values().cloned().collect();
        summaries.sort_by_key(|s| s.user_id);
        summaries
    }
}
