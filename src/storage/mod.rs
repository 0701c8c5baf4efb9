// ABOUTME: Storage gateway abstraction used by the background processor
// ABOUTME: Heart-rate samples, per-day activity and sleep rows, and daily summaries
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Storage Gateway
//!
//! The processor persists through [`StorageGateway`] only. Two adapters ship
//! with the crate: [`sqlite::SqliteStorage`] on an `sqlx` pool and
//! [`memory::InMemoryStorage`] for tests and storage-less runs.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use wearable_core::errors::StorageError;
use wearable_core::models::{DailyActivity, DailySleep, DailySummary, UserId};

/// In-memory gateway
pub mod memory;
/// SQLite gateway
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemoryStorage;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

/// One persisted heart-rate sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateSample {
    /// Owning user
    pub user_id: UserId,
    /// When it was measured
    pub timestamp: DateTime<Utc>,
    /// Beats per minute
    pub heart_rate: i64,
    /// Source device address
    pub device_id: String,
}

/// Persistence used by the background processor
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Persist one heart-rate sample
    async fn store_heart_rate(
        &self,
        user_id: UserId,
        timestamp: DateTime<Utc>,
        heart_rate: i64,
        device_id: &str,
    ) -> Result<(), StorageError>;

    /// Insert or replace the activity row for (user, date)
    async fn store_daily_activity(
        &self,
        user_id: UserId,
        date: NaiveDate,
        activity: &DailyActivity,
    ) -> Result<(), StorageError>;

    /// Activity row for (user, date)
    async fn get_daily_activity(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyActivity>, StorageError>;

    /// Insert or replace the sleep row for (user, date)
    async fn store_sleep(
        &self,
        user_id: UserId,
        date: NaiveDate,
        sleep: &DailySleep,
    ) -> Result<(), StorageError>;

    /// Sleep row for (user, date)
    async fn get_sleep(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailySleep>, StorageError>;

    /// Insert or replace the summary for its (user, date)
    async fn store_daily_summary(&self, summary: &DailySummary) -> Result<(), StorageError>;

    /// Summary for (user, date)
    async fn get_daily_summary(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailySummary>, StorageError>;
}

/// Run a storage call under a deadline
///
/// # Errors
///
/// Returns the call's own error, or `StorageError::Timeout` when the
/// deadline elapses first
pub async fn with_timeout<T, F>(
    operation: &'static str,
    after: Duration,
    call: F,
) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>> + Send,
{
    tokio::time::timeout(after, call)
        .await
        .map_err(|_| StorageError::Timeout { operation, after })?
}
