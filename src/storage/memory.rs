// ABOUTME: In-memory storage gateway backed by RwLock-guarded maps
// ABOUTME: Records heart-rate samples in arrival order and supports failure and latency injection

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use wearable_core::errors::StorageError;
use wearable_core::models::{DailyActivity, DailySleep, DailySummary, UserId};

use super::{HeartRateSample, StorageGateway};

type DayKey = (UserId, NaiveDate);

/// Storage gateway that keeps everything in process memory
#[derive(Default)]
pub struct InMemoryStorage {
    heart_rates: RwLock<Vec<HeartRateSample>>,
    activity: RwLock<HashMap<DayKey, DailyActivity>>,
    sleep: RwLock<HashMap<DayKey, DailySleep>>,
    summaries: RwLock<HashMap<DayKey, DailySummary>>,
    failing: AtomicBool,
    delay: RwLock<Option<Duration>>,
    writes: AtomicUsize,
}

impl InMemoryStorage {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `StorageError::Unavailable` while set
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every call by `delay`
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().await = delay;
    }

    /// Successful writes so far
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Heart-rate samples in arrival order
    pub async fn heart_rates(&self) -> Vec<HeartRateSample> {
        self.heart_rates.read().await.clone()
    }

    /// Every stored summary
    pub async fn summaries(&self) -> Vec<DailySummary> {
        let mut summaries: Vec<_> = self.summaries.read().await.values().cloned().collect();
        summaries.sort_by_key(|s| (s.user_id, s.date));
        summaries
    }

    async fn gate(&self) -> Result<(), StorageError> {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                reason: "in-memory storage set to fail".to_owned(),
            });
        }
        Ok(())
    }

    fn count_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageGateway for InMemoryStorage {
    async fn store_heart_rate(
        &self,
        user_id: UserId,
        timestamp: DateTime<Utc>,
        heart_rate: i64,
        device_id: &str,
    ) -> Result<(), StorageError> {
        self.gate().await?;
        self.heart_rates.write().await.push(HeartRateSample {
            user_id,
            timestamp,
            heart_rate,
            device_id: device_id.to_owned(),
        });
        self.count_write();
        Ok(())
    }

    async fn store_daily_activity(
        &self,
        user_id: UserId,
        date: NaiveDate,
        activity: &DailyActivity,
    ) -> Result<(), StorageError> {
        self.gate().await?;
        self.activity
            .write()
            .await
            .insert((user_id, date), *activity);
        self.count_write();
        Ok(())
    }

    async fn get_daily_activity(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyActivity>, StorageError> {
        self.gate().await?;
        Ok(self.activity.read().await.get(&(user_id, date)).copied())
    }

    async fn store_sleep(
        &self,
        user_id: UserId,
        date: NaiveDate,
        sleep: &DailySleep,
    ) -> Result<(), StorageError> {
        self.gate().await?;
        self.sleep.write().await.insert((user_id, date), *sleep);
        self.count_write();
        Ok(())
    }

    async fn get_sleep(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailySleep>, StorageError> {
        self.gate().await?;
        Ok(self.sleep.read().await.get(&(user_id, date)).copied())
    }

    async fn store_daily_summary(&self, summary: &DailySummary) -> Result<(), StorageError> {
        self.gate().await?;
        self.summaries
            .write()
            .await
            .insert((summary.user_id, summary.date), summary.clone());
        self.count_write();
        Ok(())
    }

    async fn get_daily_summary(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailySummary>, StorageError> {
        self.gate().await?;
        Ok(self.summaries.read().await.get(&(user_id, date)).cloned())
    }
}
