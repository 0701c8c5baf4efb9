// ABOUTME: SQLite storage gateway on an sqlx connection pool
// ABOUTME: Creates its tables on startup and upserts per-day rows keyed by (user, date)
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use tracing::info;
use wearable_core::errors::StorageError;
use wearable_core::models::{
    DailyActivity, DailySleep, DailySummary, MeasurementSummary, UserId,
};

use super::{HeartRateSample, StorageGateway};

/// SQLite-backed gateway
#[derive(Clone)]
pub struct SqliteStorage {
    pool: Pool<Sqlite>,
}

impl SqliteStorage {
    /// Open (creating if needed) the database at `database_url` and create tables
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Database` if the connection or table creation fails
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let in_memory = database_url.contains(":memory:");
        let connection_options = if database_url.starts_with("sqlite:")
            && !in_memory
            && !database_url.contains('?')
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        // Every pooled connection to :memory: would be its own database
        let max_connections = if in_memory { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&connection_options)
            .await
            .map_err(|e| StorageError::database("connect", e))?;

        let storage = Self { pool };
        storage.migrate().await?;
        info!(database = %database_url, "SQLite storage ready");
        Ok(storage)
    }

    /// Create tables and indexes if they do not exist
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Database` if a statement fails
    pub async fn migrate(&self) -> Result<(), StorageError> {
        let statements = [
            r"
            CREATE TABLE IF NOT EXISTS heart_rate_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                heart_rate INTEGER NOT NULL,
                device_id TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_heart_rate_user_time ON heart_rate_data(user_id, timestamp)",
            r"
            CREATE TABLE IF NOT EXISTS daily_activity (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                activity_date TEXT NOT NULL,
                total_steps INTEGER NOT NULL DEFAULT 0,
                total_distance REAL NOT NULL DEFAULT 0.0,
                very_active_minutes INTEGER NOT NULL DEFAULT 0,
                fairly_active_minutes INTEGER NOT NULL DEFAULT 0,
                lightly_active_minutes INTEGER NOT NULL DEFAULT 0,
                sedentary_minutes INTEGER NOT NULL DEFAULT 0,
                calories INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, activity_date)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS sleep_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                sleep_date TEXT NOT NULL,
                total_sleep_records INTEGER NOT NULL DEFAULT 1,
                total_minutes_asleep INTEGER NOT NULL DEFAULT 0,
                total_time_in_bed INTEGER NOT NULL DEFAULT 0,
                sleep_efficiency REAL NOT NULL DEFAULT 0.0,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, sleep_date)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS daily_summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                summary_date TEXT NOT NULL,
                data_points INTEGER NOT NULL,
                measurements TEXT NOT NULL, -- JSON array
                metrics TEXT NOT NULL, -- JSON object
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, summary_date)
            )
            ",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::database("migrate", e))?;
        }
        Ok(())
    }

    /// Heart-rate samples for a user, oldest first
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Database` if the query fails
    pub async fn heart_rates(&self, user_id: UserId) -> Result<Vec<HeartRateSample>, StorageError> {
        let rows = sqlx::query(
            "SELECT user_id, timestamp, heart_rate, device_id FROM heart_rate_data
             WHERE user_id = ? ORDER BY timestamp ASC, id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::database("load heart rates", e))?;

        rows.iter()
            .map(|row| -> Result<HeartRateSample, StorageError> {
                Ok(HeartRateSample {
                    user_id: row.try_get("user_id").map_err(decode_err)?,
                    timestamp: row.try_get("timestamp").map_err(decode_err)?,
                    heart_rate: row.try_get("heart_rate").map_err(decode_err)?,
                    device_id: row
                        .try_get::<Option<String>, _>("device_id")
                        .map_err(decode_err)?
                        .unwrap_or_default(),
                })
            })
            .collect()
    }
}

fn decode_err(e: sqlx::Error) -> StorageError {
    StorageError::database("decode row", e)
}

#[async_trait]
impl StorageGateway for SqliteStorage {
    async fn store_heart_rate(
        &self,
        user_id: UserId,
        timestamp: DateTime<Utc>,
        heart_rate: i64,
        device_id: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO heart_rate_data (user_id, timestamp, heart_rate, device_id)
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(timestamp)
        .bind(heart_rate)
        .bind(device_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::database("store heart rate", e))?;
        Ok(())
    }

    async fn store_daily_activity(
        &self,
        user_id: UserId,
        date: NaiveDate,
        activity: &DailyActivity,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO daily_activity (
                user_id, activity_date, total_steps, total_distance, very_active_minutes,
                fairly_active_minutes, lightly_active_minutes, sedentary_minutes, calories
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, activity_date) DO UPDATE SET
                total_steps = excluded.total_steps,
                total_distance = excluded.total_distance,
                very_active_minutes = excluded.very_active_minutes,
                fairly_active_minutes = excluded.fairly_active_minutes,
                lightly_active_minutes = excluded.lightly_active_minutes,
                sedentary_minutes = excluded.sedentary_minutes,
                calories = excluded.calories
            ",
        )
        .bind(user_id)
        .bind(date)
        .bind(activity.steps)
        .bind(activity.distance)
        .bind(activity.very_active_minutes)
        .bind(activity.fairly_active_minutes)
        .bind(activity.lightly_active_minutes)
        .bind(activity.sedentary_minutes)
        .bind(activity.calories)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::database("store daily activity", e))?;
        Ok(())
    }

    async fn get_daily_activity(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyActivity>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT total_steps, total_distance, very_active_minutes, fairly_active_minutes,
                   lightly_active_minutes, sedentary_minutes, calories
            FROM daily_activity WHERE user_id = ? AND activity_date = ?
            ",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::database("load daily activity", e))?;

        row.map(|row| -> Result<DailyActivity, StorageError> {
            Ok(DailyActivity {
                steps: row.try_get("total_steps").map_err(decode_err)?,
                distance: row.try_get("total_distance").map_err(decode_err)?,
                very_active_minutes: row.try_get("very_active_minutes").map_err(decode_err)?,
                fairly_active_minutes: row.try_get("fairly_active_minutes").map_err(decode_err)?,
                lightly_active_minutes: row
                    .try_get("lightly_active_minutes")
                    .map_err(decode_err)?,
                sedentary_minutes: row.try_get("sedentary_minutes").map_err(decode_err)?,
                calories: row.try_get("calories").map_err(decode_err)?,
            })
        })
        .transpose()
    }

    async fn store_sleep(
        &self,
        user_id: UserId,
        date: NaiveDate,
        sleep: &DailySleep,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO sleep_data (
                user_id, sleep_date, total_sleep_records, total_minutes_asleep,
                total_time_in_bed, sleep_efficiency
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, sleep_date) DO UPDATE SET
                total_sleep_records = excluded.total_sleep_records,
                total_minutes_asleep = excluded.total_minutes_asleep,
                total_time_in_bed = excluded.total_time_in_bed,
                sleep_efficiency = excluded.sleep_efficiency
            ",
        )
        .bind(user_id)
        .bind(date)
        .bind(sleep.records)
        .bind(sleep.minutes_asleep)
        .bind(sleep.time_in_bed)
        .bind(sleep.efficiency)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::database("store sleep", e))?;
        Ok(())
    }

    async fn get_sleep(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailySleep>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT total_sleep_records, total_minutes_asleep, total_time_in_bed, sleep_efficiency
            FROM sleep_data WHERE user_id = ? AND sleep_date = ?
            ",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::database("load sleep", e))?;

        row.map(|row| -> Result<DailySleep, StorageError> {
            Ok(DailySleep {
                records: row.try_get("total_sleep_records").map_err(decode_err)?,
                minutes_asleep: row.try_get("total_minutes_asleep").map_err(decode_err)?,
                time_in_bed: row.try_get("total_time_in_bed").map_err(decode_err)?,
                efficiency: row.try_get("sleep_efficiency").map_err(decode_err)?,
            })
        })
        .transpose()
    }

    async fn store_daily_summary(&self, summary: &DailySummary) -> Result<(), StorageError> {
        let measurements = serde_json::to_string(&summary.measurements).map_err(|source| {
            StorageError::Serialization {
                context: "summary measurements",
                source,
            }
        })?;
        let metrics =
            serde_json::to_string(&summary.metrics).map_err(|source| StorageError::Serialization {
                context: "summary metrics",
                source,
            })?;

        sqlx::query(
            r"
            INSERT INTO daily_summaries (user_id, summary_date, data_points, measurements, metrics)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, summary_date) DO UPDATE SET
                data_points = excluded.data_points,
                measurements = excluded.measurements,
                metrics = excluded.metrics
            ",
        )
        .bind(summary.user_id)
        .bind(summary.date)
        .bind(i64::try_from(summary.data_points).unwrap_or(i64::MAX))
        .bind(measurements)
        .bind(metrics)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::database("store daily summary", e))?;
        Ok(())
    }

    async fn get_daily_summary(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailySummary>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT data_points, measurements, metrics
            FROM daily_summaries WHERE user_id = ? AND summary_date = ?
            ",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::database("load daily summary", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let data_points: i64 = row.try_get("data_points").map_err(decode_err)?;
        let measurements: String = row.try_get("measurements").map_err(decode_err)?;
        let metrics: String = row.try_get("metrics").map_err(decode_err)?;

        let measurements: BTreeSet<String> =
            serde_json::from_str(&measurements).map_err(|source| StorageError::Serialization {
                context: "summary measurements",
                source,
            })?;
        let metrics: BTreeMap<String, MeasurementSummary> = serde_json::from_str(&metrics)
            .map_err(|source| StorageError::Serialization {
                context: "summary metrics",
                source,
            })?;

        Ok(Some(DailySummary {
            user_id,
            date,
            data_points: usize::try_from(data_points).map_err(|_| StorageError::Corrupt {
                entity: "daily summary",
                reason: format!("negative data_points {data_points}"),
            })?,
            measurements,
            metrics,
        }))
    }
}
