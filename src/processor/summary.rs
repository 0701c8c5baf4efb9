// ABOUTME: Daily summary computation over drained points
// ABOUTME: Per-user rollups for one UTC day, mergeable across processing cycles

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use wearable_core::models::{
    DailySummary, HealthDataPoint, MeasurementSummary, MeasurementType, UserId,
};

/// Summarize the points of `user_id` dated `date`
#[must_use]
pub fn summarize_user(
    drained: &[(MeasurementType, Vec<Arc<HealthDataPoint>>)],
    user_id: UserId,
    date: NaiveDate,
) -> DailySummary {
    let mut summary = DailySummary::empty(user_id, date);
    let mut values: BTreeMap<&str, Vec<f64>> = BTreeMap::new();

    for (measurement_type, points) in drained {
        for point in points
            .iter()
            .filter(|p| p.user_id == user_id && p.date() == date)
        {
            values
                .entry(measurement_type.as_str())
                .or_default()
                .push(point.value);
        }
    }

    for (measurement_type, values) in values {
        if let Some(stats) = MeasurementSummary::from_values(&values) {
            summary.data_points += stats.count;
            summary.measurements.insert(measurement_type.to_owned());
            summary.metrics.insert(measurement_type.to_owned(), stats);
        }
    }
    summary
}

/// Fold a later summary for the same user and day into an earlier one
#[must_use]
pub fn merge_summaries(earlier: &DailySummary, later: &DailySummary) -> DailySummary {
    let mut merged = earlier.clone();
    merged.data_points += later.data_points;
    merged
        .measurements
        .extend(later.measurements.iter().cloned());

    for (measurement_type, stats) in &later.metrics {
        merged
            .metrics
            .entry(measurement_type.clone())
            .and_modify(|existing| *existing = combine(existing, stats))
            .or_insert(*stats);
    }
    merged
}

fn combine(a: &MeasurementSummary, b: &MeasurementSummary) -> MeasurementSummary {
    let count = a.count + b.count;
    if count == 0 {
        return *a;
    }
    MeasurementSummary {
        avg: a.avg.mul_add(a.count as f64, b.avg * b.count as f64) / count as f64,
        min: a.min.min(b.min),
        max: a.max.max(b.max),
        count,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use wearable_core::models::DeviceType;

    use super::*;

    fn point(user_id: UserId, measurement_type: &str, value: f64, day: u32) -> Arc<HealthDataPoint> {
        let timestamp = Utc
            .with_ymd_and_hms(2026, 3, day, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Arc::new(HealthDataPoint::new(
            user_id,
            "AA:BB",
            DeviceType::HeartRateMonitor,
            MeasurementType::parse(measurement_type).unwrap_or_else(|_| MeasurementType::unknown()),
            value,
            timestamp,
        ))
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap_or_default()
    }

    #[test]
    fn test_summary_filters_user_and_day() {
        let drained = vec![
            (
                MeasurementType::heart_rate(),
                vec![
                    point(1, "heart_rate", 60.0, 5),
                    point(1, "heart_rate", 80.0, 5),
                    point(2, "heart_rate", 100.0, 5),
                    point(1, "heart_rate", 200.0, 4),
                ],
            ),
            (
                MeasurementType::parse("steps").unwrap_or_else(|_| MeasurementType::unknown()),
                vec![point(1, "steps", 1200.0, 5)],
            ),
        ];

        let summary = summarize_user(&drained, 1, day(5));
        assert_eq!(summary.data_points, 3);
        assert_eq!(summary.measurements.len(), 2);
        let hr = summary.metrics["heart_rate"];
        assert_eq!(hr.count, 2);
        assert!((hr.avg - 70.0).abs() < f64::EPSILON);
        assert!((hr.min - 60.0).abs() < f64::EPSILON);
        assert!((hr.max - 80.0).abs() < f64::EPSILON);

        assert!(summarize_user(&drained, 3, day(5)).is_empty());
    }

    #[test]
    fn test_merge_weights_average_by_count() {
        let first = summarize_user(
            &[(
                MeasurementType::heart_rate(),
                vec![point(1, "heart_rate", 60.0, 5)],
            )],
            1,
            day(5),
        );
        let second = summarize_user(
            &[(
                MeasurementType::heart_rate(),
                vec![point(1, "heart_rate", 90.0, 5), point(1, "heart_rate", 90.0, 5)],
            )],
            1,
            day(5),
        );

        let merged = merge_summaries(&first, &second);
        assert_eq!(merged.data_points, 3);
        let hr = &merged.metrics["heart_rate"];
        assert_eq!(hr.count, 3);
        assert!((hr.avg - 80.0).abs() < 1e-9);
        assert!((hr.min - 60.0).abs() < f64::EPSILON);
        assert!((hr.max - 90.0).abs() < f64::EPSILON);
    }
}
