// ABOUTME: Bounded FIFO buffer of health data points for one measurement type
// ABOUTME: Appending past capacity silently evicts the oldest point

use std::collections::VecDeque;
use std::sync::Arc;

use wearable_core::models::{HealthDataPoint, UserId};

/// Bounded, insertion-ordered sequence of points
#[derive(Debug)]
pub struct DataBuffer {
    capacity: usize,
    points: VecDeque<Arc<HealthDataPoint>>,
}

impl DataBuffer {
    /// Empty buffer holding at most `capacity` points (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    /// Append a point, returning the evicted oldest point if the buffer was full
    pub fn push(&mut self, point: Arc<HealthDataPoint>) -> Option<Arc<HealthDataPoint>> {
        let evicted = if self.points.len() >= self.capacity {
            self.points.pop_front()
        } else {
            None
        };
        self.points.push_back(point);
        evicted
    }

    /// Up to `limit` most recent points, oldest first
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<Arc<HealthDataPoint>> {
        let skip = self.points.len().saturating_sub(limit);
        self.points.iter().skip(skip).cloned().collect()
    }

    /// Up to `limit` most recent points owned by `user_id`, oldest first
    #[must_use]
    pub fn recent_for_user(&self, user_id: UserId, limit: usize) -> Vec<Arc<HealthDataPoint>> {
        let mut matching: Vec<_> = self
            .points
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id)
            .take(limit)
            .cloned()
            .collect();
        matching.reverse();
        matching
    }

    /// Remove and return every point, oldest first
    pub fn drain(&mut self) -> Vec<Arc<HealthDataPoint>> {
        self.points.drain(..).collect()
    }

    /// Number of buffered points
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the buffer holds nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Maximum number of points retained
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use wearable_core::models::{DeviceType, MeasurementType};

    use super::*;

    fn point(user_id: UserId, value: f64) -> Arc<HealthDataPoint> {
        Arc::new(HealthDataPoint::new(
            user_id,
            "AA:BB",
            DeviceType::HeartRateMonitor,
            MeasurementType::heart_rate(),
            value,
            Utc::now(),
        ))
    }

    fn values(points: &[Arc<HealthDataPoint>]) -> Vec<f64> {
        points.iter().map(|p| p.value).collect()
    }

    #[test]
    fn test_evicts_oldest_past_capacity() {
        let mut buffer = DataBuffer::new(3);
        for v in 1..=5 {
            buffer.push(point(1, f64::from(v)));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(values(&buffer.recent(10)), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_user_filter_applies_before_limit() {
        let mut buffer = DataBuffer::new(10);
        buffer.push(point(1, 1.0));
        buffer.push(point(2, 2.0));
        buffer.push(point(1, 3.0));
        buffer.push(point(2, 4.0));

        assert_eq!(values(&buffer.recent_for_user(1, 5)), vec![1.0, 3.0]);
        assert_eq!(values(&buffer.recent_for_user(2, 1)), vec![4.0]);
        assert!(buffer.recent_for_user(3, 5).is_empty());
    }

    #[test]
    fn test_drain_empties() {
        let mut buffer = DataBuffer::new(2);
        buffer.push(point(1, 1.0));
        assert_eq!(buffer.drain().len(), 1);
        assert!(buffer.is_empty());
    }
}
