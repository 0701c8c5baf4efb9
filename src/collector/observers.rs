// ABOUTME: Fan-out of accepted points to synchronous observers and to a broadcast event bus
// ABOUTME: Observers are isolated from each other; a failure or panic is logged and skipped

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};
use wearable_core::errors::ObserverError;
use wearable_core::models::HealthDataPoint;

use crate::lifecycle::panic_message;

/// Callback invoked for every accepted point
pub trait DataObserver: Send + Sync {
    /// Handle one point
    ///
    /// # Errors
    ///
    /// Any error is logged by the collector and otherwise ignored
    fn on_data(&self, point: &HealthDataPoint) -> Result<(), ObserverError>;
}

impl<F> DataObserver for F
where
    F: Fn(&HealthDataPoint) -> Result<(), ObserverError> + Send + Sync,
{
    fn on_data(&self, point: &HealthDataPoint) -> Result<(), ObserverError> {
        self(point)
    }
}

/// Observers in registration order
#[derive(Default)]
pub struct ObserverSet {
    observers: RwLock<Vec<Arc<dyn DataObserver>>>,
}

impl ObserverSet {
    /// Append an observer
    pub async fn add(&self, observer: Arc<dyn DataObserver>) {
        self.observers.write().await.push(observer);
    }

    /// Call every observer in order, returning the failures
    ///
    /// The list is copied first so no lock is held while observers run.
    pub async fn notify(&self, point: &HealthDataPoint) -> Vec<ObserverError> {
        let observers = self.observers.read().await.clone();
        let mut failures = Vec::new();

        for (index, observer) in observers.iter().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_data(point)));
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(payload) => ObserverError::Panicked {
                    message: panic_message(payload.as_ref()),
                },
            };
            warn!(
                observer = index,
                measurement_type = %point.measurement_type,
                error = %failure,
                "Data observer failed"
            );
            failures.push(failure);
        }
        failures
    }
}

/// Broadcast channel of accepted points for independent subscriber tasks
pub struct EventBus {
    sender: broadcast::Sender<Arc<HealthDataPoint>>,
}

impl EventBus {
    /// Bus retaining up to `capacity` unread points per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// New receiver that sees points published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<HealthDataPoint>> {
        self.sender.subscribe()
    }

    /// Publish a point, returning how many subscribers were reached
    pub fn publish(&self, point: Arc<HealthDataPoint>) -> usize {
        self.sender.send(point).unwrap_or_else(|_| {
            debug!("No event bus subscribers");
            0
        })
    }
}
