use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

use crate::error::PredictionError;
use crate::models::{DiseasePredictionInput, DiseasePredictionResult};

type Slot = Arc<OnceCell<DiseasePredictionResult>>;

/// Collapses concurrent analyses of identical inputs into one upstream call.
///
/// Slots live only while a call is outstanding, so nothing is cached between
/// requests. A failed call leaves its slot empty and the next waiter makes
/// its own attempt.
#[derive(Default)]
pub struct Coalescer {
    in_flight: Mutex<HashMap<String, Slot>>,
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fingerprint(input: &DiseasePredictionInput) -> String {
        serde_json::to_string(input).unwrap_or_else(|_| format!("{:?}", input))
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub async fn run<F, Fut>(
        &self,
        input: &DiseasePredictionInput,
        call: F,
    ) -> Result<DiseasePredictionResult, PredictionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DiseasePredictionResult, PredictionError>>,
    {
        let key = Self::fingerprint(input);
        let slot = self.slot(&key);

        let mut called = false;
        let outcome = slot
            .get_or_try_init(|| {
                called = true;
                let pending = call();
                async {
                    let result = pending.await;
                    // Unlisted before the cell is filled.
                    self.release(&key, &slot);
                    result
                }
            })
            .await
            .cloned();
        if !called {
            tracing::debug!("reused in-flight analysis for identical input");
        }

        self.release(&key, &slot);
        outcome
    }

    fn slot(&self, key: &str) -> Slot {
        let mut map = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(key.to_string()).or_default().clone()
    }

    fn release(&self, key: &str, slot: &Slot) {
        let mut map = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if map.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            map.remove(key);
        }
    }
}
