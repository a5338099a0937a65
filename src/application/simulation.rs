// Price spike simulation - user-triggered, one run at a time
use crate::application::forecast_api::ForecastApi;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub const SIMULATION_FAILED: &str = "Failed to simulate price spike";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationPhase {
    Idle,
    Simulating,
}

impl SimulationPhase {
    pub fn button_label(&self) -> &'static str {
        match self {
            SimulationPhase::Idle => "Simulate Price Spike",
            SimulationPhase::Simulating => "Simulating...",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationStatus {
    pub phase: SimulationPhase,
    pub message: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("a price spike simulation is already running")]
    AlreadyRunning,
}

#[derive(Clone)]
pub struct SpikeSimulator {
    api: Arc<dyn ForecastApi>,
    status: Arc<Mutex<SimulationStatus>>,
}

impl SpikeSimulator {
    pub fn new(api: Arc<dyn ForecastApi>) -> Self {
        Self {
            api,
            status: Arc::new(Mutex::new(SimulationStatus {
                phase: SimulationPhase::Idle,
                message: None,
            })),
        }
    }

    pub fn status(&self) -> SimulationStatus {
        lock(&self.status).clone()
    }

    /// Run one simulation and return the message to show.
    ///
    /// A missing result settles as [`SIMULATION_FAILED`].
    pub async fn trigger(&self) -> Result<String, SimulationError> {
        let _running = RunningGuard::start(&self.status)?;

        let message = match self.api.fetch_price_spike_simulation().await {
            Some(message) => message,
            None => SIMULATION_FAILED.to_string(),
        };

        lock(&self.status).message = Some(message.clone());
        tracing::info!("price spike simulation settled: {}", message);
        Ok(message)
    }
}

// A poisoned lock only means a panic elsewhere; the status itself stays usable
fn lock(status: &Mutex<SimulationStatus>) -> MutexGuard<'_, SimulationStatus> {
    status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Holds the simulator in `Simulating`; returns it to `Idle` on drop,
/// including when the triggering request goes away mid-flight.
struct RunningGuard<'a> {
    status: &'a Mutex<SimulationStatus>,
}

impl<'a> RunningGuard<'a> {
    fn start(status: &'a Mutex<SimulationStatus>) -> Result<Self, SimulationError> {
        let mut current = lock(status);
        if current.phase == SimulationPhase::Simulating {
            return Err(SimulationError::AlreadyRunning);
        }
        current.phase = SimulationPhase::Simulating;
        Ok(Self { status })
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        lock(self.status).phase = SimulationPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::forecast::ChartPayload;
    use crate::infrastructure::envelope::ResponseEnvelope;
    use async_trait::async_trait;
    use tokio::sync::{oneshot, Mutex as AsyncMutex, Notify};

    /// Spike endpoint that waits to be released with a result.
    struct GatedApi {
        entered: Notify,
        release: AsyncMutex<Option<oneshot::Receiver<Option<String>>>>,
    }

    impl GatedApi {
        fn new() -> (Arc<Self>, oneshot::Sender<Option<String>>) {
            let (tx, rx) = oneshot::channel();
            let api = Arc::new(Self {
                entered: Notify::new(),
                release: AsyncMutex::new(Some(rx)),
            });
            (api, tx)
        }
    }

    #[async_trait]
    impl ForecastApi for GatedApi {
        async fn fetch_forecast_data(&self) -> Option<ChartPayload> {
            None
        }

        async fn fetch_model_metadata(&self) -> Option<ResponseEnvelope> {
            None
        }

        async fn fetch_price_spike_simulation(&self) -> Option<String> {
            self.entered.notify_one();
            let rx = self.release.lock().await.take()?;
            rx.await.ok().flatten()
        }
    }

    #[tokio::test]
    async fn test_trigger_shows_simulating_then_message() {
        let (api, release) = GatedApi::new();
        let simulator = SpikeSimulator::new(api.clone());
        assert_eq!(simulator.status().phase.button_label(), "Simulate Price Spike");

        let running = {
            let simulator = simulator.clone();
            tokio::spawn(async move { simulator.trigger().await })
        };
        api.entered.notified().await;

        let status = simulator.status();
        assert_eq!(status.phase, SimulationPhase::Simulating);
        assert_eq!(status.phase.button_label(), "Simulating...");
        assert_eq!(simulator.trigger().await, Err(SimulationError::AlreadyRunning));

        release
            .send(Some("Expect a price spike between 5pm and 7pm".to_string()))
            .unwrap();
        let message = running.await.unwrap().unwrap();

        assert_eq!(message, "Expect a price spike between 5pm and 7pm");
        let status = simulator.status();
        assert_eq!(status.phase, SimulationPhase::Idle);
        assert_eq!(status.message.as_deref(), Some(message.as_str()));
    }

    #[tokio::test]
    async fn test_failure_settles_with_fallback_message() {
        let (api, release) = GatedApi::new();
        let simulator = SpikeSimulator::new(api);
        release.send(None).unwrap();

        let message = simulator.trigger().await.unwrap();
        assert_eq!(message, SIMULATION_FAILED);
        assert_eq!(simulator.status().phase, SimulationPhase::Idle);
    }

    #[tokio::test]
    async fn test_abandoned_trigger_returns_to_idle() {
        let (api, _release) = GatedApi::new();
        let simulator = SpikeSimulator::new(api.clone());

        let running = {
            let simulator = simulator.clone();
            tokio::spawn(async move { simulator.trigger().await })
        };
        api.entered.notified().await;
        assert_eq!(simulator.status().phase, SimulationPhase::Simulating);

        running.abort();
        assert!(running.await.unwrap_err().is_cancelled());
        assert_eq!(simulator.status().phase, SimulationPhase::Idle);
        assert_eq!(simulator.status().message, None);
    }
}
