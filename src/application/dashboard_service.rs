// Dashboard service - Mounts one set of panels per page view
use crate::application::forecast_api::ForecastApi;
use crate::application::panel::{LoadOutcome, Panel, PanelState};
use crate::application::simulation::{SimulationError, SimulationStatus, SpikeSimulator};
use crate::domain::forecast::ChartPayload;
use crate::domain::model::{ModelCard, ModelMetadata};
use crate::infrastructure::config::PanelSettings;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

pub type ViewId = u64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("view {0} is not open")]
    NotOpen(ViewId),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Everything one page view owns: its two panels and its simulate button.
struct View {
    forecast: Panel<ChartPayload>,
    model_card: Panel<ModelMetadata>,
    simulator: SpikeSimulator,
}

impl View {
    fn unmount(self) -> Vec<JoinHandle<LoadOutcome>> {
        vec![self.forecast.unmount(), self.model_card.unmount()]
    }
}

#[derive(Default)]
struct Views {
    next_id: ViewId,
    open: HashMap<ViewId, View>,
    // oldest first, for eviction
    order: VecDeque<ViewId>,
}

/// Point-in-time view of everything the dashboard page renders.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub view: ViewId,
    pub forecast: PanelState<ChartPayload>,
    pub model_card: PanelState<ModelCard>,
    pub simulation: SimulationStatus,
}

#[derive(Clone)]
pub struct DashboardService {
    api: Arc<dyn ForecastApi>,
    settings: PanelSettings,
    views: Arc<Mutex<Views>>,
}

impl DashboardService {
    pub fn new(api: Arc<dyn ForecastApi>, settings: PanelSettings) -> Self {
        Self {
            api,
            settings,
            views: Arc::new(Mutex::new(Views::default())),
        }
    }

    /// Mount fresh panels for a new page view; their loads start in the
    /// background.
    ///
    /// When `max_open_views` are already open the oldest one is unmounted.
    pub async fn open_view(&self) -> DashboardSnapshot {
        let view = mount_view(&self.api, &self.settings);
        let forecast = view.forecast.state();
        let model_card = view.model_card.state().map(|m| m.to_card());
        let simulation = view.simulator.status();

        let mut views = self.views.lock().await;
        views.next_id += 1;
        let id = views.next_id;

        while views.open.len() >= self.settings.max_open_views.max(1) {
            let Some(oldest) = views.order.pop_front() else {
                break;
            };
            if let Some(evicted) = views.open.remove(&oldest) {
                tracing::debug!("view {} evicted", oldest);
                drop(evicted.unmount());
            }
        }
        views.open.insert(id, view);
        views.order.push_back(id);
        tracing::info!("view {} mounted ({} open)", id, views.open.len());

        DashboardSnapshot {
            view: id,
            forecast,
            model_card,
            simulation,
        }
    }

    /// Unmount a view. Loads still waiting out their delay never fetch;
    /// results still in flight are discarded when they arrive.
    pub async fn close_view(&self, id: ViewId) -> Result<Vec<JoinHandle<LoadOutcome>>, ViewError> {
        let mut views = self.views.lock().await;
        let view = views.open.remove(&id).ok_or(ViewError::NotOpen(id))?;
        views.order.retain(|open| *open != id);
        tracing::info!("view {} unmounted", id);
        Ok(view.unmount())
    }

    pub async fn forecast(&self, id: ViewId) -> Result<PanelState<ChartPayload>, ViewError> {
        self.with_view(id, |view| view.forecast.state()).await
    }

    pub async fn model_card(&self, id: ViewId) -> Result<PanelState<ModelCard>, ViewError> {
        self.with_view(id, |view| view.model_card.state().map(|m| m.to_card()))
            .await
    }

    /// The forecast once it has left `Loading`, or its current state if that
    /// takes longer than `wait`.
    pub async fn settled_forecast(
        &self,
        id: ViewId,
        wait: Duration,
    ) -> Result<PanelState<ChartPayload>, ViewError> {
        let rx = self.with_view(id, |view| view.forecast.subscribe()).await?;
        Ok(settle(rx, wait).await)
    }

    pub async fn settled_model_card(
        &self,
        id: ViewId,
        wait: Duration,
    ) -> Result<PanelState<ModelCard>, ViewError> {
        let rx = self.with_view(id, |view| view.model_card.subscribe()).await?;
        Ok(settle(rx, wait).await.map(|m| m.to_card()))
    }

    /// Run the view's price spike simulation. Other views are unaffected.
    pub async fn simulate(&self, id: ViewId) -> Result<String, ViewError> {
        let simulator = self.with_view(id, |view| view.simulator.clone()).await?;
        Ok(simulator.trigger().await?)
    }

    async fn with_view<R>(&self, id: ViewId, f: impl FnOnce(&View) -> R) -> Result<R, ViewError> {
        let views = self.views.lock().await;
        views.open.get(&id).map(f).ok_or(ViewError::NotOpen(id))
    }
}

async fn settle<T: Clone>(mut rx: watch::Receiver<PanelState<T>>, wait: Duration) -> PanelState<T> {
    let settled = match tokio::time::timeout(wait, rx.wait_for(|state| !state.is_loading())).await {
        Ok(Ok(state)) => Some((*state).clone()),
        // timed out, or the view was unmounted meanwhile
        _ => None,
    };
    settled.unwrap_or_else(|| rx.borrow().clone())
}

fn mount_view(api: &Arc<dyn ForecastApi>, settings: &PanelSettings) -> View {
    let forecast_api = api.clone();
    let forecast = Panel::mount("forecast", settings.forecast_delay(), move || async move {
        forecast_api.fetch_forecast_data().await
    });

    let metadata_api = api.clone();
    let model_card = Panel::mount("model card", settings.model_card_delay(), move || async move {
        let envelope = metadata_api.fetch_model_metadata().await?;
        match envelope.decode::<ModelMetadata>() {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::error!("model metadata could not be read: {}", e);
                None
            }
        }
    });

    View {
        forecast,
        model_card,
        simulator: SpikeSimulator::new(api.clone()),
    }
}
