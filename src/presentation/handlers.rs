// HTTP request handlers
use crate::application::dashboard_service::{ViewError, ViewId};
use crate::application::panel::PanelState;
use crate::application::simulation::SimulationError;
use crate::domain::forecast::ChartPayload;
use crate::domain::model::ModelCard;
use crate::presentation::app_state::AppState;
use crate::presentation::views::{dashboard_page, forecast_panel, model_card_panel};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

// How long a panel request waits for its load to settle before answering
// with the current state; the page asks again while it is still loading.
const SETTLE_WAIT: Duration = Duration::from_secs(20);

#[derive(Debug, Serialize)]
pub struct SimulationReply {
    pub message: String,
}

/// A panel's markup plus the lifecycle stage it was rendered from.
#[derive(Debug, Serialize)]
pub struct PanelFragment {
    pub state: &'static str,
    pub html: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/views/:view/forecast", get(forecast_fragment))
        .route("/views/:view/model-card", get(model_card_fragment))
        .route("/views/:view/refresh", post(refresh))
        .route("/views/:view/close", post(close))
        .route("/api/views/:view/forecast", get(forecast))
        .route("/api/views/:view/model-card", get(model_card))
        .route("/api/views/:view/simulate", post(simulate))
        .route("/healthz", get(health_check))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Mount a fresh view and render its page; the panels load in the background
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Html<String> {
    let snapshot = state.dashboard.open_view().await;
    Html(dashboard_page(&snapshot, chrono::Local::now()))
}

fn fragment<T>(
    view: ViewId,
    result: Result<PanelState<T>, ViewError>,
    render: fn(ViewId, &PanelState<T>) -> String,
) -> (StatusCode, Json<PanelFragment>) {
    // an unknown view renders as empty, so the page offers a refresh
    let (status, panel) = match result {
        Ok(panel) => (StatusCode::OK, panel),
        Err(e) => {
            tracing::debug!("panel request for a closed view: {}", e);
            (StatusCode::NOT_FOUND, PanelState::Empty)
        }
    };
    let reply = PanelFragment {
        state: panel.stage(),
        html: render(view, &panel),
    };
    (status, Json(reply))
}

pub async fn forecast_fragment(
    State(state): State<Arc<AppState>>,
    Path(view): Path<ViewId>,
) -> impl IntoResponse {
    let result = state.dashboard.settled_forecast(view, SETTLE_WAIT).await;
    fragment(view, result, forecast_panel)
}

pub async fn model_card_fragment(
    State(state): State<Arc<AppState>>,
    Path(view): Path<ViewId>,
) -> impl IntoResponse {
    let result = state.dashboard.settled_model_card(view, SETTLE_WAIT).await;
    fragment(view, result, model_card_panel)
}

/// Unmount the view and send the browser to a freshly mounted one
pub async fn refresh(State(state): State<Arc<AppState>>, Path(view): Path<ViewId>) -> Redirect {
    // the view may already be gone; the redirect mounts a new one either way
    if let Err(e) = state.dashboard.close_view(view).await {
        tracing::debug!("refresh: {}", e);
    }
    Redirect::to("/")
}

pub async fn close(State(state): State<Arc<AppState>>, Path(view): Path<ViewId>) -> StatusCode {
    match state.dashboard.close_view(view).await {
        Ok(_) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::NOT_FOUND,
    }
}

fn panel_json<T: Serialize>(result: Result<PanelState<T>, ViewError>) -> Response {
    match result {
        Ok(panel) => Json(panel).into_response(),
        Err(e) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
    }
}

pub async fn forecast(State(state): State<Arc<AppState>>, Path(view): Path<ViewId>) -> Response {
    panel_json::<ChartPayload>(state.dashboard.forecast(view).await)
}

pub async fn model_card(State(state): State<Arc<AppState>>, Path(view): Path<ViewId>) -> Response {
    panel_json::<ModelCard>(state.dashboard.model_card(view).await)
}

pub async fn simulate(
    State(state): State<Arc<AppState>>,
    Path(view): Path<ViewId>,
) -> impl IntoResponse {
    let (status, message) = match state.dashboard.simulate(view).await {
        Ok(message) => (StatusCode::OK, message),
        Err(e @ ViewError::Simulation(SimulationError::AlreadyRunning)) => {
            tracing::warn!("rejected simulation request for view {}: {}", view, e);
            (StatusCode::CONFLICT, e.to_string())
        }
        Err(e @ ViewError::NotOpen(_)) => (StatusCode::NOT_FOUND, e.to_string()),
    };
    (status, Json(SimulationReply { message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_service::DashboardService;
    use crate::application::forecast_api::ForecastApi;
    use crate::infrastructure::config::PanelSettings;
    use crate::infrastructure::envelope::ResponseEnvelope;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `outages` forecast calls, then answers. Spikes are
    /// only simulated when it never fails.
    struct FlakyApi {
        outages: usize,
        calls: AtomicUsize,
    }

    impl FlakyApi {
        fn online() -> Arc<Self> {
            Self::down_for(0)
        }

        fn down_for(outages: usize) -> Arc<Self> {
            Arc::new(Self {
                outages,
                calls: AtomicUsize::new(0),
            })
        }

        fn offline() -> Arc<Self> {
            Self::down_for(usize::MAX)
        }
    }

    #[async_trait]
    impl ForecastApi for FlakyApi {
        async fn fetch_forecast_data(&self) -> Option<ChartPayload> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            (call >= self.outages).then(|| ChartPayload {
                data: vec![json!({"x": ["2025-04-01T10:00:00"], "y": [91.2]})],
                layout: json!({"title": {"text": "Forecast"}}),
            })
        }

        async fn fetch_model_metadata(&self) -> Option<ResponseEnvelope> {
            None
        }

        async fn fetch_price_spike_simulation(&self) -> Option<String> {
            (self.outages == 0).then(|| "Spike expected at 6pm".to_string())
        }
    }

    async fn serve(api: Arc<FlakyApi>, forecast_delay_ms: u64) -> String {
        let settings = PanelSettings {
            forecast_delay_ms,
            model_card_delay_ms: 0,
            max_open_views: 16,
        };
        let dashboard = DashboardService::new(api, settings);
        let app = router(Arc::new(AppState { dashboard }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Open the page and return its html and view id.
    async fn open_page(base: &str) -> (String, ViewId) {
        let html = reqwest::get(format!("{base}/")).await.unwrap().text().await.unwrap();
        let start = html.find(r#"data-view=""#).unwrap() + r#"data-view=""#.len();
        let end = start + html[start..].find('"').unwrap();
        let view = html[start..end].parse().unwrap();
        (html, view)
    }

    async fn panel(base: &str, view: ViewId, name: &str) -> Value {
        reqwest::get(format!("{base}/views/{view}/{name}"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let base = serve(FlakyApi::online(), 0).await;
        let body = reqwest::get(format!("{base}/healthz")).await.unwrap().text().await.unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_page_goes_from_loading_to_loaded() {
        let base = serve(FlakyApi::online(), 200).await;
        let (html, view) = open_page(&base).await;
        assert!(html.contains("Loading Forecasts"));
        assert!(html.contains(&format!(r#"fetch("/views/{view}/" + panel)"#)));

        let forecast = panel(&base, view, "forecast").await;
        assert_eq!(forecast["state"], "loaded");
        let markup = forecast["html"].as_str().unwrap();
        assert!(markup.contains("data-chart="));
        assert!(markup.contains("Forecast"));
        assert!(!markup.contains("Loading Forecasts"));

        let card = panel(&base, view, "model-card").await;
        assert_eq!(card["state"], "empty");
        assert!(card["html"]
            .as_str()
            .unwrap()
            .contains("Model metadata is unavailable, please refresh"));
    }

    #[tokio::test]
    async fn test_browser_refresh_fetches_again() {
        let api = FlakyApi::down_for(1);
        let base = serve(api.clone(), 0).await;

        let (_, first) = open_page(&base).await;
        let forecast = panel(&base, first, "forecast").await;
        assert_eq!(forecast["state"], "empty");
        assert!(forecast["html"]
            .as_str()
            .unwrap()
            .contains("Please refresh for updated forecasts"));

        let (_, second) = open_page(&base).await;
        assert_ne!(first, second);
        let forecast = panel(&base, second, "forecast").await;
        assert_eq!(forecast["state"], "loaded");
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_view_json_snapshots() {
        let base = serve(FlakyApi::online(), 0).await;
        let (_, view) = open_page(&base).await;
        panel(&base, view, "forecast").await;

        let body: Value = reqwest::get(format!("{base}/api/views/{view}/forecast"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["state"], "loaded");
        assert_eq!(body["data"]["layout"]["title"]["text"], "Forecast");

        let body: Value = reqwest::get(format!("{base}/api/views/{view}/model-card"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, json!({"state": "empty"}));

        let missing = reqwest::get(format!("{base}/api/views/{}/forecast", view + 100))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_simulate_is_scoped_to_the_view() {
        let client = reqwest::Client::new();

        let base = serve(FlakyApi::online(), 0).await;
        let (_, first) = open_page(&base).await;
        let (second_page, second) = open_page(&base).await;
        let reply: Value = client
            .post(format!("{base}/api/views/{first}/simulate"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(reply["message"], "Spike expected at 6pm");
        assert!(!second_page.contains("Spike expected at 6pm"));

        let (third_page, _) = open_page(&base).await;
        assert!(!third_page.contains("Spike expected at 6pm"));

        let response = client
            .post(format!("{base}/api/views/{second}/simulate"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let base = serve(FlakyApi::offline(), 0).await;
        let (_, view) = open_page(&base).await;
        let reply: Value = client
            .post(format!("{base}/api/views/{view}/simulate"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(reply["message"], "Failed to simulate price spike");
    }

    #[tokio::test]
    async fn test_refresh_unmounts_and_redirects() {
        let base = serve(FlakyApi::online(), 0).await;
        let (_, view) = open_page(&base).await;
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        let response = client
            .post(format!("{base}/views/{view}/refresh"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/");

        let closed = client
            .post(format!("{base}/views/{view}/close"))
            .send()
            .await
            .unwrap();
        assert_eq!(closed.status(), StatusCode::NOT_FOUND);

        let forecast = reqwest::get(format!("{base}/views/{view}/forecast")).await.unwrap();
        assert_eq!(forecast.status(), StatusCode::NOT_FOUND);
        let forecast: Value = forecast.json().await.unwrap();
        assert_eq!(forecast["state"], "empty");
    }

    #[tokio::test]
    async fn test_close_unmounts_view() {
        let base = serve(FlakyApi::online(), 0).await;
        let (_, view) = open_page(&base).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/views/{view}/close"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let reply = client
            .post(format!("{base}/api/views/{view}/simulate"))
            .send()
            .await
            .unwrap();
        assert_eq!(reply.status(), StatusCode::NOT_FOUND);
    }
}
