use crate::application::forecast_api::QueryType;
use serde::Deserialize;
use std::time::Duration;

const CONFIG_FILE: &str = "config/dashboard";
const ENV_PREFIX: &str = "DASHBOARD";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub panels: PanelSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ApiSettings {
    /// Serves `forecast` and `spike` queries
    pub forecast_url: Option<String>,
    /// Serves `metadata` queries
    pub metadata_url: Option<String>,
    /// Unset means the transport default applies
    pub request_timeout_secs: Option<u64>,
}

impl ApiSettings {
    pub fn endpoints(&self) -> ApiEndpoints {
        ApiEndpoints::new(self.forecast_url.clone(), self.metadata_url.clone())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PanelSettings {
    pub forecast_delay_ms: u64,
    pub model_card_delay_ms: u64,
    /// Page views kept mounted at once; the oldest is unmounted beyond this
    pub max_open_views: usize,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            forecast_delay_ms: 5000,
            model_card_delay_ms: 0,
            max_open_views: 256,
        }
    }
}

impl PanelSettings {
    pub fn forecast_delay(&self) -> Duration {
        Duration::from_millis(self.forecast_delay_ms)
    }

    pub fn model_card_delay(&self) -> Duration {
        Duration::from_millis(self.model_card_delay_ms)
    }
}

/// Endpoint URLs handed to the API client at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiEndpoints {
    forecast_url: Option<String>,
    metadata_url: Option<String>,
}

impl ApiEndpoints {
    pub fn new(forecast_url: Option<String>, metadata_url: Option<String>) -> Self {
        Self {
            forecast_url: non_blank(forecast_url),
            metadata_url: non_blank(metadata_url),
        }
    }

    pub fn url_for(&self, query: QueryType) -> Option<&str> {
        match query {
            QueryType::Metadata => self.metadata_url.as_deref(),
            QueryType::Forecast | QueryType::Spike => self.forecast_url.as_deref(),
        }
    }

    /// Queries that will fail for lack of an endpoint
    pub fn missing(&self) -> Vec<QueryType> {
        [QueryType::Forecast, QueryType::Metadata, QueryType::Spike]
            .into_iter()
            .filter(|query| self.url_for(*query).is_none())
            .collect()
    }
}

fn non_blank(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

pub fn load_config() -> anyhow::Result<DashboardConfig> {
    load_config_from(CONFIG_FILE, std::env::vars().collect())
}

/// Layer the optional config file, `DASHBOARD_*` variables, and the
/// `API_URL` / `METADATA_API_URL` variables, in increasing precedence.
pub fn load_config_from(
    file: &str,
    env: config::Map<String, String>,
) -> anyhow::Result<DashboardConfig> {
    let forecast_url = env.get("API_URL").cloned();
    let metadata_url = env.get("METADATA_API_URL").cloned();

    let settings = config::Config::builder()
        .add_source(config::File::with_name(file).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(Some(env)),
        )
        .set_override_option("api.forecast_url", forecast_url)?
        .set_override_option("api.metadata_url", metadata_url)?
        .build()?;

    Ok(settings.try_deserialize()?)
}
