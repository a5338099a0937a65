// Server-rendered HTML for the dashboard page
use crate::application::dashboard_service::{DashboardSnapshot, ViewId};
use crate::application::panel::PanelState;
use crate::application::simulation::{SimulationPhase, SimulationStatus};
use crate::domain::forecast::ChartPayload;
use crate::domain::model::ModelCard;
use chrono::{DateTime, Local};

const PLOTLY_SRC: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
const ABOUT: &str = include_str!("about.html");
pub const FORECAST_FALLBACK: &str = "Please refresh for updated forecasts";
pub const MODEL_CARD_FALLBACK: &str = "Model metadata is unavailable, please refresh";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn loader(label: &str) -> String {
    format!(
        r#"<div class="loader"><span class="spinner"></span><p>{}</p></div>"#,
        escape_html(label)
    )
}

/// Fallback with a Refresh button that drops this view and opens a new one.
fn fallback(view: ViewId, message: &str) -> String {
    format!(
        r#"<div class="fallback"><p>{}</p><form method="post" action="/views/{}/refresh"><button type="submit">Refresh</button></form></div>"#,
        escape_html(message),
        view
    )
}

pub fn forecast_panel(view: ViewId, state: &PanelState<ChartPayload>) -> String {
    match state {
        PanelState::Loading => loader("Loading Forecasts"),
        // drawn by the page script once swapped in
        PanelState::Loaded(chart) => {
            let figure = serde_json::json!({"data": chart.data, "layout": chart.layout});
            format!(
                r#"<div id="forecast-chart" class="chart" data-chart="{}"></div>"#,
                escape_html(&figure.to_string())
            )
        }
        PanelState::Empty => fallback(view, FORECAST_FALLBACK),
    }
}

pub fn model_card_panel(view: ViewId, state: &PanelState<ModelCard>) -> String {
    let card = match state {
        PanelState::Loading => return loader("Loading model metadata"),
        PanelState::Empty => return fallback(view, MODEL_CARD_FALLBACK),
        PanelState::Loaded(card) => card,
    };

    let rows: String = card
        .metrics
        .iter()
        .map(|metric| {
            format!(
                r#"<div class="metric"><div class="metric-row"><span class="metric-key">{}</span><span class="metric-value">{}</span></div><div class="metric-description">{}</div></div>"#,
                escape_html(metric.key),
                escape_html(&metric.value),
                escape_html(metric.description)
            )
        })
        .collect();

    format!(
        r#"<section class="card">
<header><h3>Model Card</h3><span class="badge">v{}</span></header>
<div class="family"><div class="label">Model Family</div><div class="value">{}</div></div>
<hr>
<div class="metrics">{}</div>
</section>"#,
        card.version,
        escape_html(card.model_family),
        rows
    )
}

/// The view's simulate button. Results are shown in this page only.
pub fn simulate_control(view: ViewId, status: &SimulationStatus) -> String {
    let disabled = if status.phase == SimulationPhase::Simulating {
        " disabled"
    } else {
        ""
    };
    let message = status
        .message
        .as_deref()
        .filter(|m| !m.is_empty())
        .map(|m| format!(r#"<div id="simulate-message" class="notice">{}</div>"#, escape_html(m)))
        .unwrap_or_else(|| r#"<div id="simulate-message" class="notice" hidden></div>"#.to_string());

    format!(
        r#"<div class="simulate">
<button id="simulate-button" type="button"{disabled}>{label}</button>
{message}
</div>
<script>
document.getElementById("simulate-button").addEventListener("click", async (event) => {{
  const button = event.currentTarget;
  const notice = document.getElementById("simulate-message");
  button.disabled = true;
  button.textContent = "Simulating...";
  try {{
    const response = await fetch("/api/views/{view}/simulate", {{ method: "POST" }});
    const result = await response.json();
    notice.textContent = result.message;
  }} catch (error) {{
    notice.textContent = "Failed to simulate price spike";
  }} finally {{
    notice.hidden = false;
    button.disabled = false;
    button.textContent = "Simulate Price Spike";
  }}
}});
</script>"#,
        disabled = disabled,
        label = status.phase.button_label(),
        message = message,
        view = view,
    )
}

/// Fetches each panel until it leaves `loading`, swaps the markup in and
/// draws the chart. Leaving the page unmounts the view.
fn panel_script(view: ViewId) -> String {
    format!(
        r#"<script>
const pause = (ms) => new Promise((resolve) => setTimeout(resolve, ms));
async function settle(panel) {{
  const slot = document.getElementById(panel + "-panel");
  for (;;) {{
    try {{
      const response = await fetch("/views/{view}/" + panel);
      const reply = await response.json();
      slot.innerHTML = reply.html;
      if (reply.state !== "loading") break;
    }} catch (error) {{
      await pause(2000);
    }}
  }}
  for (const chart of slot.querySelectorAll("[data-chart]")) {{
    const figure = JSON.parse(chart.dataset.chart);
    Plotly.newPlot(chart, figure.data, figure.layout, {{ responsive: true }});
  }}
}}
settle("forecast");
settle("model-card");
window.addEventListener("pagehide", () => navigator.sendBeacon("/views/{view}/close"));
window.addEventListener("pageshow", (event) => {{
  if (event.persisted) location.reload();
}});
</script>"#,
        view = view
    )
}

pub fn dashboard_page(snapshot: &DashboardSnapshot, today: DateTime<Local>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>AEMO Electricity Price Forecasting</title>
<script src="{plotly}"></script>
<style>{style}</style>
</head>
<body>
<main data-view="{view}">
<div class="masthead">
<h2>Time Series Forecasting</h2>
<h1>Forecasting Electricity Prices with XGBoost</h1>
<h2 class="subtitle">Project, March-Apr 2025</h2>
</div>
<div class="toolbar">
<h1>Electricity Price Forecasts for {today}</h1>
{simulate}
</div>
<div id="forecast-panel">{forecast}</div>
<label class="source">Data source: Australian Energy Market Operator (AEMO)</label>
<hr>
<div id="model-card-panel">{model_card}</div>
{about}
</main>
{script}
</body>
</html>"#,
        plotly = PLOTLY_SRC,
        style = STYLE,
        view = snapshot.view,
        today = today.format("%d/%m/%Y"),
        simulate = simulate_control(snapshot.view, &snapshot.simulation),
        forecast = forecast_panel(snapshot.view, &snapshot.forecast),
        model_card = model_card_panel(snapshot.view, &snapshot.model_card),
        about = ABOUT,
        script = panel_script(snapshot.view),
    )
}

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:0;color:#171717}\
main{max-width:48rem;margin:0 auto;padding:3rem 1rem;text-align:justify}\
.masthead h2{color:#a3a3a3;font-size:1rem;margin:0}\
.masthead h1{font-size:1.5rem;color:#0891b2}\
.masthead .subtitle{font-size:.875rem}\
.toolbar{display:flex;align-items:center;justify-content:space-between}\
.toolbar h1{font-size:1rem}\
button{background:#16a34a;color:#fff;border:0;border-radius:9999px;padding:.5rem 1rem;font-size:.75rem}\
button[disabled]{opacity:.6}\
.notice{margin-top:1rem;padding:0 .5rem;background:#fde68a;border-radius:.5rem;font-size:.875rem}\
.loader,.fallback{display:flex;align-items:center;justify-content:center;min-height:21rem;gap:.5rem;color:#4b5563}\
.fallback{flex-direction:column}\
.chart{min-height:21rem}\
.spinner{width:1.25rem;height:1.25rem;border:2px solid #d4d4d4;border-top-color:#16a34a;border-radius:50%;animation:spin 1s linear infinite}\
@keyframes spin{to{transform:rotate(360deg)}}\
.source{font-size:.75rem;color:#6b7280}\
.card{border:1px solid #e5e5e5;border-radius:.75rem;padding:1.5rem;margin-top:.5rem}\
.card header{display:flex;justify-content:space-between;align-items:flex-start}\
.badge{border:1px solid #e5e5e5;border-radius:9999px;padding:.25rem .75rem;font-size:.75rem}\
.label,.metric-key,.metric-description{color:#737373;font-size:.875rem}\
.metric-description{font-size:.75rem}\
.family .value{font-size:1.125rem;font-weight:600}\
.metrics{display:grid;grid-template-columns:repeat(auto-fit,minmax(16rem,1fr));gap:1rem}\
.metric-row{display:flex;justify-content:space-between}\
.metric-value{font-family:monospace}\
.about{margin-top:1.25rem}\
.about h1{font-size:1rem;font-weight:500}\
.about a{color:#3b82f6}";
