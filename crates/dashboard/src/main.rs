mod fetcher_impls;
mod fetcher_traits;
mod metrics;
mod models;
mod period;
mod price;
mod refresh;
mod store;
mod view;

use anyhow::Result;
use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use fetcher_traits::Sources;
use models::{LeaderboardRow, StatusView, TabLink, TransactionsView};
use period::Period;
use price::PriceCache;
use refresh::RefreshController;
use store::{RefreshStatus, Store};
use view::{Tab, ViewState};

const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

pub struct AppState<S> {
    pub refresh: Arc<RefreshController<S>>,
    pub prices: PriceCache<S>,
    pub started_at: DateTime<Utc>,
    pub prometheus: Option<PrometheusHandle>,
}

// --- Errors ---

pub enum AppError {
    BadRequest(String),
    Internal(anyhow::Error),
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            Self::Internal(err) => {
                tracing::error!(error = %format!("{err:#}"), "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}

// --- Templates ---

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate;

#[derive(Template)]
#[template(path = "partials/status.html")]
struct StatusTemplate {
    status: StatusView,
}

#[derive(Template)]
#[template(path = "partials/table.html")]
struct TableTemplate {
    tabs: Vec<TabLink>,
    loading: bool,
    reload_url: String,
    leaderboard: Option<Vec<LeaderboardRow>>,
    transactions: Option<TransactionsView>,
}

// --- Handlers ---

async fn index() -> Result<Html<String>, AppError> {
    Ok(Html(DashboardTemplate.render()?))
}

async fn status_partial<S: Sources>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Html<String>, AppError> {
    let snapshot = state.refresh.store().snapshot().await;
    let status = StatusView::from_state(&snapshot);
    Ok(Html(StatusTemplate { status }.render()?))
}

#[derive(Deserialize)]
struct TableQuery {
    tab: Option<Tab>,
    page: Option<usize>,
}

async fn table_partial<S: Sources>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<TableQuery>,
) -> Result<Html<String>, AppError> {
    let view = ViewState::new(query.tab.unwrap_or_default(), query.page.unwrap_or(1));
    render_table(&state, view).await
}

async fn tab_partial<S: Sources>(
    State(state): State<Arc<AppState<S>>>,
    Path(tab): Path<Tab>,
) -> Result<Html<String>, AppError> {
    let mut view = ViewState::default();
    view.switch_tab(tab);
    render_table(&state, view).await
}

#[derive(Deserialize)]
struct PeriodForm {
    period: String,
    page: Option<usize>,
}

async fn period_submit<S: Sources>(
    State(state): State<Arc<AppState<S>>>,
    Form(form): Form<PeriodForm>,
) -> Result<Html<String>, AppError> {
    let period = Period::from_tag(&form.period)
        .ok_or_else(|| AppError::BadRequest(format!("unknown period: {}", form.period)))?;
    // Same period: nothing to reload, the handle is only returned on change.
    let _ = state.refresh.change_period(period).await;
    let mut view = ViewState::default();
    view.set_page(form.page.unwrap_or(1));
    render_table(&state, view).await
}

async fn render_table<S: Sources>(
    state: &AppState<S>,
    mut view: ViewState,
) -> Result<Html<String>, AppError> {
    let snapshot = state.refresh.store().snapshot().await;
    if view.tab() == Tab::Transactions {
        view.clamp_page(view::total_pages(snapshot.records().len()));
    }
    let loading = matches!(snapshot.status(), RefreshStatus::Loading { .. });
    let reload_url = format!(
        "/partials/table?tab={}&page={}",
        view.tab().as_str(),
        view.page()
    );

    let (leaderboard, transactions) = match view.tab() {
        Tab::Leaderboard => (Some(models::leaderboard_rows(snapshot.leaderboard())), None),
        Tab::Transactions => {
            let sorted = view::sort_by_refund(snapshot.records());
            let page = view::paginate(&sorted, view.page());
            let eth_usd = if page.rows.is_empty() {
                None
            } else {
                state.prices.eth_usd().await
            };
            let tv = TransactionsView::build(&page, snapshot.period(), eth_usd);
            (None, Some(tv))
        }
    };

    let template = TableTemplate {
        tabs: models::tab_links(view.tab()),
        loading,
        reload_url,
        leaderboard,
        transactions,
    };
    Ok(Html(template.render()?))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: i64,
    refresh: &'static str,
    period: &'static str,
}

async fn health<S: Sources>(State(state): State<Arc<AppState<S>>>) -> Json<HealthResponse> {
    let snapshot = state.refresh.store().snapshot().await;
    let uptime = Utc::now()
        .signed_duration_since(state.started_at)
        .num_seconds();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: uptime,
        refresh: snapshot.status().as_str(),
        period: snapshot.period().as_str(),
    })
}

async fn metrics_endpoint<S: Sources>(State(state): State<Arc<AppState<S>>>) -> Response {
    match &state.prometheus {
        Some(handle) => {
            handle.run_upkeep();
            handle.render().into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// --- Router ---

pub fn create_router<S: Sources>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/partials/status", get(status_partial::<S>))
        .route("/partials/table", get(table_partial::<S>))
        .route("/partials/table/tab/{tab}", get(tab_partial::<S>))
        .route("/period", post(period_submit::<S>))
        .route("/api/health", get(health::<S>))
        .route("/metrics", get(metrics_endpoint::<S>))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| common::config::DEFAULT_CONFIG_PATH.to_string());
    let config = common::config::Config::load_from(&config_path)?;

    let (dispatch, _otel_guard) =
        common::observability::build_dispatch("refund-dashboard", &config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch).map_err(anyhow::Error::msg)?;
    tracing::info!(path = %config_path, "refund dashboard starting");

    let prometheus = metrics::init_global()?;

    let period = Period::from_tag(&config.dashboard.default_period).unwrap_or_else(|| {
        tracing::warn!(
            period = %config.dashboard.default_period,
            "unknown default_period; using this_month"
        );
        Period::ThisMonth
    });

    let sources = Arc::new(common::sources::RefundSources::new(&config.sources)?);
    let refresh = Arc::new(RefreshController::new(
        Arc::clone(&sources),
        Store::new(period),
    ));
    // Initial load; later refreshes happen on period changes.
    let _initial_load = refresh.spawn_refresh(period).await;

    let state = Arc::new(AppState {
        refresh,
        prices: PriceCache::new(
            sources,
            Duration::from_secs(config.dashboard.price_ttl_secs),
        ),
        started_at: Utc::now(),
        prometheus: Some(prometheus),
    });

    let app = create_router(state);
    let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
    tracing::info!("dashboard listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
