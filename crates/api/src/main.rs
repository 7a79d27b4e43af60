use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use setlens_core::domain::analysis::Analysis;
use setlens_core::domain::stock::{HistoryPoint, StockSnapshot};
use setlens_core::gateway::AnalysisGateway;
use setlens_core::market::mock::MockStockDataSource;
use setlens_core::market::StockDataSource;
use setlens_core::session::SelectionSession;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = setlens_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let gateway = AnalysisGateway::from_settings(&settings)?;
    let source = MockStockDataSource::from_settings(&settings);
    tracing::info!(
        source = source.source_name(),
        credential = gateway.has_credential(),
        "analysis backend configured"
    );

    let state = AppState::new(Arc::new(source), gateway);
    let app = router(state);

    let port = settings.port.unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/stocks", get(list_stocks))
        .route("/stocks/:symbol", get(get_stock))
        .route("/stocks/:symbol/history", get(get_history))
        .route("/stocks/:symbol/analysis", post(analyze_stock))
        .route("/selection", get(get_selection))
        .route("/selection/analysis", post(analyze_selection))
        .route("/selection/:symbol", put(select_stock))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    source: Arc<dyn StockDataSource>,
    gateway: AnalysisGateway,
    session: Arc<Mutex<SelectionSession>>,
}

impl AppState {
    fn new(source: Arc<dyn StockDataSource>, gateway: AnalysisGateway) -> Self {
        Self {
            source,
            gateway,
            session: Arc::new(Mutex::new(SelectionSession::new())),
        }
    }

    async fn require_stock(&self, symbol: &str) -> Result<StockSnapshot, StatusCode> {
        self.source
            .find_stock(symbol)
            .await
            .map_err(internal_error)?
            .ok_or(StatusCode::NOT_FOUND)
    }
}

fn internal_error(e: anyhow::Error) -> StatusCode {
    sentry_anyhow::capture_anyhow(&e);
    tracing::error!(error = %format!("{e:#}"), "request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

#[derive(Debug, Default, Deserialize)]
struct StockQuery {
    q: Option<String>,
}

async fn list_stocks(
    State(state): State<AppState>,
    Query(query): Query<StockQuery>,
) -> Result<Json<Vec<StockSnapshot>>, StatusCode> {
    let stocks = state
        .source
        .search_stocks(query.q.as_deref().unwrap_or_default())
        .await
        .map_err(internal_error)?;
    Ok(Json(stocks))
}

async fn get_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<StockSnapshot>, StatusCode> {
    Ok(Json(state.require_stock(&symbol).await?))
}

async fn get_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Vec<HistoryPoint>>, StatusCode> {
    let stock = state.require_stock(&symbol).await?;
    let history = state
        .source
        .get_history(&stock.symbol)
        .await
        .map_err(internal_error)?;
    Ok(Json(history))
}

async fn analyze_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Analysis>, StatusCode> {
    let stock = state.require_stock(&symbol).await?;
    Ok(Json(state.gateway.analyze(&stock).await))
}

async fn get_selection(State(state): State<AppState>) -> Json<SelectionSession> {
    Json(state.session.lock().await.clone())
}

async fn select_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<SelectionSession>, StatusCode> {
    let stock = state.require_stock(&symbol).await?;

    let ticket = {
        let mut session = state.session.lock().await;
        session.select(stock.symbol.clone());
        session.begin_history()
    }
    .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    // The lock is not held while loading; a newer selection simply wins.
    let history = match state.source.get_history(&stock.symbol).await {
        Ok(history) => history,
        Err(e) => {
            state.session.lock().await.fail_history(&ticket);
            return Err(internal_error(e));
        }
    };

    let mut session = state.session.lock().await;
    if !session.finish_history(&ticket, history) {
        tracing::info!(symbol = %stock.symbol, "selection changed while history was loading");
    }
    Ok(Json(session.clone()))
}

async fn analyze_selection(State(state): State<AppState>) -> Result<Json<Analysis>, StatusCode> {
    let ticket = state
        .session
        .lock()
        .await
        .begin_analysis()
        .ok_or(StatusCode::BAD_REQUEST)?;

    let stock = match state.require_stock(ticket.symbol()).await {
        Ok(stock) => stock,
        Err(status) => {
            state.session.lock().await.fail_analysis(&ticket);
            return Err(status);
        }
    };
    let analysis = state.gateway.analyze(&stock).await;

    let mut session = state.session.lock().await;
    if session.finish_analysis(&ticket, analysis.clone()) {
        Ok(Json(analysis))
    } else {
        tracing::info!(
            symbol = ticket.symbol(),
            current = session.symbol().unwrap_or_default(),
            "discarding analysis for a stale selection"
        );
        Err(StatusCode::CONFLICT)
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &setlens_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
