use anyhow::{Context, Result};
use std::{any::Any, net::SocketAddr, sync::Arc, time::Duration};

use tracing::{error, info};

use axum::{
    extract::State,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir};

use super::metrics::metrics_handler;
use super::predict::{predict, predict_batch, predict_web, ApiError};
use super::{http_cache, log_requests, state::*, ServerConfig};
use crate::pipeline::ScorePipeline;

/// Anime types offered by the web form.
pub const ALL_TYPES: [&str; 6] = ["TV", "Movie", "OVA", "ONA", "Special", "Music"];

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub predictor: &'static str,
    pub schema_width: usize,
    pub drop_first: bool,
    pub source_fallback: String,
}

#[derive(Serialize)]
struct FormOptions {
    all_sources: Vec<String>,
    all_types: Vec<&'static str>,
    all_genres: Vec<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let options = state.pipeline.options();
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        predictor: state.pipeline.predictor_kind(),
        schema_width: state.pipeline.schema().len(),
        drop_first: options.one_hot.drop_first,
        source_fallback: format!("{:?}", options.source_fallback),
    };
    Json(stats)
}

async fn get_options(State(pipeline): State<GuardedPipeline>) -> impl IntoResponse {
    // Both sets are sorted already.
    Json(FormOptions {
        all_sources: pipeline.reputation().sources().map(String::from).collect(),
        all_types: ALL_TYPES.to_vec(),
        all_genres: pipeline.core_genres().iter().cloned().collect(),
    })
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!("Request handler panicked: {}", detail);
    ApiError::Processing.into_response()
}

pub fn make_app(config: ServerConfig, pipeline: GuardedPipeline) -> Router {
    let state = ServerState::new(config.clone(), pipeline);

    let predict_routes: Router = Router::new()
        .route("/predict", post(predict))
        .route("/predict-api", post(predict))
        .route("/predict-web", post(predict_web))
        .with_state(state.clone());

    let options_routes: Router = Router::new()
        .route("/options", get(get_options))
        .layer(middleware::from_fn_with_state(
            config.options_cache_age_sec,
            http_cache,
        ))
        .with_state(state.clone());

    let v1_routes: Router = Router::new()
        .route("/predict/batch", post(predict_batch))
        .route("/stats", get(home))
        .with_state(state.clone())
        .merge(options_routes);

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let mut app: Router = home_router.merge(predict_routes).nest("/v1", v1_routes);

    app = app.layer(CatchPanicLayer::custom(panic_response));
    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    app
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(err) => error!("Failed to listen for Ctrl+C: {}", err),
    }
}

pub async fn run_server(config: ServerConfig, pipeline: ScorePipeline) -> Result<()> {
    let address = SocketAddr::new(config.bind_address, config.port);
    let metrics_address = SocketAddr::new(config.bind_address, config.metrics_port);
    let app = make_app(config, Arc::new(pipeline));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    let metrics_listener = tokio::net::TcpListener::bind(metrics_address)
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_address))?;

    let metrics_app = Router::new().route("/metrics", get(metrics_handler));
    let metrics_server = tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, metrics_app).await {
            error!("Metrics server stopped: {}", err);
        }
    });

    info!("Ready to serve at {}!", address);
    info!("Metrics available at {}/metrics!", metrics_address);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    metrics_server.abort();

    Ok(result?)
}
