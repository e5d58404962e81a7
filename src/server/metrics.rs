use crate::pipeline::FeatureTrace;
use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all metrics of this server
const PREFIX: &str = "anime_score";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Prediction Metrics
    pub static ref PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_predictions_total"), "Predictions by endpoint and outcome"),
        &["endpoint", "outcome"]
    ).expect("Failed to create predictions_total metric");

    pub static ref PREDICTION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_prediction_duration_seconds"),
            "Time spent building the feature row and scoring it"
        )
        .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1])
    ).expect("Failed to create prediction_duration_seconds metric");

    pub static ref CATEGORY_FALLBACKS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_category_fallbacks_total"),
            "Inputs outside the training vocabulary, by kind"
        ),
        &["kind"]
    ).expect("Failed to create category_fallbacks_total metric");

    // Model Metrics
    pub static ref MODEL_SCHEMA_WIDTH: Gauge = Gauge::new(
        format!("{PREFIX}_model_schema_width"),
        "Number of feature columns of the loaded model"
    ).expect("Failed to create model_schema_width metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(PREDICTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PREDICTION_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(CATEGORY_FALLBACKS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(MODEL_SCHEMA_WIDTH.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn init_model_metrics(schema_width: usize) {
    MODEL_SCHEMA_WIDTH.set(schema_width as f64);
    tracing::info!("Model metrics initialized: {} feature columns", schema_width);
}

/// Record an HTTP request under its route template
pub fn record_http_request(method: &str, route: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, route, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, route])
        .observe(duration.as_secs_f64());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionOutcome {
    Ok,
    ClientError,
    Failure,
}

impl PredictionOutcome {
    fn label(&self) -> &'static str {
        match self {
            PredictionOutcome::Ok => "ok",
            PredictionOutcome::ClientError => "client_error",
            PredictionOutcome::Failure => "failure",
        }
    }
}

/// Record a single prediction, batch items count one each
pub fn record_prediction(endpoint: &str, outcome: PredictionOutcome, duration: Duration) {
    PREDICTIONS_TOTAL
        .with_label_values(&[endpoint, outcome.label()])
        .inc();

    if outcome != PredictionOutcome::ClientError {
        PREDICTION_DURATION_SECONDS.observe(duration.as_secs_f64());
    }
}

/// Count the fallbacks taken while building a feature row
pub fn record_fallbacks(trace: &FeatureTrace) {
    let fallbacks = [
        ("studio_unseen", !trace.studio_known),
        ("source_unseen", !trace.source_known),
        ("studio_collapsed", trace.studio_collapsed),
        ("genre_other", trace.genre_other),
    ];
    for (kind, taken) in fallbacks {
        if taken {
            CATEGORY_FALLBACKS_TOTAL.with_label_values(&[kind]).inc();
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_metric(name: &str) -> bool {
        REGISTRY.gather().iter().any(|m| m.get_name() == name)
    }

    #[test]
    fn test_metrics_initialization() {
        init_metrics();
        init_model_metrics(24);

        assert!(has_metric("anime_score_model_schema_width"));
        assert_eq!(MODEL_SCHEMA_WIDTH.get(), 24.0);
    }

    #[test]
    fn test_record_http_request() {
        init_metrics();

        record_http_request("POST", "/predict", 200, Duration::from_millis(5));

        assert!(has_metric("anime_score_http_requests_total"));
        assert!(
            HTTP_REQUESTS_TOTAL
                .with_label_values(&["POST", "/predict", "200"])
                .get()
                >= 1.0
        );
    }

    #[test]
    fn test_record_prediction() {
        init_metrics();

        record_prediction("predict", PredictionOutcome::Ok, Duration::from_micros(300));
        record_prediction("predict", PredictionOutcome::ClientError, Duration::ZERO);

        assert!(has_metric("anime_score_predictions_total"));
        assert!(
            PREDICTIONS_TOTAL
                .with_label_values(&["predict", "client_error"])
                .get()
                >= 1.0
        );
    }

    #[test]
    fn test_record_fallbacks_counts_only_taken_ones() {
        init_metrics();

        let before_collapsed = CATEGORY_FALLBACKS_TOTAL
            .with_label_values(&["studio_collapsed"])
            .get();
        let before_genre = CATEGORY_FALLBACKS_TOTAL
            .with_label_values(&["genre_other"])
            .get();

        record_fallbacks(&FeatureTrace {
            studio_known: true,
            source_known: true,
            studio_collapsed: true,
            genre_other: false,
            genres: vec![],
            dropped_columns: 0,
        });

        assert!(
            CATEGORY_FALLBACKS_TOTAL
                .with_label_values(&["studio_collapsed"])
                .get()
                >= before_collapsed + 1.0
        );
        // Other tests may record concurrently, so only check it did not go down.
        assert!(
            CATEGORY_FALLBACKS_TOTAL
                .with_label_values(&["genre_other"])
                .get()
                >= before_genre
        );
    }
}
