//! Prediction endpoints.
//!
//! Client input problems answer 400 with the reason, anything that goes wrong
//! while scoring answers 500 with a generic message and is logged.

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::{Form, FormRejection};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use super::metrics::{record_fallbacks, record_prediction, PredictionOutcome};
use super::state::GuardedPipeline;
use crate::pipeline::{AnimeAttributes, PredictionPayload, RequestError, ScorePipeline};

pub const PROCESSING_ERROR_MESSAGE: &str = "An error occurred while processing the request";

/// Largest number of items accepted by the batch endpoint.
pub const MAX_BATCH_SIZE: usize = 1000;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct PredictionResponse {
    predicted_score: f64,
}

#[derive(Serialize)]
struct WebPredictionResponse {
    predicted_score: f64,
    user_input: AnimeAttributes,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(untagged)]
enum BatchItem {
    Score { predicted_score: f64 },
    Error { error: String },
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Processing,
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason),
            ApiError::Processing => (
                StatusCode::INTERNAL_SERVER_ERROR,
                PROCESSING_ERROR_MESSAGE.to_string(),
            ),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

fn score(pipeline: &ScorePipeline, attributes: &AnimeAttributes) -> Result<f64, ApiError> {
    match pipeline.predict(attributes) {
        Ok(prediction) => {
            debug!("Scored {:?}: {} {:?}", attributes, prediction.score, prediction.trace);
            record_fallbacks(&prediction.trace);
            Ok(prediction.rounded_score())
        }
        Err(err) => {
            error!("Prediction failed for {:?}: {}", attributes, err);
            Err(ApiError::Processing)
        }
    }
}

fn outcome_of<T>(result: &Result<T, ApiError>) -> PredictionOutcome {
    match result {
        Ok(_) => PredictionOutcome::Ok,
        Err(ApiError::BadRequest(_)) => PredictionOutcome::ClientError,
        Err(ApiError::Processing) => PredictionOutcome::Failure,
    }
}

pub async fn predict(State(pipeline): State<GuardedPipeline>, body: Bytes) -> Response {
    let start = Instant::now();
    let result = AnimeAttributes::from_json_slice(&body)
        .map_err(ApiError::from)
        .and_then(|attributes| {
            info!("Prediction request: {:?}", attributes);
            score(&pipeline, &attributes)
        });
    record_prediction("predict", outcome_of(&result), start.elapsed());

    match result {
        Ok(predicted_score) => Json(PredictionResponse { predicted_score }).into_response(),
        Err(err) => err.into_response(),
    }
}

fn score_batch_item(pipeline: &ScorePipeline, item: Value) -> BatchItem {
    let start = Instant::now();
    let result = AnimeAttributes::from_json_value(item)
        .map_err(ApiError::from)
        .and_then(|attributes| score(pipeline, &attributes));
    record_prediction("batch", outcome_of(&result), start.elapsed());

    match result {
        Ok(predicted_score) => BatchItem::Score { predicted_score },
        Err(ApiError::BadRequest(error)) => BatchItem::Error { error },
        Err(ApiError::Processing) => BatchItem::Error {
            error: PROCESSING_ERROR_MESSAGE.to_string(),
        },
    }
}

pub async fn predict_batch(State(pipeline): State<GuardedPipeline>, body: Bytes) -> Response {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return ApiError::from(RequestError::Empty).into_response();
    }
    let items: Vec<Value> = match serde_json::from_slice(&body) {
        Ok(items) => items,
        Err(err) => {
            return ApiError::BadRequest(format!("Expected a JSON list of requests: {}", err))
                .into_response()
        }
    };
    if items.len() > MAX_BATCH_SIZE {
        return ApiError::BadRequest(format!(
            "Batch has {} items, the limit is {}",
            items.len(),
            MAX_BATCH_SIZE
        ))
        .into_response();
    }
    info!("Batch prediction request with {} items", items.len());

    let scored = tokio::task::spawn_blocking(move || {
        items
            .into_par_iter()
            .map(|item| score_batch_item(&pipeline, item))
            .collect::<Vec<BatchItem>>()
    })
    .await;

    match scored {
        Ok(results) => Json(results).into_response(),
        Err(err) => {
            error!("Batch prediction task failed: {}", err);
            ApiError::Processing.into_response()
        }
    }
}

/// Fields of the web form. Numbers arrive as text and may be left blank.
#[derive(Deserialize, Debug, Default)]
pub struct WebPredictionForm {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub source: Option<String>,
    pub studios: Option<String>,
    pub episodes: Option<String>,
    pub duration_per_episode_sec: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub genre_other_checkbox: Option<String>,
}

fn parse_count(field: &str, value: Option<String>) -> Result<Option<u32>, RequestError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse::<u32>().map(Some).map_err(|_| {
            RequestError::Malformed(format!("Field '{field}' must be a non-negative integer"))
        }),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<WebPredictionForm> for AnimeAttributes {
    type Error = RequestError;

    fn try_from(form: WebPredictionForm) -> Result<Self, Self::Error> {
        let payload = PredictionPayload {
            kind: non_blank(form.kind),
            source: non_blank(form.source),
            studios: non_blank(form.studios),
            episodes: parse_count("episodes", form.episodes)?,
            duration_per_episode_sec: parse_count(
                "duration_per_episode_sec",
                form.duration_per_episode_sec,
            )?,
            genres: Some(Value::Array(
                form.genres.into_iter().map(Value::String).collect(),
            )),
            force_other: form.genre_other_checkbox.is_some(),
        };
        payload.try_into()
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::BadRequest(format!("Invalid form submission: {}", rejection))
    }
}

pub async fn predict_web(
    State(pipeline): State<GuardedPipeline>,
    form: Result<Form<WebPredictionForm>, FormRejection>,
) -> Response {
    let start = Instant::now();
    let result = form
        .map_err(ApiError::from)
        .and_then(|Form(form)| AnimeAttributes::try_from(form).map_err(ApiError::from))
        .and_then(|attributes| {
            info!("Web form prediction request: {:?}", attributes);
            score(&pipeline, &attributes).map(|score| (score, attributes))
        });
    record_prediction("web", outcome_of(&result), start.elapsed());

    match result {
        Ok((predicted_score, user_input)) => Json(WebPredictionResponse {
            predicted_score,
            user_input,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}
