//! Per-request logging and the HTTP metrics, labelled by route template.

use super::super::{state::ServerState, ApiError};
use crate::server::metrics::record_http_request;
use axum::{
    body::{Body, HttpBody},
    extract::{MatchedPath, State},
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{error, info, warn};

/// How much of each request gets logged. Metrics are recorded at every level.
#[derive(PartialEq, PartialOrd, Clone, Debug, Default, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    /// One summary line per request.
    #[default]
    Path,
    /// Also content type and size of request and response.
    Headers,
    /// Also the beginning of bodies small enough to buffer.
    Body,
}

/// Route label of requests no route matched, including static frontend files.
pub const UNMATCHED_ROUTE: &str = "unmatched";

const MAX_BUFFERED_BODY_BYTES: u64 = 64 * 1024;
const LOGGED_BODY_CHARS: usize = 512;

fn route_label<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned())
}

fn content_summary(headers: &HeaderMap) -> String {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("no content type");
    let size = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    match size {
        Some(size) => format!("{} {:#}", content_type, byte_unit::Byte::from(size)),
        None => format!("{} of unknown size", content_type),
    }
}

fn truncate_for_log(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    match text.char_indices().nth(LOGGED_BODY_CHARS) {
        Some((cut, _)) => format!("{}... ({} more bytes)", &text[..cut], text.len() - cut),
        None => text.into_owned(),
    }
}

/// Logs the body when its exact size is known and small, and hands back an
/// equivalent body. Streamed bodies pass through untouched.
async fn log_body(label: &str, body: Body) -> Result<Body, axum::Error> {
    match body.size_hint().exact() {
        Some(0) => {
            info!("  {} body: empty", label);
            Ok(body)
        }
        Some(size) if size <= MAX_BUFFERED_BODY_BYTES => {
            let bytes = axum::body::to_bytes(body, size as usize).await?;
            info!("  {} body: {}", label, truncate_for_log(&bytes));
            Ok(Body::from(bytes))
        }
        Some(size) => {
            info!(
                "  {} body: too big to log ({:#})",
                label,
                byte_unit::Byte::from(size as usize)
            );
            Ok(body)
        }
        None => {
            info!("  {} body: streamed, not logged", label);
            Ok(body)
        }
    }
}

pub async fn log_requests(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let level = state.config.requests_logging_level.clone();
    let start = Instant::now();

    let method = request.method().to_string();
    let uri = request.uri().to_string();
    let route = route_label(&request);

    if level >= RequestsLoggingLevel::Headers {
        info!(">>> {} {} ({})", method, uri, content_summary(request.headers()));
    }

    let request = if level >= RequestsLoggingLevel::Body {
        let (parts, body) = request.into_parts();
        match log_body("Req", body).await {
            Ok(body) => Request::from_parts(parts, body),
            Err(err) => {
                error!("Failed to read request body: {}", err);
                let response =
                    ApiError::BadRequest("Could not read request body".to_string()).into_response();
                record_http_request(&method, &route, response.status().as_u16(), start.elapsed());
                return response;
            }
        }
    } else {
        request
    };

    let mut response = next.run(request).await;

    if level >= RequestsLoggingLevel::Headers {
        info!(
            "<<< {} ({})",
            response.status().as_u16(),
            content_summary(response.headers())
        );
    }

    if level >= RequestsLoggingLevel::Body {
        let (parts, body) = response.into_parts();
        response = match log_body("Resp", body).await {
            Ok(body) => Response::from_parts(parts, body),
            Err(err) => {
                error!("Failed to read response body: {}", err);
                ApiError::Processing.into_response()
            }
        };
    }

    let status = response.status();
    let duration = start.elapsed();
    record_http_request(&method, &route, status.as_u16(), duration);

    if level > RequestsLoggingLevel::None {
        let millis = duration.as_millis();
        if status.is_server_error() {
            warn!("{} {} [{}] -> {} in {}ms", method, uri, route, status.as_u16(), millis);
        } else {
            info!("{} {} [{}] -> {} in {}ms", method, uri, route, status.as_u16(), millis);
        }
    }

    response
}
