//! Per-request input parsing and validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_TYPE: &str = "TV";
pub const DEFAULT_EPISODES: u32 = 12;
pub const DEFAULT_DURATION_SEC: u32 = 1440;

const REQUIRED_FIELDS: [&str; 3] = ["genres", "source", "studios"];

/// Client input errors. These are reported back to the caller and never
/// affect other requests.
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("No data received")]
    Empty,

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Field 'genres' must be a list")]
    GenresNotAList,

    #[error("Field 'genres' must only contain strings, found {0}")]
    InvalidGenre(String),
}

/// Raw request body as sent by clients. Every field is optional here so that
/// missing fields can be reported by name instead of as a parse failure.
#[derive(Deserialize, Debug, Default)]
pub struct PredictionPayload {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub source: Option<String>,
    pub studios: Option<String>,
    pub episodes: Option<u32>,
    pub duration_per_episode_sec: Option<u32>,
    pub genres: Option<Value>,
    #[serde(default)]
    pub force_other: bool,
}

/// A validated prediction request with defaults applied.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct AnimeAttributes {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub studios: String,
    pub episodes: u32,
    pub duration_per_episode_sec: u32,
    pub genres: Vec<String>,
    /// Forces the `Genre_Other` marker even when every genre is a core genre.
    pub force_other: bool,
}

impl AnimeAttributes {
    /// Builds attributes from the required fields, using defaults for the rest.
    pub fn new<S: Into<String>>(source: S, studios: S, genres: Vec<String>) -> Self {
        AnimeAttributes {
            kind: DEFAULT_TYPE.to_string(),
            source: source.into(),
            studios: studios.into(),
            episodes: DEFAULT_EPISODES,
            duration_per_episode_sec: DEFAULT_DURATION_SEC,
            genres,
            force_other: false,
        }
    }

    pub fn from_json_slice(body: &[u8]) -> Result<Self, RequestError> {
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(RequestError::Empty);
        }
        let payload: PredictionPayload =
            serde_json::from_slice(body).map_err(|e| RequestError::Malformed(e.to_string()))?;
        payload.try_into()
    }

    pub fn from_json_value(value: Value) -> Result<Self, RequestError> {
        if value.is_null() {
            return Err(RequestError::Empty);
        }
        let payload: PredictionPayload =
            serde_json::from_value(value).map_err(|e| RequestError::Malformed(e.to_string()))?;
        payload.try_into()
    }
}

fn parse_genres(value: Value) -> Result<Vec<String>, RequestError> {
    let items = match value {
        Value::Array(items) => items,
        _ => return Err(RequestError::GenresNotAList),
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(genre) => Ok(genre),
            other => Err(RequestError::InvalidGenre(other.to_string())),
        })
        .collect()
}

impl TryFrom<PredictionPayload> for AnimeAttributes {
    type Error = RequestError;

    fn try_from(payload: PredictionPayload) -> Result<Self, Self::Error> {
        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .into_iter()
            .filter(|field| match *field {
                "genres" => payload.genres.as_ref().map_or(true, Value::is_null),
                "source" => payload.source.is_none(),
                _ => payload.studios.is_none(),
            })
            .collect();
        if !missing.is_empty() {
            return Err(RequestError::MissingFields(missing));
        }

        // Presence was checked above.
        let (Some(source), Some(studios), Some(genres)) =
            (payload.source, payload.studios, payload.genres)
        else {
            return Err(RequestError::MissingFields(REQUIRED_FIELDS.to_vec()));
        };

        Ok(AnimeAttributes {
            kind: payload.kind.unwrap_or_else(|| DEFAULT_TYPE.to_string()),
            source,
            studios,
            episodes: payload.episodes.unwrap_or(DEFAULT_EPISODES),
            duration_per_episode_sec: payload
                .duration_per_episode_sec
                .unwrap_or(DEFAULT_DURATION_SEC),
            genres: parse_genres(genres)?,
            force_other: payload.force_other,
        })
    }
}
