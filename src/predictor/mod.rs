//! Scoring backends for assembled feature rows.
//!
//! A predictor is loaded once from the model directory and then shared by all
//! request handlers. It only ever sees rows shaped after the feature schema.

mod linear;
#[cfg(feature = "onnx")]
mod onnx;
mod tree_ensemble;

pub use linear::{LinearPredictor, LinearSpec};
#[cfg(feature = "onnx")]
pub use onnx::OnnxPredictor;
pub use tree_ensemble::{Aggregation, NodeSpec, TreeEnsemblePredictor, TreeEnsembleSpec, TreeSpec};

use crate::pipeline::FeatureSchema;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

pub const JSON_PREDICTOR_FILE: &str = "predictor.json";
pub const ONNX_PREDICTOR_FILE: &str = "predictor.onnx";

#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    #[error("Feature row has {actual} values, the model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Model produced a non-finite score: {0}")]
    NonFinite(f64),

    #[error("Model backend failure: {0}")]
    Backend(String),
}

pub trait Predictor: Send + Sync {
    /// Short name of the backend, shown in server stats.
    fn kind(&self) -> &'static str;

    /// Scores a single row with one value per schema column.
    fn predict(&self, row: &[f64]) -> Result<f64, PredictError>;
}

/// Contents of `predictor.json`.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictorSpec {
    Linear(LinearSpec),
    TreeEnsemble(TreeEnsembleSpec),
}

impl PredictorSpec {
    pub fn from_json_slice(bytes: &[u8]) -> Result<PredictorSpec> {
        serde_json::from_slice(bytes).context("Invalid predictor description")
    }

    /// Resolves column names against `schema` and builds the predictor.
    pub fn build(self, schema: &FeatureSchema) -> Result<Arc<dyn Predictor>> {
        Ok(match self {
            PredictorSpec::Linear(spec) => Arc::new(LinearPredictor::from_spec(spec, schema)?),
            PredictorSpec::TreeEnsemble(spec) => {
                Arc::new(TreeEnsemblePredictor::from_spec(spec, schema)?)
            }
        })
    }
}

pub(crate) fn check_width(expected: usize, row: &[f64]) -> Result<(), PredictError> {
    if row.len() != expected {
        return Err(PredictError::ShapeMismatch {
            expected,
            actual: row.len(),
        });
    }
    Ok(())
}
