use super::{check_width, PredictError, Predictor};
use crate::pipeline::FeatureSchema;
use anyhow::{bail, Result};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct LinearSpec {
    #[serde(default)]
    pub intercept: f64,
    /// Weight per schema column. Columns not listed weigh zero.
    pub coefficients: HashMap<String, f64>,
}

/// `intercept + sum(weight * value)` over the schema columns.
#[derive(Debug, Clone)]
pub struct LinearPredictor {
    intercept: f64,
    weights: Vec<f64>,
}

impl LinearPredictor {
    pub fn new(intercept: f64, weights: Vec<f64>) -> LinearPredictor {
        LinearPredictor { intercept, weights }
    }

    pub fn from_spec(spec: LinearSpec, schema: &FeatureSchema) -> Result<LinearPredictor> {
        if !spec.intercept.is_finite() {
            bail!("Linear model intercept is not finite: {}", spec.intercept);
        }
        let mut weights = vec![0.0; schema.len()];
        for (column, weight) in spec.coefficients {
            let Some(index) = schema.position(&column) else {
                bail!("Linear model has a coefficient for \"{column}\", which is not a feature column.");
            };
            if !weight.is_finite() {
                bail!("Linear model coefficient for \"{column}\" is not finite: {weight}");
            }
            weights[index] = weight;
        }
        Ok(LinearPredictor::new(spec.intercept, weights))
    }
}

impl Predictor for LinearPredictor {
    fn kind(&self) -> &'static str {
        "linear"
    }

    fn predict(&self, row: &[f64]) -> Result<f64, PredictError> {
        check_width(self.weights.len(), row)?;
        let weighted: f64 = self.weights.iter().zip(row).map(|(w, x)| w * x).sum();
        Ok(self.intercept + weighted)
    }
}
