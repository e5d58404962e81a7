//! ONNX models through tract, for predictors exported from the training stack.

use super::{check_width, PredictError, Predictor};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;
use tract_onnx::prelude::*;

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Runs a model taking a `[1, width]` f32 tensor and returning one score.
pub struct OnnxPredictor {
    plan: OnnxPlan,
    width: usize,
}

impl OnnxPredictor {
    pub fn load(path: &Path, width: usize) -> Result<OnnxPredictor> {
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("Failed to read ONNX model {}", path.display()))?
            .with_input_fact(0, f32::fact([1, width]).into())?
            .into_optimized()?
            .into_runnable()
            .with_context(|| format!("Failed to prepare ONNX model {}", path.display()))?;
        debug!("Loaded ONNX model from {} ({} inputs)", path.display(), width);
        Ok(OnnxPredictor { plan, width })
    }
}

impl Predictor for OnnxPredictor {
    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn predict(&self, row: &[f64]) -> Result<f64, PredictError> {
        check_width(self.width, row)?;
        let input: Tensor =
            tract_ndarray::Array2::from_shape_fn((1, self.width), |(_, j)| row[j] as f32).into();
        let output = self
            .plan
            .run(tvec![input.into()])
            .map_err(|e| PredictError::Backend(format!("ONNX inference failed: {}", e)))?;
        let scores = output[0]
            .to_array_view::<f32>()
            .map_err(|e| PredictError::Backend(format!("Output extraction failed: {}", e)))?;
        scores
            .iter()
            .next()
            .map(|score| *score as f64)
            .ok_or_else(|| PredictError::Backend("ONNX model returned no score".to_string()))
    }
}
