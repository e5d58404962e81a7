//! Gradient boosted / random forest style tree ensembles exported as JSON.

use super::{check_width, PredictError, Predictor};
use crate::pipeline::FeatureSchema;
use anyhow::{bail, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Random forest: average of the tree outputs.
    #[default]
    Mean,
    /// Boosting: sum of the tree outputs.
    Sum,
}

#[derive(Debug, Deserialize)]
pub struct TreeEnsembleSpec {
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<TreeSpec>,
}

#[derive(Debug, Deserialize)]
pub struct TreeSpec {
    /// Node 0 is the root.
    pub nodes: Vec<NodeSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    /// Goes to `left` when the feature value is `<= threshold`.
    Split {
        feature: String,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(f64),
}

#[derive(Debug, Clone)]
pub struct TreeEnsemblePredictor {
    aggregation: Aggregation,
    base_score: f64,
    width: usize,
    trees: Vec<Vec<Node>>,
}

fn compile_tree(tree_index: usize, spec: TreeSpec, schema: &FeatureSchema) -> Result<Vec<Node>> {
    if spec.nodes.is_empty() {
        bail!("Tree {tree_index} has no nodes.");
    }
    let count = spec.nodes.len();
    spec.nodes
        .into_iter()
        .enumerate()
        .map(|(index, node)| match node {
            NodeSpec::Leaf { value } => {
                if !value.is_finite() {
                    bail!("Tree {tree_index} node {index} has a non-finite leaf value.");
                }
                Ok(Node::Leaf(value))
            }
            NodeSpec::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let Some(position) = schema.position(&feature) else {
                    bail!("Tree {tree_index} node {index} splits on unknown column \"{feature}\".");
                };
                if !threshold.is_finite() {
                    bail!("Tree {tree_index} node {index} has a non-finite threshold.");
                }
                // Children strictly after the parent rules out cycles.
                for child in [left, right] {
                    if child <= index || child >= count {
                        bail!("Tree {tree_index} node {index} has invalid child index {child}.");
                    }
                }
                Ok(Node::Split {
                    feature: position,
                    threshold,
                    left,
                    right,
                })
            }
        })
        .collect()
}

impl TreeEnsemblePredictor {
    pub fn from_spec(spec: TreeEnsembleSpec, schema: &FeatureSchema) -> Result<TreeEnsemblePredictor> {
        if spec.trees.is_empty() {
            bail!("Tree ensemble has no trees.");
        }
        if !spec.base_score.is_finite() {
            bail!("Tree ensemble base score is not finite.");
        }
        let trees = spec
            .trees
            .into_iter()
            .enumerate()
            .map(|(index, tree)| compile_tree(index, tree, schema))
            .collect::<Result<Vec<_>>>()?;

        Ok(TreeEnsemblePredictor {
            aggregation: spec.aggregation,
            base_score: spec.base_score,
            width: schema.len(),
            trees,
        })
    }

    pub fn trees_count(&self) -> usize {
        self.trees.len()
    }

    fn evaluate(tree: &[Node], row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &tree[index] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

impl Predictor for TreeEnsemblePredictor {
    fn kind(&self) -> &'static str {
        "tree_ensemble"
    }

    fn predict(&self, row: &[f64]) -> Result<f64, PredictError> {
        check_width(self.width, row)?;
        let total: f64 = self.trees.iter().map(|tree| Self::evaluate(tree, row)).sum();
        let combined = match self.aggregation {
            Aggregation::Sum => total,
            Aggregation::Mean => total / self.trees.len() as f64,
        };
        Ok(self.base_score + combined)
    }
}
