//! Studio and source reputation features.
//!
//! Both features are the mean historical score of the category as learned at
//! training time. Categories never seen in training get the global mean.

use anyhow::{bail, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Which value stands in for sources that are absent from the source map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceFallback {
    /// Mean of the studio map, the same value used for unseen studios.
    #[default]
    StudioMean,
    /// Mean of the source map.
    SourceMean,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reputation {
    pub studio_avg_score: f64,
    pub source_avg_score: f64,
    pub studio_known: bool,
    pub source_known: bool,
}

#[derive(Debug, Clone)]
pub struct ReputationTable {
    studio_scores: BTreeMap<String, f64>,
    source_scores: BTreeMap<String, f64>,
    global_mean: f64,
    source_fallback: f64,
}

fn mean(scores: &BTreeMap<String, f64>) -> f64 {
    scores.values().sum::<f64>() / scores.len() as f64
}

fn check_finite(map_name: &str, scores: &BTreeMap<String, f64>) -> Result<()> {
    if let Some((key, value)) = scores.iter().find(|(_, v)| !v.is_finite()) {
        bail!("{map_name} has a non-finite score for \"{key}\": {value}");
    }
    Ok(())
}

/// Rejects score maps that cannot back the reputation features: an empty
/// studio map has no global mean, and every score must be finite.
pub fn check_score_maps(
    studio_scores: &BTreeMap<String, f64>,
    source_scores: &BTreeMap<String, f64>,
) -> Result<()> {
    if studio_scores.is_empty() {
        bail!("Studio mean score map is empty, cannot compute the global mean.");
    }
    check_finite("Studio mean score map", studio_scores)?;
    check_finite("Source mean score map", source_scores)
}

impl ReputationTable {
    pub fn new(
        studio_scores: BTreeMap<String, f64>,
        source_scores: BTreeMap<String, f64>,
        fallback: SourceFallback,
    ) -> Result<ReputationTable> {
        check_score_maps(&studio_scores, &source_scores)?;

        let global_mean = mean(&studio_scores);
        let source_fallback = match fallback {
            SourceFallback::StudioMean => global_mean,
            SourceFallback::SourceMean => {
                if source_scores.is_empty() {
                    bail!("Source mean score map is empty, cannot use it as fallback.");
                }
                mean(&source_scores)
            }
        };

        Ok(ReputationTable {
            studio_scores,
            source_scores,
            global_mean,
            source_fallback,
        })
    }

    /// Mean of all studio scores.
    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    /// Value used for sources absent from the source map.
    pub fn source_fallback(&self) -> f64 {
        self.source_fallback
    }

    pub fn resolve(&self, studio: &str, source: &str) -> Reputation {
        let studio_score = self.studio_scores.get(studio).copied();
        let source_score = self.source_scores.get(source).copied();
        Reputation {
            studio_avg_score: studio_score.unwrap_or(self.global_mean),
            source_avg_score: source_score.unwrap_or(self.source_fallback),
            studio_known: studio_score.is_some(),
            source_known: source_score.is_some(),
        }
    }

    /// Known sources, in sorted order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.source_scores.keys().map(String::as_str)
    }
}
