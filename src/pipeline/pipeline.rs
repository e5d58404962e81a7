use super::assembler::{
    assemble, FeatureSchema, DURATION_COLUMN, EPISODES_COLUMN, SOURCE_AVG_SCORE_COLUMN,
    STUDIO_AVG_SCORE_COLUMN,
};
use super::encoder::{CategoricalEncoder, OneHotPolicy};
use super::genres::{GenreBucketizer, GENRE_OTHER};
use super::reputation::{ReputationTable, SourceFallback};
use super::request::AnimeAttributes;
use crate::artifacts::ModelArtifacts;
use crate::predictor::{PredictError, Predictor};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub one_hot: OneHotPolicy,
    pub source_fallback: SourceFallback,
}

/// What the pipeline did with the categorical input, for logging and metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureTrace {
    pub studio_known: bool,
    pub source_known: bool,
    pub studio_collapsed: bool,
    pub genre_other: bool,
    pub genres: Vec<String>,
    pub dropped_columns: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    /// One value per schema column, in schema order.
    pub values: Vec<f64>,
    pub trace: FeatureTrace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Full precision model output.
    pub score: f64,
    pub trace: FeatureTrace,
}

impl Prediction {
    pub fn rounded_score(&self) -> f64 {
        round_score(self.score)
    }
}

/// Rounds a score to two decimals for display.
pub fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

/// Turns raw anime attributes into a schema-shaped feature row and scores it.
///
/// Everything in here is read-only after construction, so a single pipeline
/// is shared by all concurrent requests.
pub struct ScorePipeline {
    schema: FeatureSchema,
    reputation: ReputationTable,
    bucketizer: GenreBucketizer,
    encoder: CategoricalEncoder,
    predictor: Arc<dyn Predictor>,
    options: PipelineOptions,
    fingerprint: String,
}

impl ScorePipeline {
    pub fn new(artifacts: ModelArtifacts, options: PipelineOptions) -> Result<ScorePipeline> {
        let reputation = ReputationTable::new(
            artifacts.studio_scores,
            artifacts.source_scores,
            options.source_fallback,
        )?;
        let encoder = CategoricalEncoder::new(
            artifacts.top_studios,
            artifacts.genre_classes,
            &artifacts.schema,
            options.one_hot,
        );
        Ok(ScorePipeline {
            schema: artifacts.schema,
            reputation,
            bucketizer: GenreBucketizer::new(artifacts.core_genres),
            encoder,
            predictor: artifacts.predictor,
            options,
            fingerprint: artifacts.fingerprint,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn predictor_kind(&self) -> &'static str {
        self.predictor.kind()
    }

    pub fn core_genres(&self) -> &BTreeSet<String> {
        self.bucketizer.core_genres()
    }

    pub fn reputation(&self) -> &ReputationTable {
        &self.reputation
    }

    pub fn bucketizer(&self) -> &GenreBucketizer {
        &self.bucketizer
    }

    pub fn encoder(&self) -> &CategoricalEncoder {
        &self.encoder
    }

    pub fn build_features(&self, attributes: &AnimeAttributes) -> FeatureVector {
        let reputation = self
            .reputation
            .resolve(&attributes.studios, &attributes.source);

        let genres = self
            .bucketizer
            .bucketize(&attributes.genres, attributes.force_other);

        let encoded = self.encoder.encode(
            &attributes.kind,
            &attributes.source,
            &attributes.studios,
            &genres,
        );

        let mut produced: Vec<(String, f64)> = Vec::with_capacity(4 + encoded.columns.len());
        produced.push((EPISODES_COLUMN.to_string(), attributes.episodes as f64));
        produced.push((
            DURATION_COLUMN.to_string(),
            attributes.duration_per_episode_sec as f64,
        ));
        produced.push((
            STUDIO_AVG_SCORE_COLUMN.to_string(),
            reputation.studio_avg_score,
        ));
        produced.push((
            SOURCE_AVG_SCORE_COLUMN.to_string(),
            reputation.source_avg_score,
        ));
        produced.extend(encoded.columns);

        let row = assemble(&self.schema, &produced);
        if !row.dropped.is_empty() {
            debug!("Columns not in the model schema: {:?}", row.dropped);
        }

        FeatureVector {
            values: row.values,
            trace: FeatureTrace {
                studio_known: reputation.studio_known,
                source_known: reputation.source_known,
                studio_collapsed: encoded.studio_collapsed,
                genre_other: genres.iter().any(|g| g == GENRE_OTHER),
                genres,
                dropped_columns: row.dropped.len(),
            },
        }
    }

    pub fn predict(&self, attributes: &AnimeAttributes) -> Result<Prediction, PredictError> {
        let features = self.build_features(attributes);
        let score = self.predictor.predict(&features.values)?;
        if !score.is_finite() {
            return Err(PredictError::NonFinite(score));
        }
        Ok(Prediction {
            score,
            trace: features.trace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::test_fixtures::fixture_artifacts;

    fn pipeline() -> ScorePipeline {
        ScorePipeline::new(fixture_artifacts(), PipelineOptions::default()).unwrap()
    }

    fn value(pipeline: &ScorePipeline, features: &FeatureVector, column: &str) -> f64 {
        features.values[pipeline.schema().position(column).unwrap()]
    }

    #[test]
    fn minimal_request_scores_finite() {
        let pipeline = pipeline();
        let attributes = AnimeAttributes::new(
            "Light novel",
            "J.C.Staff",
            vec!["Action".into(), "Fantasy".into(), "Adventure".into()],
        );
        let prediction = pipeline.predict(&attributes).unwrap();
        assert!(prediction.score.is_finite());
        assert!(prediction.trace.studio_known);
        assert!(!prediction.trace.genre_other);
    }

    #[test]
    fn numeric_and_reputation_columns_are_filled() {
        let pipeline = pipeline();
        let attributes = AnimeAttributes::new("Manga", "ufotable", vec!["Action".into()]);
        let features = pipeline.build_features(&attributes);

        assert_eq!(value(&pipeline, &features, "Episodes"), 12.0);
        assert_eq!(value(&pipeline, &features, "duration_per_episode_sec"), 1440.0);
        assert_eq!(value(&pipeline, &features, "studio_avg_score"), 8.1);
        assert_eq!(value(&pipeline, &features, "source_avg_score"), 7.2);
        assert_eq!(value(&pipeline, &features, "Type_TV"), 1.0);
        assert_eq!(value(&pipeline, &features, "Studios_ufotable"), 1.0);
        assert_eq!(value(&pipeline, &features, "Action"), 1.0);
        assert_eq!(features.values.len(), pipeline.schema().len());
    }

    #[test]
    fn unseen_categories_fall_back() {
        let pipeline = pipeline();
        let mut attributes = AnimeAttributes::new("Web novel", "Trigger", vec!["Mecha".into()]);
        attributes.kind = "Music".to_string();
        let features = pipeline.build_features(&attributes);

        let global_mean = pipeline.reputation().global_mean();
        assert_eq!(value(&pipeline, &features, "studio_avg_score"), global_mean);
        assert_eq!(value(&pipeline, &features, "source_avg_score"), global_mean);
        assert_eq!(value(&pipeline, &features, "Studios_Other"), 1.0);
        assert_eq!(value(&pipeline, &features, "Genre_Other"), 1.0);
        for column in ["Type_TV", "Type_Movie", "Source_Manga", "Source_Light novel"] {
            assert_eq!(value(&pipeline, &features, column), 0.0, "{column}");
        }
        assert!(features.trace.studio_collapsed);
        assert!(!features.trace.studio_known);
        assert!(!features.trace.source_known);
    }

    #[test]
    fn long_tail_studio_matches_explicit_other() {
        let pipeline = pipeline();
        let mut comix = AnimeAttributes::new(
            "Original",
            "CoMix Wave Films",
            vec!["Drama".into(), "Romance".into()],
        );
        comix.kind = "Movie".to_string();
        let mut other = comix.clone();
        other.studios = "Other".to_string();

        let comix_row = pipeline.encoder().encode(
            &comix.kind,
            &comix.source,
            &comix.studios,
            &pipeline.bucketizer().bucketize(&comix.genres, false),
        );
        let other_row = pipeline.encoder().encode(
            &other.kind,
            &other.source,
            &other.studios,
            &pipeline.bucketizer().bucketize(&other.genres, false),
        );
        assert_eq!(comix_row.columns, other_row.columns);
    }

    #[test]
    fn rare_genres_keep_core_overlap_and_marker() {
        let pipeline = pipeline();
        let attributes = AnimeAttributes::new(
            "Original",
            "Trigger",
            vec!["Action".into(), "Sci-Fi".into(), "Cyberpunk".into(), "Mecha".into()],
        );
        let features = pipeline.build_features(&attributes);
        assert_eq!(features.trace.genres, vec!["Action", "Sci-Fi", GENRE_OTHER]);
        assert!(features.trace.genre_other);
    }

    #[test]
    fn same_input_gives_same_output() {
        let pipeline = pipeline();
        let attributes = AnimeAttributes::new(
            "Manga",
            "CloverWorks",
            vec!["Romance".into(), "School".into(), "Drama".into()],
        );
        let first = pipeline.predict(&attributes).unwrap();
        let second = pipeline.predict(&attributes).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            pipeline.build_features(&attributes),
            pipeline.build_features(&attributes)
        );
    }

    #[test]
    fn drop_first_does_not_change_the_vector() {
        let keep_all = pipeline();
        let drop_first = ScorePipeline::new(
            fixture_artifacts(),
            PipelineOptions {
                one_hot: OneHotPolicy { drop_first: true },
                ..Default::default()
            },
        )
        .unwrap();

        let mut attributes = AnimeAttributes::new("4-koma manga", "8bit", vec!["Comedy".into()]);
        attributes.kind = "Movie".to_string();
        for kind in ["Movie", "TV", "ONA"] {
            attributes.kind = kind.to_string();
            assert_eq!(
                keep_all.build_features(&attributes).values,
                drop_first.build_features(&attributes).values
            );
        }
    }

    #[test]
    fn score_comes_from_the_assembled_row() {
        let pipeline = pipeline();
        let attributes = AnimeAttributes::new("Manga", "ufotable", vec![]);
        let prediction = pipeline.predict(&attributes).unwrap();
        // 5.0 + 0.01 * 12 episodes + 0.3 * 8.1 studio + 0.1 * 7.2 source
        assert!((prediction.score - 8.27).abs() < 1e-9, "{}", prediction.score);
        assert_eq!(prediction.rounded_score(), 8.27);
    }

    #[test]
    fn rounding_keeps_two_decimals() {
        assert_eq!(round_score(7.456), 7.46);
        assert_eq!(round_score(7.454), 7.45);
        assert_eq!(round_score(7.0), 7.0);
    }
}
