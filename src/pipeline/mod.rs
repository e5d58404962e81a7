mod assembler;
mod encoder;
mod genres;
mod pipeline;
mod reputation;
mod request;

pub use assembler::{
    assemble, AssembledRow, FeatureSchema, DURATION_COLUMN, EPISODES_COLUMN,
    SOURCE_AVG_SCORE_COLUMN, STUDIO_AVG_SCORE_COLUMN,
};
pub use encoder::{CategoricalEncoder, CategoricalVariable, EncodedRow, OneHotPolicy, OTHER_STUDIO};
pub use genres::{GenreBucketizer, GENRE_OTHER};
pub use pipeline::{round_score, FeatureTrace, FeatureVector, PipelineOptions, Prediction, ScorePipeline};
pub use reputation::{check_score_maps, Reputation, ReputationTable, SourceFallback};
pub use request::{
    AnimeAttributes, PredictionPayload, RequestError, DEFAULT_DURATION_SEC, DEFAULT_EPISODES,
    DEFAULT_TYPE,
};
