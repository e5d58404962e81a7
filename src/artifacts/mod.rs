mod bundle;
mod load;
#[cfg(test)]
pub(crate) mod test_fixtures;

pub use bundle::{
    ArtifactPaths, ModelArtifacts, ModelArtifactsBuildResult, Problem as LoadArtifactsProblem,
    CORE_GENRES_FILE, GENRES_ENCODER_FILE, SCHEMA_FILE, SOURCE_SCORES_FILE, STUDIO_SCORES_FILE,
    TOP_STUDIOS_FILE,
};
pub use load::load_artifacts;
