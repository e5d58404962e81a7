use super::ModelArtifacts;
use anyhow::{Context, Result};
use tracing::{info, warn};

pub fn load_artifacts<P: AsRef<std::path::Path>>(path: P) -> Result<ModelArtifacts> {
    let path = path.as_ref();
    let result = ModelArtifacts::build(path)
        .with_context(|| format!("Could not load model artifacts from {}", path.display()))?;
    let problems = result.problems;
    let artifacts = result.artifacts;

    if !problems.is_empty() {
        warn!("Found {} problems:", problems.len());
        for problem in problems.iter() {
            warn!("- {:?}", problem);
        }
        info!("Model was loaded, but check the {} non-fatal issues above.", problems.len());
    } else {
        info!("Model artifacts checked, no issues found.");
    }

    info!(
        "Model has:\n{} feature columns\n{} genre classes\n{} core genres\n{} top studios\n{} studio scores\n{} source scores\npredictor: {}\nfingerprint: {}",
        artifacts.schema_width(),
        artifacts.genre_classes.len(),
        artifacts.core_genres.len(),
        artifacts.top_studios.len(),
        artifacts.studio_scores.len(),
        artifacts.source_scores.len(),
        artifacts.predictor.kind(),
        artifacts.fingerprint,
    );
    Ok(artifacts)
}
