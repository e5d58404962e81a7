use crate::pipeline::{check_score_maps, CategoricalVariable, FeatureSchema, GENRE_OTHER, OTHER_STUDIO};
use crate::predictor::{self, Predictor, PredictorSpec};
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const SCHEMA_FILE: &str = "model_features.json";
pub const GENRES_ENCODER_FILE: &str = "genres_encoder.json";
pub const TOP_STUDIOS_FILE: &str = "top_studios.json";
pub const CORE_GENRES_FILE: &str = "core_genres.json";
pub const STUDIO_SCORES_FILE: &str = "studio_mean_score_map.json";
pub const SOURCE_SCORES_FILE: &str = "source_mean_score_map.json";

#[derive(Debug, Clone, PartialEq)]
enum PredictorFile {
    Json(PathBuf),
    #[cfg(feature = "onnx")]
    Onnx(PathBuf),
}

#[derive(Debug)]
pub struct ArtifactPaths {
    pub root: PathBuf,
    schema: PathBuf,
    genres_encoder: PathBuf,
    top_studios: PathBuf,
    core_genres: PathBuf,
    studio_scores: PathBuf,
    source_scores: PathBuf,
    predictor: PredictorFile,
}

fn require_file(root: &Path, name: &str) -> Result<PathBuf> {
    let path = root.join(name);
    if !path.is_file() {
        bail!("No {} in {}", name, root.display());
    }
    Ok(path)
}

fn find_predictor(root: &Path) -> Result<PredictorFile> {
    let json = root.join(predictor::JSON_PREDICTOR_FILE);
    if json.is_file() {
        return Ok(PredictorFile::Json(json));
    }
    let onnx = root.join(predictor::ONNX_PREDICTOR_FILE);
    #[cfg(feature = "onnx")]
    {
        if onnx.is_file() {
            return Ok(PredictorFile::Onnx(onnx));
        }
    }
    #[cfg(not(feature = "onnx"))]
    {
        if onnx.is_file() {
            bail!(
                "Found {} but this build has no ONNX support, rebuild with the \"onnx\" feature.",
                onnx.display()
            );
        }
    }
    bail!(
        "No {} or {} in {}",
        predictor::JSON_PREDICTOR_FILE,
        predictor::ONNX_PREDICTOR_FILE,
        root.display()
    );
}

impl ArtifactPaths {
    pub fn from_root(root: &Path) -> Result<ArtifactPaths> {
        if !root.is_dir() {
            bail!("{} is not a valid directory.", root.display());
        }

        Ok(ArtifactPaths {
            root: root.to_owned(),
            schema: require_file(root, SCHEMA_FILE)?,
            genres_encoder: require_file(root, GENRES_ENCODER_FILE)?,
            top_studios: require_file(root, TOP_STUDIOS_FILE)?,
            core_genres: require_file(root, CORE_GENRES_FILE)?,
            studio_scores: require_file(root, STUDIO_SCORES_FILE)?,
            source_scores: require_file(root, SOURCE_SCORES_FILE)?,
            predictor: find_predictor(root)?,
        })
    }
}

/// Non-fatal inconsistencies between artifacts. The model still loads but
/// some inputs will never reach a feature column.
#[derive(Debug, Clone, PartialEq)]
pub enum Problem {
    CoreGenreNotEncoded(String),
    GenreOtherNotEncoded,
    GenreClassWithoutColumn(String),
    TopStudioWithoutColumn(String),
}

#[derive(Deserialize)]
struct GenresEncoderFile {
    classes: Vec<String>,
}

/// Everything the pipeline needs from a trained model, read-only once loaded.
pub struct ModelArtifacts {
    pub schema: FeatureSchema,
    /// Multi-hot genre classes, in encoder order.
    pub genre_classes: Vec<String>,
    pub core_genres: BTreeSet<String>,
    pub top_studios: BTreeSet<String>,
    pub studio_scores: BTreeMap<String, f64>,
    pub source_scores: BTreeMap<String, f64>,
    pub predictor: Arc<dyn Predictor>,
    /// Digest of the artifact files, identifies the loaded model.
    pub fingerprint: String,
}

pub struct ModelArtifactsBuildResult {
    pub artifacts: ModelArtifacts,
    pub problems: Vec<Problem>,
}

// Reads and parses a file, feeding its bytes into the fingerprint.
fn read_json<T: DeserializeOwned>(path: &Path, hasher: &mut Sha256) -> Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    hash_file(path, &bytes, hasher);
    serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

fn hash_file(path: &Path, bytes: &[u8], hasher: &mut Sha256) {
    if let Some(name) = path.file_name() {
        hasher.update(name.to_string_lossy().as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(bytes);
}

fn check_problems(
    schema: &FeatureSchema,
    genre_classes: &[String],
    core_genres: &BTreeSet<String>,
    top_studios: &BTreeSet<String>,
) -> Vec<Problem> {
    let mut problems = Vec::new();
    for genre in core_genres {
        if !genre_classes.contains(genre) {
            problems.push(Problem::CoreGenreNotEncoded(genre.clone()));
        }
    }
    if !genre_classes.iter().any(|c| c == GENRE_OTHER) {
        problems.push(Problem::GenreOtherNotEncoded);
    }
    for class in genre_classes {
        if !schema.contains(class) {
            problems.push(Problem::GenreClassWithoutColumn(class.clone()));
        }
    }
    let studios = CategoricalVariable::Studios;
    for studio in top_studios.iter().map(String::as_str).chain([OTHER_STUDIO]) {
        if !schema.contains(&studios.column(studio)) {
            problems.push(Problem::TopStudioWithoutColumn(studio.to_string()));
        }
    }
    problems
}

impl ModelArtifacts {
    pub fn build(root_dir: &Path) -> Result<ModelArtifactsBuildResult> {
        let paths = ArtifactPaths::from_root(root_dir)?;
        let mut hasher = Sha256::new();

        let schema = FeatureSchema::new(read_json(&paths.schema, &mut hasher)?)
            .with_context(|| format!("Invalid {}", paths.schema.display()))?;
        let encoder: GenresEncoderFile = read_json(&paths.genres_encoder, &mut hasher)?;
        let top_studios: BTreeSet<String> = read_json(&paths.top_studios, &mut hasher)?;
        let core_genres: BTreeSet<String> = read_json(&paths.core_genres, &mut hasher)?;
        let studio_scores: BTreeMap<String, f64> = read_json(&paths.studio_scores, &mut hasher)?;
        let source_scores: BTreeMap<String, f64> = read_json(&paths.source_scores, &mut hasher)?;

        check_score_maps(&studio_scores, &source_scores).with_context(|| {
            format!(
                "Invalid score maps in {} and {}",
                paths.studio_scores.display(),
                paths.source_scores.display()
            )
        })?;

        let predictor: Arc<dyn Predictor> = match &paths.predictor {
            PredictorFile::Json(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                hash_file(path, &bytes, &mut hasher);
                PredictorSpec::from_json_slice(&bytes)
                    .and_then(|spec| spec.build(&schema))
                    .with_context(|| format!("Invalid predictor in {}", path.display()))?
            }
            #[cfg(feature = "onnx")]
            PredictorFile::Onnx(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                hash_file(path, &bytes, &mut hasher);
                Arc::new(predictor::OnnxPredictor::load(path, schema.len())?)
            }
        };

        let problems = check_problems(&schema, &encoder.classes, &core_genres, &top_studios);
        let fingerprint = format!("sha256:{:x}", hasher.finalize());

        Ok(ModelArtifactsBuildResult {
            artifacts: ModelArtifacts {
                schema,
                genre_classes: encoder.classes,
                core_genres,
                top_studios,
                studio_scores,
                source_scores,
                predictor,
                fingerprint,
            },
            problems,
        })
    }

    pub fn schema_width(&self) -> usize {
        self.schema.len()
    }
}
