//! Test model directories
//!
//! Each test gets its own temporary copy of `tests/fixtures/model`, optionally
//! with a different `predictor.json`.

use anime_score_server::predictor::JSON_PREDICTOR_FILE;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn copy_model_dir() -> Result<TempDir> {
    let dir = TempDir::new()?;
    for entry in fs::read_dir(fixtures_dir().join("model"))? {
        let path = entry?.path();
        if let Some(name) = path.file_name() {
            fs::copy(&path, dir.path().join(name))?;
        }
    }
    Ok(dir)
}

fn with_predictor(fixture_name: &str) -> Result<TempDir> {
    let dir = copy_model_dir()?;
    fs::copy(
        fixtures_dir().join(fixture_name),
        dir.path().join(JSON_PREDICTOR_FILE),
    )?;
    Ok(dir)
}

/// Creates a model directory scored by the linear fixture model
pub fn create_model_dir() -> Result<TempDir> {
    copy_model_dir()
}

/// Creates a model directory scored by a two-tree ensemble:
/// movies get +1.0, studios rated above 8.0 get +0.5 over a base of 6.0.
pub fn create_tree_model_dir() -> Result<TempDir> {
    with_predictor("tree_predictor.json")
}

/// Creates a model directory whose linear model overflows to infinity for
/// movies with a genre outside the core set.
pub fn create_overflowing_model_dir() -> Result<TempDir> {
    with_predictor("overflowing_predictor.json")
}
