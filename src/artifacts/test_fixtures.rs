//! Small model directory shared by unit tests, copied from `tests/fixtures/model`.

use super::ModelArtifacts;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FIXTURE_MODEL_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/model");

pub fn write_fixture_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    for entry in fs::read_dir(Path::new(FIXTURE_MODEL_DIR)).unwrap() {
        let path = entry.unwrap().path();
        fs::copy(&path, dir.path().join(path.file_name().unwrap())).unwrap();
    }
    dir
}

pub fn fixture_artifacts() -> ModelArtifacts {
    let dir = write_fixture_dir();
    ModelArtifacts::build(dir.path()).unwrap().artifacts
}
