//! Anime Score Server Library
//!
//! This library exposes the internal modules for testing and for the binaries.

pub mod artifacts;
pub mod config;
pub mod pipeline;
pub mod predictor;
pub mod server;

// Re-export commonly used types for convenience
pub use artifacts::{load_artifacts, ModelArtifacts};
pub use pipeline::{AnimeAttributes, PipelineOptions, ScorePipeline};
pub use predictor::Predictor;
pub use server::{run_server, RequestsLoggingLevel};
