use axum::extract::FromRef;

use crate::pipeline::ScorePipeline;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

/// The pipeline is immutable once loaded, so handlers share it without a lock.
pub type GuardedPipeline = Arc<ScorePipeline>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub pipeline: GuardedPipeline,
    pub hash: String,
}

impl ServerState {
    pub fn new(config: ServerConfig, pipeline: GuardedPipeline) -> ServerState {
        let hash = pipeline.fingerprint().to_owned();
        ServerState {
            config,
            start_time: Instant::now(),
            pipeline,
            hash,
        }
    }
}

impl FromRef<ServerState> for GuardedPipeline {
    fn from_ref(input: &ServerState) -> Self {
        input.pipeline.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
