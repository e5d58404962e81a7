mod config;
mod http_layers;
pub mod metrics;
mod predict;
#[allow(clippy::module_inception)]
mod server;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub use predict::{ApiError, WebPredictionForm, MAX_BATCH_SIZE, PROCESSING_ERROR_MESSAGE};
pub use server::{make_app, run_server, ALL_TYPES};
