//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own model directory.

use super::constants::*;
use super::fixtures::create_model_dir;
use anime_score_server::pipeline::{PipelineOptions, ScorePipeline};
use anime_score_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use anime_score_server::load_artifacts;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated model directory
///
/// When dropped, the server gracefully shuts down and the model directory is removed.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    // Private fields - keep resources alive until drop
    _temp_model_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with default pipeline options
    pub async fn spawn() -> Self {
        Self::spawn_with_options(PipelineOptions::default()).await
    }

    /// Spawns a new test server on a random port with the linear fixture model
    pub async fn spawn_with_options(options: PipelineOptions) -> Self {
        let temp_model_dir = create_model_dir().expect("Failed to create model directory");
        Self::spawn_with_model_dir(temp_model_dir, options).await
    }

    /// Spawns a new test server on a random port serving the model in `temp_model_dir`
    ///
    /// # Panics
    ///
    /// Panics if the model cannot be loaded, the port cannot be bound or the
    /// server doesn't become ready within timeout.
    pub async fn spawn_with_model_dir(temp_model_dir: TempDir, options: PipelineOptions) -> Self {
        let artifacts = load_artifacts(temp_model_dir.path()).expect("Failed to load model");
        let pipeline = ScorePipeline::new(artifacts, options).expect("Failed to build pipeline");

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            options_cache_age_sec: OPTIONS_CACHE_AGE_SEC,
            frontend_dir_path: None,
            ..Default::default()
        };

        let app = make_app(config, Arc::new(pipeline));

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            _temp_model_dir: temp_model_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
