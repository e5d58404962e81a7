use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use anime_score_server::config;
use anime_score_server::pipeline::{ScorePipeline, SourceFallback};
use anime_score_server::server::{metrics, run_server, RequestsLoggingLevel};
use anime_score_server::load_artifacts;

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the trained model artifacts.
    /// Can also be specified in config file.
    #[clap(value_parser = parse_path)]
    pub model_dir: Option<PathBuf>,

    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 5000)]
    pub port: u16,

    /// The address to bind to.
    #[clap(long, default_value = "0.0.0.0")]
    pub bind_address: String,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// How long clients may cache the form options, in seconds.
    #[clap(long, default_value_t = 3600)]
    pub options_cache_age_sec: usize,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Omit the indicator of reference categories when one-hot encoding.
    #[clap(long)]
    pub drop_first: bool,

    /// Value used for sources the model has never seen.
    #[clap(long, value_enum, default_value_t = SourceFallback::StudioMean)]
    pub source_fallback: SourceFallback,
}

impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            model_dir: args.model_dir.clone(),
            port: args.port,
            bind_address: args.bind_address.clone(),
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            options_cache_age_sec: args.options_cache_age_sec,
            frontend_dir_path: args.frontend_dir_path.clone(),
            drop_first: args.drop_first,
            source_fallback: args.source_fallback,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  model_dir: {:?}", app_config.model_dir);
    info!("  listening on: {}:{}", app_config.bind_address, app_config.port);
    info!("  metrics_port: {}", app_config.metrics_port);
    info!("  drop_first: {}", app_config.one_hot.drop_first);
    info!("  source_fallback: {:?}", app_config.source_fallback);

    info!("Loading model artifacts from {:?}...", app_config.model_dir);
    let artifacts = load_artifacts(&app_config.model_dir)?;

    info!("Initializing metrics...");
    metrics::init_metrics();
    metrics::init_model_metrics(artifacts.schema_width());

    let pipeline = ScorePipeline::new(artifacts, app_config.pipeline_options())?;

    run_server(app_config.server_config(), pipeline).await
}
