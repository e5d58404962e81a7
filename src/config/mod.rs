mod file_config;

pub use file_config::{EncodingConfig, FileConfig, ReputationConfig};

use crate::pipeline::{OneHotPolicy, PipelineOptions, SourceFallback};
use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::net::IpAddr;
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub model_dir: Option<PathBuf>,
    pub port: u16,
    pub bind_address: String,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub options_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
    pub drop_first: bool,
    pub source_fallback: SourceFallback,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            model_dir: None,
            port: 5000,
            bind_address: "0.0.0.0".to_string(),
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::default(),
            options_cache_age_sec: 3600,
            frontend_dir_path: None,
            drop_first: false,
            source_fallback: SourceFallback::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model_dir: PathBuf,
    pub port: u16,
    pub bind_address: IpAddr,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub options_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
    pub one_hot: OneHotPolicy,
    pub source_fallback: SourceFallback,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let model_dir = file
            .model_dir
            .map(PathBuf::from)
            .or_else(|| cli.model_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("model_dir must be specified on the command line or in config file")
            })?;

        if !model_dir.exists() {
            bail!("Model directory does not exist: {:?}", model_dir);
        }
        if !model_dir.is_dir() {
            bail!("model_dir is not a directory: {:?}", model_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port != 0 && port == metrics_port {
            bail!("port and metrics_port must differ, both are {}", port);
        }

        let bind_address_str = file.bind_address.unwrap_or_else(|| cli.bind_address.clone());
        let bind_address: IpAddr = match bind_address_str.parse() {
            Ok(address) => address,
            Err(_) => bail!("Invalid bind_address: {:?}", bind_address_str),
        };

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let options_cache_age_sec = file
            .options_cache_age_sec
            .unwrap_or(cli.options_cache_age_sec);
        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let encoding = file.encoding.unwrap_or_default();
        let one_hot = OneHotPolicy {
            drop_first: encoding.drop_first.unwrap_or(cli.drop_first),
        };

        let reputation = file.reputation.unwrap_or_default();
        let source_fallback = reputation.source_fallback.unwrap_or(cli.source_fallback);

        Ok(AppConfig {
            model_dir,
            port,
            bind_address,
            metrics_port,
            logging_level,
            options_cache_age_sec,
            frontend_dir_path,
            one_hot,
            source_fallback,
        })
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            one_hot: self.one_hot,
            source_fallback: self.source_fallback,
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            bind_address: self.bind_address,
            port: self.port,
            metrics_port: self.metrics_port,
            options_cache_age_sec: self.options_cache_age_sec,
            frontend_dir_path: self.frontend_dir_path.clone(),
        }
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
