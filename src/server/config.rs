use super::RequestsLoggingLevel;
use std::net::{IpAddr, Ipv4Addr};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub bind_address: IpAddr,
    pub port: u16,
    pub metrics_port: u16,
    pub options_cache_age_sec: usize,
    pub frontend_dir_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            metrics_port: 9091,
            options_cache_age_sec: 3600,
            frontend_dir_path: None,
        }
    }
}
