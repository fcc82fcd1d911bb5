pub mod fetcher;
pub mod log;
pub mod network;
pub mod rpc;

use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use toml;

use crate::error::ConfigError;
pub use fetcher::FetcherConfig;
pub use log::LoggingConfig;
pub use network::NetworkConfig;
pub use network::NetworkRegistry;
pub use rpc::RpcConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub rpc: RpcConfig,
    pub fetcher: FetcherConfig,
    pub logging: LoggingConfig,
}

pub fn load_config(path: impl AsRef<Path>) -> crate::Result<Config> {
    let path = path.as_ref();
    let config_str = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::OpenFileError(format!("{}: {}", path.display(), e)))?;
    Ok(parse_config(&config_str)?)
}

pub fn parse_config(config_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(config_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
