use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    OpenFileError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Invalid endpoint url for {network}: {url}")]
    InvalidEndpoint { network: String, url: String },

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),
}
