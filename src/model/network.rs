use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Devnet,
}

impl Network {
    pub const ALL: [Network; 3] = [Network::Mainnet, Network::Testnet, Network::Devnet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Devnet => "devnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "devnet" => Ok(Network::Devnet),
            other => Err(ConfigError::UnknownNetwork(other.to_string())),
        }
    }
}

/// Request url and push-subscription url of one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEndpoints {
    pub rpc_url: String,
    pub ws_url: String,
}

impl NetworkEndpoints {
    pub fn new(
        rpc_url: impl Into<String>,
        ws_url: impl Into<String>,
    ) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            ws_url: ws_url.into(),
        }
    }

    /// Derives the websocket url by swapping the http scheme.
    pub fn from_rpc_url(rpc_url: &str) -> Self {
        let ws_url = if let Some(rest) = rpc_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = rpc_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            rpc_url.to_string()
        };
        Self::new(rpc_url, ws_url)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("mainnet", Network::Mainnet)]
    #[case("mainnet-beta", Network::Mainnet)]
    #[case("Testnet", Network::Testnet)]
    #[case(" devnet ", Network::Devnet)]
    fn parses_network_names(
        #[case] input: &str,
        #[case] expected: Network,
    ) {
        assert_eq!(input.parse::<Network>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_network() {
        assert!(matches!("localnet".parse::<Network>(), Err(ConfigError::UnknownNetwork(_))));
    }

    #[test]
    fn derives_ws_url_from_rpc_url() {
        let endpoints = NetworkEndpoints::from_rpc_url("https://api.testnet.solana.com");
        assert_eq!(endpoints.ws_url, "wss://api.testnet.solana.com");

        let local = NetworkEndpoints::from_rpc_url("http://127.0.0.1:8899");
        assert_eq!(local.ws_url, "ws://127.0.0.1:8899");
    }
}
