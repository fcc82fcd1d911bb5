use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::constants::DEVNET_RPC_URL;
use crate::constants::MAINNET_RPC_URL;
use crate::constants::TESTNET_RPC_URL;
use crate::error::ConfigError;
use crate::model::Network;
use crate::model::NetworkEndpoints;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Network selected on first access to the connection manager.
    pub default: Network,
    pub mainnet_rpc_url: Option<String>,
    pub mainnet_ws_url: Option<String>,
    pub testnet_rpc_url: Option<String>,
    pub testnet_ws_url: Option<String>,
    pub devnet_rpc_url: Option<String>,
    pub devnet_ws_url: Option<String>,
}

impl NetworkConfig {
    fn overrides(
        &self,
        network: Network,
    ) -> (Option<&String>, Option<&String>) {
        match network {
            Network::Mainnet => (self.mainnet_rpc_url.as_ref(), self.mainnet_ws_url.as_ref()),
            Network::Testnet => (self.testnet_rpc_url.as_ref(), self.testnet_ws_url.as_ref()),
            Network::Devnet => (self.devnet_rpc_url.as_ref(), self.devnet_ws_url.as_ref()),
        }
    }
}

/// Supported networks and their endpoint pairs. Immutable after construction.
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    default: Network,
    endpoints: HashMap<Network, NetworkEndpoints>,
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        let endpoints = Network::ALL
            .into_iter()
            .map(|network| (network, NetworkEndpoints::from_rpc_url(default_rpc_url(network))))
            .collect();

        Self {
            default: Network::default(),
            endpoints,
        }
    }
}

impl NetworkRegistry {
    /// Resolution order per network: environment (`MUSTAKSHIF_<NETWORK>_RPC_URL`,
    /// `MUSTAKSHIF_<NETWORK>_WS_URL`), then the config file, then the public
    /// endpoint. A missing ws url is derived from the rpc url.
    pub fn from_config(config: &NetworkConfig) -> Result<Self, ConfigError> {
        let mut endpoints = HashMap::new();

        for network in Network::ALL {
            let (file_rpc, file_ws) = config.overrides(network);
            let rpc_url = env_override(network, "RPC_URL")
                .or_else(|| file_rpc.cloned())
                .unwrap_or_else(|| default_rpc_url(network).to_string());
            let ws_url = env_override(network, "WS_URL").or_else(|| file_ws.cloned());

            let resolved = match ws_url {
                Some(ws_url) => NetworkEndpoints::new(rpc_url, ws_url),
                None => NetworkEndpoints::from_rpc_url(&rpc_url),
            };

            validate_url(network, &resolved.rpc_url, &["http", "https"])?;
            validate_url(network, &resolved.ws_url, &["ws", "wss"])?;

            debug!("network_registry::{}::rpc::{}::ws::{}", network, resolved.rpc_url, resolved.ws_url);
            endpoints.insert(network, resolved);
        }

        Ok(Self {
            default: config.default,
            endpoints,
        })
    }

    pub fn default_network(&self) -> Network { self.default }

    pub fn endpoints(
        &self,
        network: Network,
    ) -> &NetworkEndpoints {
        // every variant is inserted at construction
        &self.endpoints[&network]
    }

    pub fn networks(&self) -> impl Iterator<Item = Network> + '_ {
        Network::ALL.into_iter().filter(|n| self.endpoints.contains_key(n))
    }
}

fn default_rpc_url(network: Network) -> &'static str {
    match network {
        Network::Mainnet => MAINNET_RPC_URL,
        Network::Testnet => TESTNET_RPC_URL,
        Network::Devnet => DEVNET_RPC_URL,
    }
}

fn env_override(
    network: Network,
    suffix: &str,
) -> Option<String> {
    let key = format!("MUSTAKSHIF_{}_{}", network.as_str().to_ascii_uppercase(), suffix);
    dotenvy::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn validate_url(
    network: Network,
    raw: &str,
    schemes: &[&str],
) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidEndpoint {
        network: network.to_string(),
        url: raw.to_string(),
    };

    let parsed = Url::parse(raw).map_err(|_| invalid())?;
    if !schemes.contains(&parsed.scheme()) {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_uses_public_endpoints() {
        let registry = NetworkRegistry::default();
        assert_eq!(registry.default_network(), Network::Testnet);
        assert_eq!(registry.endpoints(Network::Mainnet).rpc_url, "https://api.mainnet-beta.solana.com");
        assert_eq!(registry.endpoints(Network::Mainnet).ws_url, "wss://api.mainnet-beta.solana.com");
        assert_eq!(registry.networks().count(), 3);
    }

    #[test]
    fn file_overrides_are_applied() {
        let config = NetworkConfig {
            default: Network::Devnet,
            devnet_rpc_url: Some("http://127.0.0.1:8899".to_string()),
            devnet_ws_url: Some("ws://127.0.0.1:8900".to_string()),
            ..NetworkConfig::default()
        };

        let registry = temp_env::with_vars_unset(
            ["MUSTAKSHIF_DEVNET_RPC_URL", "MUSTAKSHIF_DEVNET_WS_URL"],
            || NetworkRegistry::from_config(&config).unwrap(),
        );

        assert_eq!(registry.default_network(), Network::Devnet);
        assert_eq!(registry.endpoints(Network::Devnet), &NetworkEndpoints::new(
            "http://127.0.0.1:8899",
            "ws://127.0.0.1:8900"
        ));
    }

    #[test]
    fn environment_wins_over_file() {
        let config = NetworkConfig {
            mainnet_rpc_url: Some("https://file.example.com".to_string()),
            ..NetworkConfig::default()
        };

        let registry = temp_env::with_vars(
            [
                ("MUSTAKSHIF_MAINNET_RPC_URL", Some("https://env.example.com")),
                ("MUSTAKSHIF_MAINNET_WS_URL", None),
            ],
            || NetworkRegistry::from_config(&config).unwrap(),
        );

        assert_eq!(registry.endpoints(Network::Mainnet).rpc_url, "https://env.example.com");
        assert_eq!(registry.endpoints(Network::Mainnet).ws_url, "wss://env.example.com");
    }

    #[test]
    fn rejects_endpoint_with_wrong_scheme() {
        let config = NetworkConfig {
            testnet_ws_url: Some("https://not-a-socket.example.com".to_string()),
            ..NetworkConfig::default()
        };

        let result = temp_env::with_vars_unset(
            ["MUSTAKSHIF_TESTNET_RPC_URL", "MUSTAKSHIF_TESTNET_WS_URL"],
            || NetworkRegistry::from_config(&config),
        );

        assert!(matches!(result, Err(ConfigError::InvalidEndpoint { .. })));
    }
}
