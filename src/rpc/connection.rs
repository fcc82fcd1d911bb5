use std::fmt;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::MutexGuard;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::rate_limiter::RateLimiter;
use super::solana::SolanaTransport;
use super::transport::LedgerTransport;
use crate::config::NetworkRegistry;
use crate::config::RpcConfig;
use crate::error::RpcResult;
use crate::model::Network;
use crate::model::NetworkEndpoints;

/// A transport handle bound to one network, with the rate limiter that
/// paces every call made through it. Cheap to clone.
#[derive(Clone)]
pub struct Connection {
    id: u64,
    network: Network,
    endpoints: NetworkEndpoints,
    transport: Arc<dyn LedgerTransport>,
    rate_limiter: Arc<RateLimiter>,
}

impl Connection {
    pub fn id(&self) -> u64 { self.id }

    pub fn network(&self) -> Network { self.network }

    pub fn endpoints(&self) -> &NetworkEndpoints { &self.endpoints }

    pub fn transport(&self) -> &Arc<dyn LedgerTransport> { &self.transport }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> { &self.rate_limiter }
}

impl fmt::Debug for Connection {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("network", &self.network)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

/// Opens transports. Swapped for an in-memory double in tests.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        network: Network,
        endpoints: &NetworkEndpoints,
        rpc_config: &RpcConfig,
    ) -> RpcResult<Arc<dyn LedgerTransport>>;
}

pub struct SolanaConnector;

#[async_trait]
impl Connector for SolanaConnector {
    async fn connect(
        &self,
        network: Network,
        endpoints: &NetworkEndpoints,
        rpc_config: &RpcConfig,
    ) -> RpcResult<Arc<dyn LedgerTransport>> {
        debug!("solana_connector::connect::{}::{}", network, endpoints.rpc_url);
        Ok(Arc::new(SolanaTransport::new(endpoints, rpc_config)))
    }
}

/// Called with the outgoing connection before a network switch discards it.
#[async_trait]
pub trait TeardownHook: Send + Sync {
    async fn before_network_switch(
        &self,
        outgoing: &Connection,
    );
}

/// Owner of the single live connection.
pub struct ConnectionManager {
    registry: NetworkRegistry,
    rpc_config: RpcConfig,
    connector: Arc<dyn Connector>,
    current: Mutex<Option<Connection>>,
    hooks: std::sync::Mutex<Vec<Weak<dyn TeardownHook>>>,
    next_id: AtomicU64,
}

impl ConnectionManager {
    pub fn new(
        registry: NetworkRegistry,
        rpc_config: RpcConfig,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            registry,
            rpc_config,
            connector,
            current: Mutex::new(None),
            hooks: std::sync::Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_solana(
        registry: NetworkRegistry,
        rpc_config: RpcConfig,
    ) -> Self {
        Self::new(registry, rpc_config, Arc::new(SolanaConnector))
    }

    pub fn registry(&self) -> &NetworkRegistry { &self.registry }

    pub fn register_teardown_hook(
        &self,
        hook: Weak<dyn TeardownHook>,
    ) {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner).push(hook);
    }

    /// Switches to `network`. Asking for the current network returns the
    /// live connection untouched. Otherwise the new transport is opened
    /// first, teardown hooks run against the old one, then it is replaced.
    pub async fn select_network(
        &self,
        network: Network,
    ) -> RpcResult<Connection> {
        let mut current = self.current.lock().await;

        if let Some(connection) = current.as_ref() {
            if connection.network == network {
                debug!("select_network::already_on::{}::connection::{}", network, connection.id);
                return Ok(connection.clone());
            }
        }

        let next = self.open(network).await?;

        if let Some(outgoing) = current.as_ref() {
            info!("select_network::switching::{}::to::{}", outgoing.network, network);
            self.run_teardown_hooks(outgoing).await;
        }

        *current = Some(next.clone());
        Ok(next)
    }

    /// The live connection, opening the configured default network on first use.
    pub async fn current_connection(&self) -> RpcResult<Connection> {
        let mut current = self.current.lock().await;
        self.ensure_initialized(&mut current).await
    }

    async fn ensure_initialized(
        &self,
        current: &mut MutexGuard<'_, Option<Connection>>,
    ) -> RpcResult<Connection> {
        if let Some(connection) = current.as_ref() {
            return Ok(connection.clone());
        }

        let network = self.registry.default_network();
        debug!("connection_manager::lazy_init::{}", network);
        let connection = self.open(network).await?;
        **current = Some(connection.clone());
        Ok(connection)
    }

    async fn open(
        &self,
        network: Network,
    ) -> RpcResult<Connection> {
        let endpoints = self.registry.endpoints(network).clone();
        let transport = self.connector.connect(network, &endpoints, &self.rpc_config).await.map_err(|e| {
            error!("connect_failed::{}::{}::error::{}", network, endpoints.rpc_url, e);
            e
        })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!("connection_opened::{}::id::{}::rpc::{}", network, id, endpoints.rpc_url);

        Ok(Connection {
            id,
            network,
            endpoints,
            transport,
            rate_limiter: Arc::new(RateLimiter::new(self.rpc_config.min_call_interval())),
        })
    }

    async fn run_teardown_hooks(
        &self,
        outgoing: &Connection,
    ) {
        // a panicked registrant must not cost the other hooks their teardown
        let hooks: Vec<Arc<dyn TeardownHook>> = {
            let mut hooks = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
            hooks.retain(|hook| hook.strong_count() > 0);
            hooks.iter().filter_map(Weak::upgrade).collect()
        };

        for hook in hooks {
            hook.before_network_switch(outgoing).await;
        }
    }
}
