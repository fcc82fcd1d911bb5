use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::Config;
use crate::config::NetworkRegistry;
use crate::config::load_config;
use crate::error::Result;
use crate::err_with_loc;
use crate::handler::AddressOverview;
use crate::handler::ShutdownSignal;
use crate::handler::SubscriptionManager;
use crate::handler::TransactionFetcher;
use crate::model::EventCallback;
use crate::model::GraphData;
use crate::model::LiveEvent;
use crate::model::Network;
use crate::model::NetworkActivity;
use crate::model::aggregate;
use crate::rpc::ConnectionManager;
use crate::rpc::Connector;
use crate::rpc::SolanaConnector;
use crate::rpc::parse_address;
use crate::tracing::setup_tracing;

pub const ENGINE_NAME: &str = "mustakshif";

/// Explore a Solana address: account state, recent transfers and the
/// transfer graph around it, optionally following live activity.
#[derive(Debug, Clone, Parser)]
#[command(name = "mustakshif", version, about)]
pub struct MustakshifArgs {
    /// Base58 address to explore
    pub address: String,

    /// mainnet, testnet or devnet. Defaults to the configured network.
    #[arg(short, long)]
    pub network: Option<Network>,

    #[arg(short, long, default_value = "Config.toml")]
    pub config: PathBuf,

    /// Overrides `[fetcher] page_limit`
    #[arg(short = 'l', long)]
    pub page_limit: Option<usize>,

    /// Keep running and refresh on every new transaction until ctrl-c
    #[arg(short, long)]
    pub follow: bool,
}

/// One snapshot of everything known about an address.
#[derive(Debug, Serialize)]
pub struct ExplorerReport {
    pub network: Network,
    #[serde(flatten)]
    pub overview: AddressOverview,
    pub graph: GraphData,
    pub recent_network_activity: Option<Vec<NetworkActivity>>,
}

pub struct Mustakshif {
    pub config: Config,
    pub connections: Arc<ConnectionManager>,
    pub fetcher: TransactionFetcher,
    pub subscriptions: Arc<SubscriptionManager>,
    pub shutdown: ShutdownSignal,
}

impl Mustakshif {
    pub fn new(config: Config) -> Result<Self> { Self::with_connector(config, Arc::new(SolanaConnector)) }

    pub fn with_connector(
        config: Config,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let registry = NetworkRegistry::from_config(&config.network)?;
        let connections = Arc::new(ConnectionManager::new(registry, config.rpc.clone(), connector));
        let fetcher = TransactionFetcher::new(connections.clone(), config.fetcher.clone());
        let subscriptions = SubscriptionManager::new(connections.clone());

        Ok(Self {
            config,
            connections,
            fetcher,
            subscriptions,
            shutdown: ShutdownSignal::new(),
        })
    }

    pub async fn run(args: MustakshifArgs) -> Result<()> {
        let config = if args.config.exists() {
            load_config(&args.config)?
        } else {
            Config::default()
        };

        let _tracing = setup_tracing(&config.logging, ENGINE_NAME)?;
        info!("Starting Mustakshif (مستكشف): The Explorer");
        if !args.config.exists() {
            warn!("config_not_found::{}::using_defaults", args.config.display());
        }

        let engine = Self::new(config)?;
        let network = args.network.unwrap_or_else(|| engine.connections.registry().default_network());
        let page_limit = args.page_limit.unwrap_or(engine.config.fetcher.page_limit);

        engine.connections.select_network(network).await?;

        let report = engine.explore(&args.address, page_limit).await?;
        print_report(&report)?;

        if args.follow {
            let ctrl_c_shutdown = engine.shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("mustakshif::ctrl_c_received");
                }
                ctrl_c_shutdown.shutdown();
            });

            engine.follow(&args.address, page_limit, |report| print_report(&report)).await?;
        }

        info!("mustakshif::run::finished");
        Ok(())
    }

    /// Fetches the overview and recent network activity on the current
    /// network and folds the history into a graph. Only an invalid address
    /// or a failed connection is an error; fetch failures are reported inside
    /// the overview.
    pub async fn explore(
        &self,
        address: &str,
        page_limit: usize,
    ) -> Result<ExplorerReport> {
        parse_address(address).map_err(|e| err_with_loc!(e))?;
        let connection = self.connections.current_connection().await?;

        let (overview, recent) = futures::join!(
            self.fetcher.fetch_overview(address, page_limit),
            self.fetcher.fetch_recent_network_activity(self.config.fetcher.recent_activity_limit)
        );

        let graph = match &overview.history {
            Ok(transactions) => aggregate(transactions),
            Err(_) => GraphData::default(),
        };

        let recent_network_activity = match recent {
            Ok(activity) => Some(activity),
            Err(e) => {
                error!("recent_network_activity_failed::{}::error::{}", connection.network(), e);
                None
            },
        };

        info!(
            "explored::{}::network::{}::nodes::{}::edges::{}",
            address,
            connection.network(),
            graph.nodes.len(),
            graph.edges.len()
        );

        Ok(ExplorerReport {
            network: connection.network(),
            overview,
            graph,
            recent_network_activity,
        })
    }

    /// Subscribes to `address` and re-explores it on every live event until
    /// the shutdown signal fires. The subscription is removed before returning.
    pub async fn follow<F>(
        &self,
        address: &str,
        page_limit: usize,
        mut on_report: F,
    ) -> Result<()>
    where
        F: FnMut(ExplorerReport) -> Result<()>,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<LiveEvent>();
        let on_event: EventCallback = Arc::new(move |event: LiveEvent| {
            if tx.send(event).is_err() {
                debug!("live_event_receiver_closed");
            }
        });

        let handle = self.subscriptions.subscribe(address, on_event.clone()).await?;
        info!("following::{}::{}", address, handle);

        let outcome: Result<()> = loop {
            tokio::select! {
                _ = self.shutdown.wait_for_shutdown() => break Ok(()),
                _ = self.subscriptions.wait_for_stream_loss() => {
                    if self.subscriptions.is_subscribed().await {
                        continue;
                    }
                    warn!("live_stream_lost::{}::resubscribing", address);
                    match self.subscriptions.subscribe(address, on_event.clone()).await {
                        Ok(handle) => info!("following::{}::{}", address, handle),
                        Err(e) => {
                            error!("resubscribe_failed::{}::error::{}", address, e);
                            break Err(e.into());
                        },
                    }
                }
                event = rx.recv() => {
                    let Some(event) = event else { break Ok(()) };
                    info!("live_event::{}::kind::{}", event.signature, event.kind);

                    // events that queued up while exploring are covered by one refresh
                    while rx.try_recv().is_ok() {}

                    match self.explore(address, page_limit).await {
                        Ok(report) => {
                            if let Err(e) = on_report(report) {
                                break Err(e);
                            }
                        },
                        Err(e) => break Err(e),
                    }
                }
            }
        };

        self.subscriptions.unsubscribe().await;
        info!("stopped_following::{}", address);
        outcome
    }
}

fn print_report(report: &ExplorerReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{}", json);
    Ok(())
}
