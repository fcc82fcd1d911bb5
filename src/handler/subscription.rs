use std::fmt;
use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use solana_pubkey::Pubkey;
use tokio::sync::Mutex;
use tokio::sync::Notify;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::constants::DEFAULT_EVENT_KIND;
use crate::error::RpcError;
use crate::error::RpcResult;
use crate::model::EventCallback;
use crate::model::LiveEvent;
use crate::model::Network;
use crate::rpc::Connection;
use crate::rpc::ConnectionManager;
use crate::rpc::LogHandler;
use crate::rpc::LogStreamEvent;
use crate::rpc::SubscriptionId;
use crate::rpc::TeardownHook;
use crate::rpc::parse_address;
use crate::utils::now_millis;

const MAX_REGISTRATION_ATTEMPTS: usize = 3;

/// Identifies one live subscription handed out by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn id(&self) -> u64 { self.0 }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSubscription {
    pub handle: SubscriptionHandle,
    pub address: String,
    pub network: Network,
    pub connection_id: u64,
}

enum SubscriptionState {
    Idle,
    /// A listener is being registered without the connection lock held.
    /// `stale` is set when the connection it targets is switched away from
    /// or its stream closes before registration finishes.
    Pending {
        handle: SubscriptionHandle,
        generation: u64,
        connection_id: u64,
        stale: bool,
    },
    Subscribed {
        handle: SubscriptionHandle,
        generation: u64,
        address: String,
        transport_id: SubscriptionId,
        connection: Connection,
    },
}

impl SubscriptionState {
    /// `Some(stale)` when this is the pending registration for `handle`.
    fn pending_for(
        &self,
        handle: SubscriptionHandle,
    ) -> Option<bool> {
        match self {
            SubscriptionState::Pending {
                handle: pending,
                stale,
                ..
            } if *pending == handle => Some(*stale),
            _ => None,
        }
    }
}

/// Keeps at most one live log subscription.
///
/// Transitions: `subscribe` from Idle, `subscribe` while Subscribed (rebind:
/// the old listener is removed before the new one is registered), and
/// `unsubscribe` back to Idle. A network switch tears the listener down
/// through the `TeardownHook` impl before the old transport is dropped.
/// A stream that ends on its own returns the manager to Idle and wakes
/// `wait_for_stream_loss`.
///
/// Registration runs with neither the connection lock nor the state lock
/// held, so fetches and switches never queue behind a slow handshake. A
/// switch that lands mid-registration marks it stale and it is redone on
/// the live connection.
pub struct SubscriptionManager {
    connections: Arc<ConnectionManager>,
    state: Mutex<SubscriptionState>,
    // one registration in flight at a time
    setup: Mutex<()>,
    // generation allowed to deliver events, 0 when idle
    active: Arc<AtomicU64>,
    next_id: AtomicU64,
    stream_lost: Notify,
    this: Weak<SubscriptionManager>,
}

impl SubscriptionManager {
    pub fn new(connections: Arc<ConnectionManager>) -> Arc<Self> {
        let manager = Arc::new_cyclic(|this| Self {
            connections: connections.clone(),
            state: Mutex::new(SubscriptionState::Idle),
            setup: Mutex::new(()),
            active: Arc::new(AtomicU64::new(0)),
            next_id: AtomicU64::new(1),
            stream_lost: Notify::new(),
            this: this.clone(),
        });

        let hook: Weak<dyn TeardownHook> = Arc::downgrade(&manager) as Weak<dyn TeardownHook>;
        connections.register_teardown_hook(hook);

        manager
    }

    pub async fn subscribe(
        &self,
        address: &str,
        on_event: EventCallback,
    ) -> RpcResult<SubscriptionHandle> {
        let pubkey = parse_address(address)?;
        let _setup = self.setup.lock().await;

        let handle = SubscriptionHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut state = self.state.lock().await;
            if matches!(*state, SubscriptionState::Subscribed { .. }) {
                debug!("subscribe::rebinding::{}", address);
                self.teardown(&mut state).await;
            }
            *state = SubscriptionState::Pending {
                handle,
                generation: 0,
                connection_id: 0,
                stale: true,
            };
        }

        let registered = self.register(handle, address, &pubkey, on_event).await;
        if registered.is_err() {
            let mut state = self.state.lock().await;
            if state.pending_for(handle).is_some() {
                *state = SubscriptionState::Idle;
                self.active.store(0, Ordering::Release);
            }
        }

        registered.map(|()| handle)
    }

    async fn register(
        &self,
        handle: SubscriptionHandle,
        address: &str,
        pubkey: &Pubkey,
        on_event: EventCallback,
    ) -> RpcResult<()> {
        for attempt in 1..=MAX_REGISTRATION_ATTEMPTS {
            let connection = self.connections.current_connection().await?;
            let generation = self.next_id.fetch_add(1, Ordering::Relaxed);

            {
                let mut state = self.state.lock().await;
                if state.pending_for(handle).is_none() {
                    debug!("subscribe::superseded::{}", handle);
                    return Err(RpcError::Superseded);
                }
                *state = SubscriptionState::Pending {
                    handle,
                    generation,
                    connection_id: connection.id(),
                    stale: false,
                };
                self.active.store(generation, Ordering::Release);
            }

            let handler = self.make_handler(handle, generation, on_event.clone());
            connection.rate_limiter().acquire().await;
            let registered = connection.transport().subscribe_address_logs(pubkey, handler).await;

            let still_current =
                matches!(self.connections.current_connection().await, Ok(live) if live.id() == connection.id());

            let mut state = self.state.lock().await;
            let Some(stale) = state.pending_for(handle) else {
                drop(state);
                if let Ok(transport_id) = registered {
                    Self::release(&connection, handle, address, transport_id).await;
                }
                debug!("subscribe::superseded::{}", handle);
                return Err(RpcError::Superseded);
            };
            let stale = stale || !still_current;

            match registered {
                Ok(transport_id) if !stale => {
                    info!("subscribed::{}::address::{}::network::{}", handle, address, connection.network());
                    *state = SubscriptionState::Subscribed {
                        handle,
                        generation,
                        address: address.to_string(),
                        transport_id,
                        connection,
                    };
                    return Ok(());
                },
                Ok(transport_id) => {
                    drop(state);
                    Self::release(&connection, handle, address, transport_id).await;
                },
                Err(e) if !stale => {
                    error!("subscribe_failed::address::{}::error::{}", address, e);
                    return Err(e);
                },
                Err(e) => {
                    drop(state);
                    debug!("subscribe::stale_attempt_failed::{}::error::{}", handle, e);
                },
            }

            debug!("subscribe::retrying::{}::attempt::{}", handle, attempt);
        }

        error!("subscribe_failed::address::{}::error::connection kept changing", address);
        Err(RpcError::unreachable("connection changed during every subscription attempt"))
    }

    /// Removes the live listener if there is one and cancels a registration
    /// still in flight. Calling it while idle is a no-op.
    pub async fn unsubscribe(&self) {
        let mut state = self.state.lock().await;
        if let SubscriptionState::Pending { handle, .. } = *state {
            debug!("unsubscribe::cancelled_pending::{}", handle);
            *state = SubscriptionState::Idle;
            self.active.store(0, Ordering::Release);
            return;
        }
        self.teardown(&mut state).await;
    }

    pub async fn current(&self) -> Option<ActiveSubscription> {
        match &*self.state.lock().await {
            SubscriptionState::Idle | SubscriptionState::Pending { .. } => None,
            SubscriptionState::Subscribed {
                handle,
                address,
                connection,
                ..
            } => Some(ActiveSubscription {
                handle: *handle,
                address: address.clone(),
                network: connection.network(),
                connection_id: connection.id(),
            }),
        }
    }

    pub async fn is_subscribed(&self) -> bool { self.current().await.is_some() }

    /// Resolves once a live stream has ended without being unsubscribed.
    /// A loss that happened before the call is reported immediately.
    pub async fn wait_for_stream_loss(&self) { self.stream_lost.notified().await }

    fn make_handler(
        &self,
        handle: SubscriptionHandle,
        generation: u64,
        on_event: EventCallback,
    ) -> LogHandler {
        let active = self.active.clone();
        let this = self.this.clone();
        Arc::new(move |event: LogStreamEvent| {
            if active.load(Ordering::Acquire) != generation {
                debug!("stale_log_event::{}::generation::{}", handle, generation);
                return;
            }

            let notification = match event {
                LogStreamEvent::Log(notification) => notification,
                LogStreamEvent::Closed { reason } => {
                    warn!("log_stream_closed::{}::reason::{}", handle, reason);
                    let Some(manager) = this.upgrade() else {
                        return;
                    };
                    match tokio::runtime::Handle::try_current() {
                        Ok(runtime) => {
                            runtime.spawn(async move { manager.on_stream_closed(generation).await });
                        },
                        Err(e) => error!("log_stream_closed::no_runtime::{}::error::{}", handle, e),
                    }
                    return;
                },
            };

            if notification.err.is_some() {
                debug!("failed_log_event_dropped::signature::{}", notification.signature);
                return;
            }

            let kind = notification
                .logs
                .into_iter()
                .next()
                .filter(|line| !line.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT_KIND.to_string());

            on_event(LiveEvent {
                signature: notification.signature,
                timestamp_millis: now_millis(),
                kind,
            });
        })
    }

    async fn on_stream_closed(
        &self,
        closed: u64,
    ) {
        let mut state = self.state.lock().await;
        let lost = match &mut *state {
            SubscriptionState::Pending {
                generation,
                stale,
                ..
            } if *generation == closed => {
                *stale = true;
                false
            },
            SubscriptionState::Subscribed {
                generation,
                handle,
                address,
                ..
            } if *generation == closed => {
                info!("subscription_lost::{}::address::{}", handle, address);
                true
            },
            _ => {
                debug!("log_stream_closed::already_released::generation::{}", closed);
                false
            },
        };

        if lost {
            *state = SubscriptionState::Idle;
            self.active.store(0, Ordering::Release);
            self.stream_lost.notify_one();
        }
    }

    async fn teardown(
        &self,
        state: &mut SubscriptionState,
    ) {
        let SubscriptionState::Subscribed {
            handle,
            address,
            transport_id,
            connection,
            ..
        } = std::mem::replace(state, SubscriptionState::Idle)
        else {
            return;
        };

        self.active.store(0, Ordering::Release);
        Self::release(&connection, handle, &address, transport_id).await;
    }

    async fn release(
        connection: &Connection,
        handle: SubscriptionHandle,
        address: &str,
        transport_id: SubscriptionId,
    ) {
        if let Err(e) = connection.transport().unsubscribe(transport_id).await {
            error!("unsubscribe_failed::{}::address::{}::error::{}", handle, address, e);
        } else {
            info!("unsubscribed::{}::address::{}::network::{}", handle, address, connection.network());
        }
    }
}

#[async_trait]
impl TeardownHook for SubscriptionManager {
    async fn before_network_switch(
        &self,
        outgoing: &Connection,
    ) {
        let mut state = self.state.lock().await;
        let bound_to_outgoing = matches!(
            &*state,
            SubscriptionState::Subscribed { connection, .. } if connection.id() == outgoing.id()
        );

        if bound_to_outgoing {
            debug!("network_switch::tearing_down_subscription::{}", outgoing.network());
            self.teardown(&mut state).await;
            return;
        }

        if let SubscriptionState::Pending {
            handle,
            connection_id,
            stale,
            ..
        } = &mut *state
        {
            if *connection_id == outgoing.id() {
                debug!("network_switch::invalidating_pending::{}::{}", handle, outgoing.network());
                *stale = true;
                self.active.store(0, Ordering::Release);
            }
        }
    }
}
