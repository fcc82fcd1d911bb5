#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use mustakshif::config::Config;
use mustakshif::config::RpcConfig;
use mustakshif::constants::SYSTEM_PROGRAM_ID;
use mustakshif::model::Network;
use mustakshif::model::NetworkEndpoints;
use mustakshif::rpc::Connector;
use mustakshif::rpc::LedgerTransport;
use mustakshif::rpc::LogHandler;
use mustakshif::rpc::LogNotification;
use mustakshif::rpc::LogStreamEvent;
use mustakshif::rpc::ParsedTransactionRecord;
use mustakshif::rpc::RawAccount;
use mustakshif::rpc::RawInstruction;
use mustakshif::rpc::SignatureRecord;
use mustakshif::rpc::SubscriptionId;
use mustakshif::rpc::TransactionMeta;
use mustakshif::RpcError;
use mustakshif::RpcResult;
use solana_pubkey::Pubkey;
use tokio::time::Instant;

/// Canned ledger contents shared by every transport a connector opens.
#[derive(Default)]
pub struct FakeLedger {
    pub signatures: Mutex<HashMap<Pubkey, Vec<SignatureRecord>>>,
    pub transactions: Mutex<HashMap<String, ParsedTransactionRecord>>,
    pub accounts: Mutex<HashMap<Pubkey, RawAccount>>,
    pub balances: Mutex<HashMap<Pubkey, u64>>,
    pub rent_exempt_minimum: AtomicU64,
    /// Signature lookups fail for these.
    pub broken_signatures: Mutex<Vec<String>>,
    /// Simulated handshake time for every log subscription.
    pub subscribe_delay_ms: AtomicU64,
}

impl FakeLedger {
    pub fn add_signature(
        &self,
        address: &Pubkey,
        record: SignatureRecord,
        transaction: Option<ParsedTransactionRecord>,
    ) {
        if let Some(transaction) = transaction {
            self.transactions.lock().unwrap().insert(record.signature.clone(), transaction);
        }
        self.signatures.lock().unwrap().entry(*address).or_default().push(record);
    }

    pub fn set_account(
        &self,
        address: &Pubkey,
        balance: u64,
        account: Option<RawAccount>,
    ) {
        self.balances.lock().unwrap().insert(*address, balance);
        if let Some(account) = account {
            self.accounts.lock().unwrap().insert(*address, account);
        }
    }
}

/// Listener counts across every transport of one test.
#[derive(Default)]
pub struct ListenerStats {
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
}

impl ListenerStats {
    pub fn active(&self) -> usize { self.active.load(Ordering::SeqCst) }

    pub fn peak(&self) -> usize { self.peak.load(Ordering::SeqCst) }

    fn added(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn removed(&self) { self.active.fetch_sub(1, Ordering::SeqCst); }
}

pub struct FakeTransport {
    pub network: Network,
    ledger: Arc<FakeLedger>,
    stats: Arc<ListenerStats>,
    listeners: Mutex<HashMap<SubscriptionId, (Pubkey, LogHandler)>>,
    next_id: AtomicU64,
    calls: Mutex<Vec<(&'static str, Instant)>>,
}

impl FakeTransport {
    pub fn new(
        network: Network,
        ledger: Arc<FakeLedger>,
        stats: Arc<ListenerStats>,
    ) -> Self {
        Self {
            network,
            ledger,
            stats,
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn listener_count(&self) -> usize { self.listeners.lock().unwrap().len() }

    pub fn call_times(&self) -> Vec<Instant> { self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect() }

    pub fn call_names(&self) -> Vec<&'static str> { self.calls.lock().unwrap().iter().map(|(name, _)| *name).collect() }

    /// Delivers a notification to every listener registered for `address`.
    pub fn emit(
        &self,
        address: &Pubkey,
        notification: LogNotification,
    ) {
        let handlers: Vec<LogHandler> = self
            .listeners
            .lock()
            .unwrap()
            .values()
            .filter(|(target, _)| target == address)
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            handler(LogStreamEvent::Log(notification.clone()));
        }
    }

    /// Ends every stream registered for `address` the way a dropped
    /// websocket does: the listener is gone and its handler hears `Closed`.
    pub fn close_streams(
        &self,
        address: &Pubkey,
    ) {
        let closed: Vec<LogHandler> = {
            let mut listeners = self.listeners.lock().unwrap();
            let ids: Vec<SubscriptionId> =
                listeners.iter().filter(|(_, (target, _))| target == address).map(|(id, _)| *id).collect();
            ids.into_iter().filter_map(|id| listeners.remove(&id)).map(|(_, handler)| handler).collect()
        };

        for handler in closed {
            self.stats.removed();
            handler(LogStreamEvent::Closed {
                reason: "websocket closed by peer".to_string(),
            });
        }
    }

    fn record(
        &self,
        name: &'static str,
    ) {
        self.calls.lock().unwrap().push((name, Instant::now()));
    }
}

#[async_trait]
impl LedgerTransport for FakeTransport {
    async fn list_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> RpcResult<Vec<SignatureRecord>> {
        self.record("list_signatures_for_address");
        let signatures = self.ledger.signatures.lock().unwrap();
        Ok(signatures.get(address).map(|all| all.iter().take(limit).cloned().collect()).unwrap_or_default())
    }

    async fn get_parsed_transaction(
        &self,
        signature: &str,
    ) -> RpcResult<Option<ParsedTransactionRecord>> {
        self.record("get_parsed_transaction");
        if self.ledger.broken_signatures.lock().unwrap().iter().any(|s| s == signature) {
            return Err(RpcError::unreachable(format!("lookup of {} timed out", signature)));
        }
        Ok(self.ledger.transactions.lock().unwrap().get(signature).cloned())
    }

    async fn get_account_info(
        &self,
        address: &Pubkey,
    ) -> RpcResult<Option<RawAccount>> {
        self.record("get_account_info");
        Ok(self.ledger.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_balance(
        &self,
        address: &Pubkey,
    ) -> RpcResult<u64> {
        self.record("get_balance");
        Ok(self.ledger.balances.lock().unwrap().get(address).copied().unwrap_or(0))
    }

    async fn get_minimum_rent_exempt_balance(
        &self,
        _data_length: usize,
    ) -> RpcResult<u64> {
        self.record("get_minimum_rent_exempt_balance");
        Ok(self.ledger.rent_exempt_minimum.load(Ordering::SeqCst))
    }

    async fn subscribe_address_logs(
        &self,
        address: &Pubkey,
        handler: LogHandler,
    ) -> RpcResult<SubscriptionId> {
        self.record("subscribe_address_logs");
        let delay = self.ledger.subscribe_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().insert(id, (*address, handler));
        self.stats.added();
        Ok(id)
    }

    async fn unsubscribe(
        &self,
        subscription_id: SubscriptionId,
    ) -> RpcResult<()> {
        self.record("unsubscribe");
        if self.listeners.lock().unwrap().remove(&subscription_id).is_some() {
            self.stats.removed();
        }
        Ok(())
    }
}

/// Opens a fresh `FakeTransport` per connect and keeps every one it opened.
pub struct FakeConnector {
    pub ledger: Arc<FakeLedger>,
    pub stats: Arc<ListenerStats>,
    opened: Mutex<Vec<Arc<FakeTransport>>>,
    unreachable: Mutex<Vec<Network>>,
}

impl FakeConnector {
    pub fn new(ledger: Arc<FakeLedger>) -> Self {
        Self {
            ledger,
            stats: Arc::new(ListenerStats::default()),
            opened: Mutex::new(Vec::new()),
            unreachable: Mutex::new(Vec::new()),
        }
    }

    pub fn make_unreachable(
        &self,
        network: Network,
    ) {
        self.unreachable.lock().unwrap().push(network);
    }

    pub fn opened(&self) -> Vec<Arc<FakeTransport>> { self.opened.lock().unwrap().clone() }

    pub fn last_opened(&self) -> Arc<FakeTransport> {
        self.opened().last().cloned().expect("no transport opened yet")
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        network: Network,
        endpoints: &NetworkEndpoints,
        _rpc_config: &RpcConfig,
    ) -> RpcResult<Arc<dyn LedgerTransport>> {
        if self.unreachable.lock().unwrap().contains(&network) {
            return Err(RpcError::unreachable(&endpoints.rpc_url));
        }

        let transport = Arc::new(FakeTransport::new(network, self.ledger.clone(), self.stats.clone()));
        self.opened.lock().unwrap().push(transport.clone());
        Ok(transport)
    }
}

pub struct TestFixtures;

impl TestFixtures {
    pub fn new() -> Self { Self }

    /// Deterministic valid address.
    pub fn address(
        &self,
        seed: u8,
    ) -> Pubkey {
        Pubkey::new_from_array([seed; 32])
    }

    pub fn config(
        &self,
        min_call_interval_ms: u64,
    ) -> Config {
        let mut config = Config::default();
        config.rpc.min_call_interval_ms = min_call_interval_ms;
        config
    }

    pub fn signature(
        &self,
        n: usize,
        block_time_seconds: Option<i64>,
    ) -> SignatureRecord {
        SignatureRecord {
            signature: format!("sig-{:03}", n),
            block_time_seconds,
            slot: 1_000 + n as u64,
            err: None,
        }
    }

    pub fn transfer_record(
        &self,
        from: &Pubkey,
        to: &Pubkey,
        lamports: u64,
    ) -> ParsedTransactionRecord {
        ParsedTransactionRecord {
            slot: 1,
            block_time_seconds: Some(1_700_000_000),
            meta: Some(TransactionMeta { err: None, fee: 5_000 }),
            instructions: vec![RawInstruction::Transfer {
                source: from.to_string(),
                destination: to.to_string(),
                lamports,
            }],
        }
    }

    pub fn pending_record(&self) -> ParsedTransactionRecord {
        ParsedTransactionRecord {
            slot: 1,
            block_time_seconds: None,
            meta: None,
            instructions: vec![RawInstruction::Opaque {
                program_id: SYSTEM_PROGRAM_ID.to_string(),
            }],
        }
    }

    pub fn log(
        &self,
        signature: &str,
        err: Option<&str>,
    ) -> LogNotification {
        LogNotification {
            signature: signature.to_string(),
            err: err.map(str::to_string),
            logs: vec!["Program 11111111111111111111111111111111 invoke [1]".to_string()],
        }
    }
}
