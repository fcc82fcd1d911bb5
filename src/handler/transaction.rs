use std::sync::Arc;

use futures::StreamExt;
use futures::TryStreamExt;
use futures::stream;
use serde::Serialize;
use solana_pubkey::Pubkey;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::config::FetcherConfig;
use crate::constants::SYSTEM_PROGRAM_ID;
use crate::error::RpcError;
use crate::error::RpcResult;
use crate::model::AccountInfo;
use crate::model::NetworkActivity;
use crate::model::Transaction;
use crate::model::TransactionStatus;
use crate::rpc::Connection;
use crate::rpc::ConnectionManager;
use crate::rpc::ParsedTransactionRecord;
use crate::rpc::RawInstruction;
use crate::rpc::SignatureRecord;
use crate::rpc::parse_address;
use crate::utils::block_time_to_millis;
use crate::utils::lamports_to_sol;

/// Account info and history fetched independently; one failing does not
/// hide the other.
#[derive(Debug, Serialize)]
pub struct AddressOverview {
    pub address: String,
    #[serde(serialize_with = "serialize_outcome")]
    pub account: RpcResult<AccountInfo>,
    #[serde(serialize_with = "serialize_outcome")]
    pub history: RpcResult<Vec<Transaction>>,
}

fn serialize_outcome<T, S>(
    outcome: &RpcResult<T>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: serde::Serializer,
{
    match outcome {
        Ok(value) => serde_json::json!({ "ok": value }).serialize(serializer),
        Err(e) => serde_json::json!({ "error": e.to_string() }).serialize(serializer),
    }
}

/// Retrieves and normalizes ledger data for an address. Every transport call
/// goes through the current connection's rate limiter.
pub struct TransactionFetcher {
    connections: Arc<ConnectionManager>,
    config: FetcherConfig,
}

impl TransactionFetcher {
    pub fn new(
        connections: Arc<ConnectionManager>,
        config: FetcherConfig,
    ) -> Self {
        Self { connections, config }
    }

    pub fn config(&self) -> &FetcherConfig { &self.config }

    pub async fn fetch_account_info(
        &self,
        address: &str,
    ) -> RpcResult<AccountInfo> {
        let pubkey = parse_address(address)?;
        let connection = self.connections.current_connection().await?;
        let transport = connection.transport();

        connection.rate_limiter().acquire().await;
        let account = transport.get_account_info(&pubkey).await?;

        connection.rate_limiter().acquire().await;
        let balance = transport.get_balance(&pubkey).await?;

        connection.rate_limiter().acquire().await;
        let rent_exempt_minimum = transport.get_minimum_rent_exempt_balance(0).await?;

        let (executable, owner, data_length) = match account {
            Some(raw) => (raw.executable, raw.owner, raw.data_length),
            None => {
                debug!("account_not_found::{}::using_empty_state", address);
                (false, String::new(), 0)
            },
        };

        Ok(AccountInfo::new(balance, executable, owner, data_length, rent_exempt_minimum))
    }

    /// Up to `page_limit` most recent transactions, newest first. Records
    /// without execution metadata are skipped; any failed call aborts the
    /// whole fetch.
    pub async fn fetch_history(
        &self,
        address: &str,
        page_limit: usize,
    ) -> RpcResult<Vec<Transaction>> {
        let pubkey = parse_address(address)?;
        let connection = self.connections.current_connection().await?;
        let signatures = list_signatures(&connection, &pubkey, page_limit).await?;

        debug!("fetched_signatures::count::{}::account::{}", signatures.len(), address);

        let concurrency = self.config.max_concurrent_requests.max(1);
        let records: Vec<Option<Transaction>> = stream::iter(signatures)
            .map(|sig| {
                let connection = connection.clone();
                async move {
                    connection.rate_limiter().acquire().await;
                    let record = connection.transport().get_parsed_transaction(&sig.signature).await?;
                    Ok::<_, RpcError>(record.and_then(|record| normalize_transaction(address, &sig, record)))
                }
            })
            .buffered(concurrency)
            .try_collect()
            .await
            .map_err(|e| {
                error!("fetch_history_failed::account::{}::error::{}", address, e);
                e
            })?;

        let transactions: Vec<Transaction> = records.into_iter().flatten().collect();
        info!("fetched_history::account::{}::transactions::{}", address, transactions.len());

        Ok(transactions)
    }

    pub async fn fetch_history_default(
        &self,
        address: &str,
    ) -> RpcResult<Vec<Transaction>> {
        self.fetch_history(address, self.config.page_limit).await
    }

    /// Latest signatures touching the system program, without detail fetches.
    pub async fn fetch_recent_network_activity(
        &self,
        limit: usize,
    ) -> RpcResult<Vec<NetworkActivity>> {
        let connection = self.connections.current_connection().await?;
        let signatures = list_signatures(&connection, &SYSTEM_PROGRAM_ID, limit).await?;

        Ok(signatures
            .into_iter()
            .map(|sig| NetworkActivity {
                timestamp_millis: block_time_to_millis(sig.block_time_seconds),
                status: TransactionStatus::from_error(sig.err.as_ref()),
                signature: sig.signature,
            })
            .collect())
    }

    /// Runs the account and history fetches side by side and reports each
    /// outcome on its own.
    pub async fn fetch_overview(
        &self,
        address: &str,
        page_limit: usize,
    ) -> AddressOverview {
        let (account, history) =
            futures::join!(self.fetch_account_info(address), self.fetch_history(address, page_limit));

        if let Err(e) = &account {
            error!("fetch_account_info_failed::account::{}::error::{}", address, e);
        }

        AddressOverview {
            address: address.to_string(),
            account,
            history,
        }
    }
}

async fn list_signatures(
    connection: &Connection,
    address: &Pubkey,
    limit: usize,
) -> RpcResult<Vec<SignatureRecord>> {
    connection.rate_limiter().acquire().await;
    connection.transport().list_signatures_for_address(address, limit).await.map_err(|e| {
        error!("list_signatures_failed::account::{}::error::{}", address, e);
        e
    })
}

/// Turns one raw record into the transfer model. Returns `None` when the
/// record has no execution metadata yet.
pub fn normalize_transaction(
    queried_address: &str,
    sig: &SignatureRecord,
    record: ParsedTransactionRecord,
) -> Option<Transaction> {
    let Some(meta) = record.meta else {
        debug!("meta_missing::signature::{}::skipping", sig.signature);
        return None;
    };

    let block_time = sig.block_time_seconds.or(record.block_time_seconds);

    let (from_address, to_address, amount, program_id) = match record.instructions.into_iter().next() {
        Some(RawInstruction::Transfer {
            source,
            destination,
            lamports,
        }) => (source, destination, lamports_to_sol(lamports), SYSTEM_PROGRAM_ID.to_string()),
        Some(RawInstruction::Opaque { program_id }) => (queried_address.to_string(), String::new(), 0.0, program_id),
        None => (queried_address.to_string(), String::new(), 0.0, String::new()),
    };

    Some(Transaction {
        signature: sig.signature.clone(),
        timestamp_millis: block_time_to_millis(block_time),
        from_address,
        to_address,
        amount,
        program_id,
        status: TransactionStatus::from_error(meta.err.as_ref()),
        fee_native_units: lamports_to_sol(meta.fee),
    })
}
