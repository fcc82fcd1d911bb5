use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;
use solana_pubkey::Pubkey;

use crate::constants::SYSTEM_PROGRAM_ID;
use crate::error::RpcResult;

/// One entry of a signature listing, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub signature: String,
    pub block_time_seconds: Option<i64>,
    pub slot: u64,
    pub err: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMeta {
    pub err: Option<String>,
    pub fee: u64,
}

/// Instruction shape, decided once when the raw record is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawInstruction {
    /// Native system program transfer with a parsed payload.
    Transfer {
        source: String,
        destination: String,
        lamports: u64,
    },
    Opaque {
        program_id: String,
    },
}

impl RawInstruction {
    /// Classifies a `jsonParsed` instruction. Only a system program payload
    /// of type `transfer` carrying source, destination and lamports becomes a
    /// `Transfer`; everything else is opaque.
    pub fn from_parsed(
        program_id: &str,
        parsed: Option<&serde_json::Value>,
    ) -> Self {
        let opaque = || RawInstruction::Opaque {
            program_id: program_id.to_string(),
        };

        if program_id != SYSTEM_PROGRAM_ID.to_string() {
            return opaque();
        }

        let Some(parsed) = parsed else {
            return opaque();
        };

        if parsed.get("type").and_then(|t| t.as_str()) != Some("transfer") {
            return opaque();
        }

        let info = &parsed["info"];
        match (info["source"].as_str(), info["destination"].as_str(), info["lamports"].as_u64()) {
            (Some(source), Some(destination), Some(lamports)) => RawInstruction::Transfer {
                source: source.to_string(),
                destination: destination.to_string(),
                lamports,
            },
            _ => opaque(),
        }
    }
}

/// A fetched transaction. `meta` is absent for records that are not final yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTransactionRecord {
    pub slot: u64,
    pub block_time_seconds: Option<i64>,
    pub meta: Option<TransactionMeta>,
    pub instructions: Vec<RawInstruction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAccount {
    pub executable: bool,
    pub owner: String,
    pub data_length: u64,
}

/// A log notification as delivered by the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogNotification {
    pub signature: String,
    pub err: Option<String>,
    pub logs: Vec<String>,
}

/// What a log listener receives. `Closed` is terminal: the stream ended on
/// the transport side and no further events follow for that listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogStreamEvent {
    Log(LogNotification),
    Closed { reason: String },
}

pub type LogHandler = Arc<dyn Fn(LogStreamEvent) + Send + Sync>;

pub type SubscriptionId = u64;

/// Ledger access operations consumed by the core. Every call is network
/// bound and fallible; callers pace them through the connection's rate limiter.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    async fn list_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> RpcResult<Vec<SignatureRecord>>;

    /// `Ok(None)` when the ledger answers with no record.
    async fn get_parsed_transaction(
        &self,
        signature: &str,
    ) -> RpcResult<Option<ParsedTransactionRecord>>;

    async fn get_account_info(
        &self,
        address: &Pubkey,
    ) -> RpcResult<Option<RawAccount>>;

    async fn get_balance(
        &self,
        address: &Pubkey,
    ) -> RpcResult<u64>;

    async fn get_minimum_rent_exempt_balance(
        &self,
        data_length: usize,
    ) -> RpcResult<u64>;

    async fn subscribe_address_logs(
        &self,
        address: &Pubkey,
        handler: LogHandler,
    ) -> RpcResult<SubscriptionId>;

    async fn unsubscribe(
        &self,
        subscription_id: SubscriptionId,
    ) -> RpcResult<()>;
}
