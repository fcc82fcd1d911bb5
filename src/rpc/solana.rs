use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use futures::StreamExt;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_client::rpc_config::RpcTransactionLogsConfig;
use solana_client::rpc_config::RpcTransactionLogsFilter;
use solana_pubkey::Pubkey;
use solana_pubsub_client::nonblocking::pubsub_client::PubsubClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_signature::Signature;
use solana_transaction_status::EncodedConfirmedTransactionWithStatusMeta;
use solana_transaction_status::EncodedTransaction;
use solana_transaction_status::UiInstruction;
use solana_transaction_status::UiMessage;
use solana_transaction_status::UiParsedInstruction;
use solana_transaction_status::UiTransactionEncoding;
use tokio::sync::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::warn;

use super::transport::LedgerTransport;
use super::transport::LogHandler;
use super::transport::LogNotification;
use super::transport::LogStreamEvent;
use super::transport::ParsedTransactionRecord;
use super::transport::RawAccount;
use super::transport::RawInstruction;
use super::transport::SignatureRecord;
use super::transport::SubscriptionId;
use super::transport::TransactionMeta;
use crate::config::RpcConfig;
use crate::error::RpcError;
use crate::error::RpcResult;
use crate::model::NetworkEndpoints;

struct LogSubscription {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// `LedgerTransport` over the Solana JSON-RPC and pubsub endpoints.
pub struct SolanaTransport {
    rpc: RpcClient,
    ws_url: String,
    commitment: CommitmentConfig,
    // dropped once a stream ends so the next subscribe reconnects
    pubsub: Arc<Mutex<Option<Arc<PubsubClient>>>>,
    subscriptions: Arc<Mutex<HashMap<SubscriptionId, LogSubscription>>>,
    next_subscription_id: AtomicU64,
    // parent of every subscription token
    cancel: CancellationToken,
}

impl SolanaTransport {
    pub fn new(
        endpoints: &NetworkEndpoints,
        rpc_config: &RpcConfig,
    ) -> Self {
        let commitment = rpc_config.commitment_config();
        Self {
            rpc: RpcClient::new_with_timeout_and_commitment(
                endpoints.rpc_url.clone(),
                rpc_config.timeout(),
                commitment,
            ),
            ws_url: endpoints.ws_url.clone(),
            commitment,
            pubsub: Arc::new(Mutex::new(None)),
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            next_subscription_id: AtomicU64::new(1),
            cancel: CancellationToken::new(),
        }
    }

    async fn pubsub_client(&self) -> RpcResult<Arc<PubsubClient>> {
        let mut cached = self.pubsub.lock().await;
        if let Some(client) = cached.as_ref() {
            return Ok(client.clone());
        }

        debug!("pubsub::connecting::{}", self.ws_url);
        let client = PubsubClient::new(&self.ws_url).await.map(Arc::new).map_err(|e| {
            error!("pubsub_connect_failed::{}::error::{}", self.ws_url, e);
            RpcError::unreachable(e)
        })?;
        *cached = Some(client.clone());
        Ok(client)
    }
}

impl Drop for SolanaTransport {
    fn drop(&mut self) { self.cancel.cancel(); }
}

/// A `null` answer to getTransaction surfaces as a deserialization error.
fn is_missing_transaction(error_msg: &str) -> bool {
    error_msg.contains("invalid type: null") || error_msg.contains("not found")
}

fn parse_encoded_transaction(tx: EncodedConfirmedTransactionWithStatusMeta) -> ParsedTransactionRecord {
    let meta = tx.transaction.meta.map(|meta| TransactionMeta {
        err: meta.err.map(|e| format!("{:?}", e)),
        fee: meta.fee,
    });

    let instructions = match tx.transaction.transaction {
        EncodedTransaction::Json(ui_tx) => match ui_tx.message {
            UiMessage::Parsed(message) => {
                let account_keys: Vec<String> = message.account_keys.into_iter().map(|key| key.pubkey).collect();
                message
                    .instructions
                    .into_iter()
                    .map(|instruction| parse_instruction(instruction, &account_keys))
                    .collect()
            },
            UiMessage::Raw(message) => message
                .instructions
                .into_iter()
                .map(|compiled| RawInstruction::Opaque {
                    program_id: message
                        .account_keys
                        .get(compiled.program_id_index as usize)
                        .cloned()
                        .unwrap_or_default(),
                })
                .collect(),
        },
        _ => Vec::new(),
    };

    ParsedTransactionRecord {
        slot: tx.slot,
        block_time_seconds: tx.block_time,
        meta,
        instructions,
    }
}

fn parse_instruction(
    instruction: UiInstruction,
    account_keys: &[String],
) -> RawInstruction {
    match instruction {
        UiInstruction::Parsed(UiParsedInstruction::Parsed(parsed)) => {
            RawInstruction::from_parsed(&parsed.program_id, Some(&parsed.parsed))
        },
        UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(decoded)) => RawInstruction::Opaque {
            program_id: decoded.program_id,
        },
        UiInstruction::Compiled(compiled) => RawInstruction::Opaque {
            program_id: account_keys.get(compiled.program_id_index as usize).cloned().unwrap_or_default(),
        },
    }
}

#[async_trait]
impl LedgerTransport for SolanaTransport {
    async fn list_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> RpcResult<Vec<SignatureRecord>> {
        let signatures = self
            .rpc
            .get_signatures_for_address_with_config(address, GetConfirmedSignaturesForAddress2Config {
                before: None,
                until: None,
                limit: Some(limit),
                commitment: Some(self.commitment),
            })
            .await
            .map_err(|e| {
                error!("error_fetching_signatures::account::{}::error::{}", address, e);
                RpcError::unreachable(e)
            })?;

        Ok(signatures
            .into_iter()
            .map(|sig| SignatureRecord {
                signature: sig.signature,
                block_time_seconds: sig.block_time,
                slot: sig.slot,
                err: sig.err.map(|e| format!("{:?}", e)),
            })
            .collect())
    }

    async fn get_parsed_transaction(
        &self,
        signature: &str,
    ) -> RpcResult<Option<ParsedTransactionRecord>> {
        let parsed_signature = Signature::from_str(signature).map_err(|e| {
            error!("invalid_signature_format::{}::error::{:?}", signature, e);
            RpcError::UnreachableEndpoint(format!("malformed signature {}: {}", signature, e))
        })?;

        match self
            .rpc
            .get_transaction_with_config(&parsed_signature, RpcTransactionConfig {
                encoding: Some(UiTransactionEncoding::JsonParsed),
                commitment: Some(self.commitment),
                max_supported_transaction_version: Some(0),
            })
            .await
        {
            Ok(tx) => Ok(Some(parse_encoded_transaction(tx))),
            Err(e) => {
                let error_string = e.to_string();
                if is_missing_transaction(&error_string) {
                    warn!("transaction_not_available::signature::{}::skipping", signature);
                    return Ok(None);
                }
                error!("error_fetching_transaction::signature::{}::error::{}", signature, error_string);
                Err(RpcError::UnreachableEndpoint(error_string))
            },
        }
    }

    async fn get_account_info(
        &self,
        address: &Pubkey,
    ) -> RpcResult<Option<RawAccount>> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| {
                error!("error_fetching_account::account::{}::error::{}", address, e);
                RpcError::unreachable(e)
            })?;

        Ok(response.value.map(|account| RawAccount {
            executable: account.executable,
            owner: account.owner.to_string(),
            data_length: account.data.len() as u64,
        }))
    }

    async fn get_balance(
        &self,
        address: &Pubkey,
    ) -> RpcResult<u64> {
        self.rpc.get_balance(address).await.map_err(|e| {
            error!("error_fetching_balance::account::{}::error::{}", address, e);
            RpcError::unreachable(e)
        })
    }

    async fn get_minimum_rent_exempt_balance(
        &self,
        data_length: usize,
    ) -> RpcResult<u64> {
        self.rpc.get_minimum_balance_for_rent_exemption(data_length).await.map_err(|e| {
            error!("error_fetching_rent_exemption::data_length::{}::error::{}", data_length, e);
            RpcError::unreachable(e)
        })
    }

    async fn subscribe_address_logs(
        &self,
        address: &Pubkey,
        handler: LogHandler,
    ) -> RpcResult<SubscriptionId> {
        let client = self.pubsub_client().await?;
        let id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);
        let cancel = self.cancel.child_token();
        let child = cancel.clone();
        let subscriptions = self.subscriptions.clone();
        let pubsub = self.pubsub.clone();
        let commitment = self.commitment;
        let mentions = address.to_string();
        let (ready_sender, ready_receiver) = oneshot::channel::<RpcResult<()>>();

        let task = tokio::spawn(async move {
            let subscribed = client
                .logs_subscribe(RpcTransactionLogsFilter::Mentions(vec![mentions.clone()]), RpcTransactionLogsConfig {
                    commitment: Some(commitment),
                })
                .await;

            let (mut stream, unsubscribe) = match subscribed {
                Ok(subscription) => {
                    let _ = ready_sender.send(Ok(()));
                    subscription
                },
                Err(e) => {
                    error!("logs_subscribe_failed::account::{}::error::{}", mentions, e);
                    let _ = ready_sender.send(Err(RpcError::unreachable(e)));
                    return;
                },
            };

            debug!("logs_subscribed::id::{}::account::{}", id, mentions);

            loop {
                tokio::select! {
                    _ = child.cancelled() => {
                        debug!("logs_subscription_cancelled::id::{}", id);
                        break;
                    }
                    next = stream.next() => match next {
                        Some(response) => {
                            let value = response.value;
                            handler(LogStreamEvent::Log(LogNotification {
                                signature: value.signature,
                                err: value.err.map(|e| format!("{:?}", e)),
                                logs: value.logs,
                            }));
                        },
                        None => {
                            warn!("logs_stream_closed::id::{}::account::{}", id, mentions);
                            // marks the entry dead before it is removed, see the insert below
                            child.cancel();
                            subscriptions.lock().await.remove(&id);
                            let mut cached = pubsub.lock().await;
                            if cached.as_ref().is_some_and(|cached| Arc::ptr_eq(cached, &client)) {
                                debug!("pubsub::dropping_closed_client::{}", id);
                                *cached = None;
                            }
                            drop(cached);
                            handler(LogStreamEvent::Closed {
                                reason: format!("log stream for {} ended", mentions),
                            });
                            break;
                        },
                    }
                }
            }

            drop(stream);
            unsubscribe().await;
        });

        match ready_receiver.await {
            Ok(Ok(())) => {
                let mut subscriptions = self.subscriptions.lock().await;
                if !cancel.is_cancelled() {
                    subscriptions.insert(id, LogSubscription { cancel, task });
                }
                Ok(id)
            },
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RpcError::UnreachableEndpoint("log subscription task ended before setup".to_string())),
        }
    }

    async fn unsubscribe(
        &self,
        subscription_id: SubscriptionId,
    ) -> RpcResult<()> {
        let Some(subscription) = self.subscriptions.lock().await.remove(&subscription_id) else {
            debug!("unsubscribe_unknown_id::{}", subscription_id);
            return Ok(());
        };

        subscription.cancel.cancel();
        if let Err(e) = subscription.task.await {
            warn!("logs_subscription_task_join_failed::id::{}::error::{}", subscription_id, e);
        }
        Ok(())
    }
}
