pub mod connection;
pub mod rate_limiter;
pub mod solana;
pub mod transport;

pub use connection::Connection;
pub use connection::ConnectionManager;
pub use connection::Connector;
pub use connection::SolanaConnector;
pub use connection::TeardownHook;
pub use rate_limiter::RateLimiter;
pub use solana::SolanaTransport;
pub use transport::LedgerTransport;
pub use transport::LogHandler;
pub use transport::LogNotification;
pub use transport::LogStreamEvent;
pub use transport::ParsedTransactionRecord;
pub use transport::RawAccount;
pub use transport::RawInstruction;
pub use transport::SignatureRecord;
pub use transport::SubscriptionId;
pub use transport::TransactionMeta;

use std::str::FromStr;

use solana_pubkey::Pubkey;

use crate::error::RpcError;
use crate::error::RpcResult;

/// Validates a base58 address before it is used in any call.
pub fn parse_address(address: &str) -> RpcResult<Pubkey> {
    Pubkey::from_str(address.trim()).map_err(|_| RpcError::InvalidAddress(address.to_string()))
}
