use thiserror::Error;

pub type RpcResult<T> = std::result::Result<T, RpcError>;

/// Failures surfaced by the ledger access core.
///
/// An empty history is not an error; it is returned as an empty list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The string is not a valid base58 encoded 32 byte address. Raised
    /// before any network call is attempted and never retried.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Transport or network failure. No built-in retry, the caller decides.
    #[error("Endpoint unreachable: {0}")]
    UnreachableEndpoint(String),

    #[error("Connection not initialized")]
    NotInitialized,

    /// A later `subscribe` or an `unsubscribe` replaced this request while
    /// its listener was still being registered.
    #[error("Subscription request superseded")]
    Superseded,
}

impl RpcError {
    pub fn unreachable(err: impl std::fmt::Display) -> Self {
        RpcError::UnreachableEndpoint(err.to_string())
    }
}
