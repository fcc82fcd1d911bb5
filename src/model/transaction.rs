use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn from_error<E>(err: Option<&E>) -> Self {
        if err.is_some() { TransactionStatus::Failed } else { TransactionStatus::Success }
    }
}

/// A ledger record normalized into the transfer model.
///
/// Non-transfer instructions keep `from_address` as the queried account,
/// an empty `to_address` and a zero `amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub signature: String,
    pub timestamp_millis: u64,
    pub from_address: String,
    pub to_address: String,
    pub amount: f64,
    pub program_id: String,
    pub status: TransactionStatus,
    pub fee_native_units: f64,
}

impl Transaction {
    pub fn is_transfer(&self) -> bool { !self.from_address.is_empty() && !self.to_address.is_empty() }
}

/// Network-wide liveness entry, built from a signature listing only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkActivity {
    pub signature: String,
    pub timestamp_millis: u64,
    pub status: TransactionStatus,
}
