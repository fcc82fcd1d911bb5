use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

/// A new transaction observed on a live subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveEvent {
    pub signature: String,
    pub timestamp_millis: u64,
    pub kind: String,
}

pub type EventCallback = Arc<dyn Fn(LiveEvent) + Send + Sync>;
