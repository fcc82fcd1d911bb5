use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use tokio::sync::Notify;

/// Broadcast stop request shared by the engine and its background loops.
/// A signal raised before anyone waits is not lost.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    signal: Arc<Notify>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self { Self::default() }

    pub fn shutdown(&self) {
        self.triggered.store(true, Ordering::Release);
        self.signal.notify_waiters();
    }

    pub fn is_shutdown(&self) -> bool { self.triggered.load(Ordering::Acquire) }

    pub async fn wait_for_shutdown(&self) {
        let notified = self.signal.notified();
        if self.is_shutdown() {
            return;
        }
        notified.await;
    }
}
