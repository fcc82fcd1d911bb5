pub mod shutdown;
pub mod subscription;
pub mod transaction;

pub use shutdown::ShutdownSignal;
pub use subscription::ActiveSubscription;
pub use subscription::SubscriptionHandle;
pub use subscription::SubscriptionManager;
pub use transaction::AddressOverview;
pub use transaction::TransactionFetcher;
pub use transaction::normalize_transaction;
