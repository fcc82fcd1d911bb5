pub mod account;
pub mod event;
pub mod graph;
pub mod network;
pub mod transaction;

pub use account::AccountInfo;
pub use event::EventCallback;
pub use event::LiveEvent;
pub use graph::GraphData;
pub use graph::GraphEdge;
pub use graph::GraphNode;
pub use graph::aggregate;
pub use network::Network;
pub use network::NetworkEndpoints;
pub use transaction::NetworkActivity;
pub use transaction::Transaction;
pub use transaction::TransactionStatus;
