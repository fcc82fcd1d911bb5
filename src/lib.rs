pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod handler;
pub mod model;
pub mod rpc;
pub mod tracing;
pub mod utils;

pub use error::ConfigError;
pub use error::Result;
pub use error::RpcError;
pub use error::RpcResult;
