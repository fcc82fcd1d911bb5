use solana_pubkey::Pubkey;
use solana_pubkey::pubkey;

/// ======================= Programs =======================
pub const SYSTEM_PROGRAM_ID: Pubkey = pubkey!("11111111111111111111111111111111");

/// ======================= Units =======================
pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// ======================= Endpoints =======================
pub const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
pub const TESTNET_RPC_URL: &str = "https://api.testnet.solana.com";
pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

/// ======================= Defaults =======================
pub const DEFAULT_MIN_CALL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_COMMITMENT: &str = "confirmed";
pub const DEFAULT_PAGE_LIMIT: usize = 10;
pub const DEFAULT_RECENT_ACTIVITY_LIMIT: usize = 10;
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 10;

/// ======================= Graph =======================
pub const NODE_BASE_WEIGHT: f64 = 3.0;

/// ======================= Live events =======================
pub const DEFAULT_EVENT_KIND: &str = "transaction";
