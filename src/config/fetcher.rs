use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_MAX_CONCURRENT_REQUESTS;
use crate::constants::DEFAULT_PAGE_LIMIT;
use crate::constants::DEFAULT_RECENT_ACTIVITY_LIMIT;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Most recent signatures requested per history fetch.
    pub page_limit: usize,
    pub recent_activity_limit: usize,
    /// Upper bound on in-flight detail fetches; the rate limiter still
    /// spaces their dispatch.
    pub max_concurrent_requests: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            recent_activity_limit: DEFAULT_RECENT_ACTIVITY_LIMIT,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }
}
