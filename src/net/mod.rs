//! Outbound networking: rate limiting, robots.txt, caching, SSL policy.

mod cache;
mod http_client;
mod rate_limit;
mod robots;
mod ssl_policy;

pub use cache::{CacheMeta, HttpCache};
pub use http_client::{FetchError, FetchResponse, HeadInfo, HttpClient, USER_AGENT};
pub use rate_limit::{RateLimiter, RatePermit};
pub use robots::{RobotsCache, RobotsRules};
pub use ssl_policy::{is_ris_page, SslMetrics, SslPolicy};
