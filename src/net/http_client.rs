//! The single chokepoint for outbound HTTP.
//!
//! Every request passes robots.txt, the rate limiter, and the disk cache.
//! Transport failures are transformed into typed [`FetchError`] values;
//! nothing below this layer panics or leaks a raw reqwest error upward.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::Settings;

use super::cache::HttpCache;
use super::rate_limit::RateLimiter;
use super::robots::RobotsCache;
use super::ssl_policy::{is_ris_page, SslPolicy};

/// Fixed user agent; municipalities see one honest identity.
pub const USER_AGENT: &str = "BESS-Forensic-Crawler/1.0 (Research/Transparency)";

/// Typed transport outcome per the error taxonomy.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("robots.txt disallows {0}")]
    RobotsDisallowed(String),
    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },
    #[error("ssl error for {url}: {message}")]
    Ssl { url: String, message: String },
}

impl FetchError {
    /// Whether this failure should be reported as an SSL source status.
    pub fn is_ssl(&self) -> bool {
        matches!(self, Self::Ssl { .. })
    }
}

/// A fetched response body with its validators.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content_type: Option<String>,
    pub from_cache: bool,
}

impl FetchResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HEAD result used for the PDF size guard.
#[derive(Debug, Clone)]
pub struct HeadInfo {
    pub status: u16,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
}

/// Shared HTTP client. Cloning is cheap; all clones share the limiter,
/// robots cache, response cache and SSL counters.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    insecure: reqwest::Client,
    rate: RateLimiter,
    robots: Arc<RobotsCache>,
    cache: HttpCache,
    ssl: Arc<SslPolicy>,
    retries: u32,
}

impl HttpClient {
    pub fn new(
        settings: &Settings,
        rate: RateLimiter,
        ssl: Arc<SslPolicy>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(settings.connect_timeout_s))
            .timeout(Duration::from_secs(settings.timeout_s))
            .gzip(true)
            .brotli(true)
            .build()?;
        // Only ever used after an SSL error on an allowlisted host.
        let insecure = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(settings.connect_timeout_s))
            .timeout(Duration::from_secs(settings.timeout_s))
            .danger_accept_invalid_certs(true)
            .gzip(true)
            .brotli(true)
            .build()?;

        let robots = Arc::new(RobotsCache::new(
            client.clone(),
            USER_AGENT.to_string(),
            settings.cache_base.join("robots"),
        ));
        let cache = HttpCache::new(settings.cache_base.join("http"));

        Ok(Self {
            client,
            insecure,
            rate,
            robots,
            cache,
            ssl,
            retries: settings.retries,
        })
    }

    pub fn ssl_policy(&self) -> &SslPolicy {
        &self.ssl
    }

    /// GET with caching, rate limiting and the default SSL policy.
    pub async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.get_inner(url, false).await
    }

    /// GET for RIS pages: additionally eligible for the HTTPS→HTTP
    /// downgrade when enabled and the body carries RIS markers.
    pub async fn get_ris(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.get_inner(url, true).await
    }

    async fn get_inner(&self, url: &str, ris: bool) -> Result<FetchResponse, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        self.gate(url, &parsed).await?;

        let (etag, last_modified) = self.cache.validators(url);
        let _permit = self.rate.acquire(url).await;

        let mut last_network_error = String::new();
        for attempt in 0..self.retries {
            if attempt > 0 {
                self.backoff(attempt).await;
            }

            let result = self
                .send(&self.client, url, etag.as_deref(), last_modified.as_deref())
                .await;

            match result {
                Ok(resp) => match self.consume(url, resp).await {
                    Consumed::Done(response) => return Ok(response),
                    Consumed::Retry(message) => last_network_error = message,
                    Consumed::Fail(err) => return Err(err),
                },
                Err(e) if is_ssl_error(&e) => {
                    self.ssl.record_ssl_error();
                    return self.ssl_fallback(url, &parsed, ris, &e).await;
                }
                Err(e) => {
                    last_network_error = e.to_string();
                    debug!("attempt {} failed for {}: {}", attempt + 1, url, e);
                }
            }
        }

        Err(FetchError::Network {
            url: url.to_string(),
            message: format!("{} after {} attempts", last_network_error, self.retries),
        })
    }

    /// HEAD request used to size-check PDFs before downloading.
    pub async fn head(&self, url: &str) -> Result<HeadInfo, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        self.gate(url, &parsed).await?;
        let _permit = self.rate.acquire(url).await;

        let resp = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| self.classify_transport(url, e))?;

        Ok(HeadInfo {
            status: resp.status().as_u16(),
            content_length: resp
                .headers()
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok()),
            content_type: header_string(&resp, reqwest::header::CONTENT_TYPE),
        })
    }

    /// robots.txt gate; seeds the rate limiter with any crawl-delay.
    async fn gate(&self, url: &str, parsed: &Url) -> Result<(), FetchError> {
        let (allowed, crawl_delay) = self.robots.check(url).await;
        if let (Some(delay), Some(host)) = (crawl_delay, parsed.host_str()) {
            self.rate.raise_min_delay(&host.to_lowercase(), delay).await;
        }
        if !allowed {
            warn!("ROBOTS_DISALLOW url={}", url);
            return Err(FetchError::RobotsDisallowed(url.to_string()));
        }
        Ok(())
    }

    async fn send(
        &self,
        client: &reqwest::Client,
        url: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut request = client.get(url);
        if let Some(etag) = etag {
            request = request.header(reqwest::header::IF_NONE_MATCH, etag);
        }
        if let Some(lm) = last_modified {
            request = request.header(reqwest::header::IF_MODIFIED_SINCE, lm);
        }
        request.send().await
    }

    /// Turn a response into a typed outcome, writing through the cache.
    async fn consume(&self, url: &str, resp: reqwest::Response) -> Consumed {
        let status = resp.status();

        if status == StatusCode::NOT_MODIFIED {
            return match self.cache.get(url) {
                Some((body, meta)) => Consumed::Done(FetchResponse {
                    status: 200,
                    body,
                    etag: meta.etag,
                    last_modified: meta.last_modified,
                    content_type: meta.content_type,
                    from_cache: true,
                }),
                None => Consumed::Retry("304 without cached body".to_string()),
            };
        }

        if status.is_success() {
            let etag = header_string(&resp, reqwest::header::ETAG);
            let last_modified = header_string(&resp, reqwest::header::LAST_MODIFIED);
            let content_type = header_string(&resp, reqwest::header::CONTENT_TYPE);
            let body = match resp.bytes().await {
                Ok(b) => b.to_vec(),
                Err(e) => return Consumed::Retry(e.to_string()),
            };
            if let Err(e) = self.cache.put(
                url,
                &body,
                etag.clone(),
                last_modified.clone(),
                content_type.clone(),
            ) {
                debug!("cache write failed for {}: {}", url, e);
            }
            return Consumed::Done(FetchResponse {
                status: status.as_u16(),
                body,
                etag,
                last_modified,
                content_type,
                from_cache: false,
            });
        }

        let code = status.as_u16();
        if code == 408 || code == 429 || status.is_server_error() {
            return Consumed::Retry(format!("HTTP {}", code));
        }

        // Remaining 4xx are terminal.
        Consumed::Fail(FetchError::Http {
            status: code,
            url: url.to_string(),
        })
    }

    /// Fallback chain after an SSL error: insecure retry for allowlisted
    /// hosts, then (RIS only, opt-in) the HTTP downgrade with marker check.
    async fn ssl_fallback(
        &self,
        url: &str,
        parsed: &Url,
        ris: bool,
        original: &reqwest::Error,
    ) -> Result<FetchResponse, FetchError> {
        if self.ssl.allows_insecure(url) {
            match self.send(&self.insecure, url, None, None).await {
                Ok(resp) => {
                    if let Consumed::Done(response) = self.consume(url, resp).await {
                        self.ssl.record_ssl_fallback(url);
                        return Ok(response);
                    }
                }
                Err(e) => debug!("insecure retry failed for {}: {}", url, e),
            }
        }

        if ris && self.ssl.allow_http_fallback() && parsed.scheme() == "https" {
            let mut http_url = parsed.clone();
            if http_url.set_scheme("http").is_ok() {
                let http_url = http_url.to_string();
                if let Ok(resp) = self.send(&self.client, &http_url, None, None).await {
                    if resp.status() == StatusCode::OK {
                        if let Ok(body) = resp.bytes().await {
                            let text = String::from_utf8_lossy(&body);
                            if is_ris_page(&text) {
                                self.ssl.record_http_fallback(url, &http_url);
                                return Ok(FetchResponse {
                                    status: 200,
                                    body: body.to_vec(),
                                    etag: None,
                                    last_modified: None,
                                    content_type: None,
                                    from_cache: false,
                                });
                            }
                            debug!("HTTP fallback for {} did not look like a RIS page", url);
                        }
                    }
                }
            }
        }

        Err(FetchError::Ssl {
            url: url.to_string(),
            message: original.to_string(),
        })
    }

    fn classify_transport(&self, url: &str, e: reqwest::Error) -> FetchError {
        if is_ssl_error(&e) {
            self.ssl.record_ssl_error();
            FetchError::Ssl {
                url: url.to_string(),
                message: e.to_string(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }

    /// Exponential backoff with jitter before retry `attempt`.
    async fn backoff(&self, attempt: u32) {
        let base = Duration::from_secs(1 << (attempt - 1).min(5));
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(50..500));
        tokio::time::sleep(base + jitter).await;
    }
}

enum Consumed {
    Done(FetchResponse),
    Retry(String),
    Fail(FetchError),
}

fn header_string(resp: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Heuristic SSL classification over the reqwest error chain.
fn is_ssl_error(e: &reqwest::Error) -> bool {
    let rendered = format!("{:?}", e).to_lowercase();
    rendered.contains("certificate")
        || rendered.contains("ssl")
        || rendered.contains("tls")
        || rendered.contains("handshake")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_renders_status() {
        let err = FetchError::Http {
            status: 404,
            url: "https://example.de/missing".into(),
        };
        assert!(err.to_string().contains("404"));
        assert!(!err.is_ssl());
    }

    #[test]
    fn ssl_error_flag() {
        let err = FetchError::Ssl {
            url: "https://example.de".into(),
            message: "certificate verify failed".into(),
        };
        assert!(err.is_ssl());
    }
}
