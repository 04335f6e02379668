//! Per-host rate limiting and concurrency control.
//!
//! Two layers: a global semaphore capping in-flight requests across all
//! hosts, a per-host semaphore capping concurrency per host, and a per-host
//! minimum delay between dispatches (default 1 s, host-specific overrides,
//! extended by robots.txt crawl-delay).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};
use tracing::debug;
use url::Url;

/// Default minimum delay between requests to the same host.
const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(1);

/// Hosts that require a slower request cadence.
const HOST_DELAY_OVERRIDES: &[(&str, Duration)] = &[
    ("geobasis-bb.de", Duration::from_secs(10)),
    ("www.geobasis-bb.de", Duration::from_secs(10)),
];

#[derive(Debug)]
struct HostState {
    semaphore: Arc<Semaphore>,
    last_dispatch: Option<Instant>,
    min_delay: Duration,
}

/// Held for the duration of one request; dropping it frees both permits.
pub struct RatePermit {
    _global: OwnedSemaphorePermit,
    _host: OwnedSemaphorePermit,
}

/// Process-wide rate limiter shared by all workers.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    global: Arc<Semaphore>,
    per_host_limit: usize,
    hosts: Arc<RwLock<HashMap<String, HostState>>>,
}

impl RateLimiter {
    pub fn new(global_concurrency: usize, per_host_concurrency: usize) -> Self {
        Self {
            global: Arc::new(Semaphore::new(global_concurrency.max(1))),
            per_host_limit: per_host_concurrency.max(1),
            hosts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Host component of a URL.
    pub fn host_of(url: &str) -> Option<String> {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
    }

    fn default_delay_for(host: &str) -> Duration {
        HOST_DELAY_OVERRIDES
            .iter()
            .find(|(h, _)| *h == host)
            .map(|(_, d)| *d)
            .unwrap_or(DEFAULT_MIN_DELAY)
    }

    /// Raise the minimum delay for a host, e.g. from robots.txt crawl-delay.
    /// The delay never shrinks below the seeded override.
    pub async fn raise_min_delay(&self, host: &str, delay: Duration) {
        let mut hosts = self.hosts.write().await;
        let state = hosts.entry(host.to_string()).or_insert_with(|| HostState {
            semaphore: Arc::new(Semaphore::new(self.per_host_limit)),
            last_dispatch: None,
            min_delay: Self::default_delay_for(host),
        });
        if delay > state.min_delay {
            debug!("raising min delay for {} to {:?}", host, delay);
            state.min_delay = delay;
        }
    }

    async fn host_semaphore(&self, host: &str) -> Arc<Semaphore> {
        let mut hosts = self.hosts.write().await;
        let state = hosts.entry(host.to_string()).or_insert_with(|| HostState {
            semaphore: Arc::new(Semaphore::new(self.per_host_limit)),
            last_dispatch: None,
            min_delay: Self::default_delay_for(host),
        });
        state.semaphore.clone()
    }

    /// Wait for capacity and the host's dispatch interval, then return the
    /// permit pair. The permit must be held until the response is read.
    pub async fn acquire(&self, url: &str) -> Option<RatePermit> {
        let host = Self::host_of(url)?;

        let global = self
            .global
            .clone()
            .acquire_owned()
            .await
            .expect("rate limiter semaphore is never closed");
        let host_sem = self.host_semaphore(&host).await;
        let host_permit = host_sem
            .acquire_owned()
            .await
            .expect("rate limiter semaphore is never closed");

        // Respect the per-host dispatch interval.
        loop {
            let wait = {
                let mut hosts = self.hosts.write().await;
                let state = hosts.get_mut(&host).expect("host state exists");
                match state.last_dispatch {
                    Some(last) => {
                        let elapsed = last.elapsed();
                        if elapsed >= state.min_delay {
                            state.last_dispatch = Some(Instant::now());
                            None
                        } else {
                            Some(state.min_delay - elapsed)
                        }
                    }
                    None => {
                        state.last_dispatch = Some(Instant::now());
                        None
                    }
                }
            };
            match wait {
                None => break,
                Some(wait) => {
                    debug!("rate limiting {}: waiting {:?}", host, wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }

        Some(RatePermit {
            _global: global,
            _host: host_permit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_host() {
        assert_eq!(
            RateLimiter::host_of("https://ris.example.de/si0100.asp"),
            Some("ris.example.de".to_string())
        );
        assert_eq!(RateLimiter::host_of("not a url"), None);
    }

    #[tokio::test]
    async fn per_host_cap_blocks_third_request() {
        let limiter = RateLimiter::new(10, 2);
        let p1 = limiter.acquire("https://example.de/a").await.unwrap();
        let _p2 = limiter.acquire("https://example.de/b").await.unwrap();

        let pending = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire("https://example.de/c").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        drop(p1);
        let permit = tokio::time::timeout(Duration::from_secs(5), pending)
            .await
            .unwrap()
            .unwrap();
        assert!(permit.is_some());
    }

    #[tokio::test]
    async fn dispatch_interval_is_respected() {
        let limiter = RateLimiter::new(10, 4);
        // Shrink the test window by raising nothing: the default is 1 s,
        // so two dispatches must be at least ~1 s apart.
        let start = Instant::now();
        drop(limiter.acquire("https://slow.example.de/1").await.unwrap());
        drop(limiter.acquire("https://slow.example.de/2").await.unwrap());
        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test]
    async fn override_table_applies() {
        let limiter = RateLimiter::new(10, 2);
        limiter
            .raise_min_delay("geobasis-bb.de", Duration::from_secs(1))
            .await;
        let hosts = limiter.hosts.read().await;
        // The seeded 10 s override must not be lowered.
        assert_eq!(
            hosts.get("geobasis-bb.de").unwrap().min_delay,
            Duration::from_secs(10)
        );
    }
}
