//! robots.txt cache with fail-open semantics.
//!
//! Rules are fetched once per host, kept in memory and mirrored to disk
//! under `robots/`. An unreachable robots.txt allows everything; a
//! crawl-delay directive is surfaced so the rate limiter can honor it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

/// Parsed rules for one host.
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    disallow: Vec<String>,
    pub crawl_delay: Option<Duration>,
}

impl RobotsRules {
    /// Parse the directives that apply to us: the `*` group and any group
    /// naming our user agent.
    pub fn parse(body: &str, user_agent: &str) -> Self {
        let ua_token = user_agent
            .split('/')
            .next()
            .unwrap_or(user_agent)
            .to_lowercase();

        let mut rules = RobotsRules::default();
        let mut group_applies = false;
        let mut in_group_header = false;

        for line in body.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let field = field.trim().to_lowercase();
            let value = value.trim();

            match field.as_str() {
                "user-agent" => {
                    let agent = value.to_lowercase();
                    let matches = agent == "*" || ua_token.contains(&agent) || agent == ua_token;
                    if in_group_header {
                        group_applies = group_applies || matches;
                    } else {
                        group_applies = matches;
                    }
                    in_group_header = true;
                }
                "disallow" if group_applies => {
                    in_group_header = false;
                    if !value.is_empty() {
                        rules.disallow.push(value.to_string());
                    }
                }
                "crawl-delay" if group_applies => {
                    in_group_header = false;
                    if let Ok(secs) = value.parse::<f64>() {
                        rules.crawl_delay = Some(Duration::from_secs_f64(secs.max(0.0)));
                    }
                }
                _ => {
                    in_group_header = false;
                }
            }
        }
        rules
    }

    /// Whether the path is allowed. Prefix matching per the original
    /// robots.txt convention.
    pub fn allows(&self, path: &str) -> bool {
        !self.disallow.iter().any(|rule| path.starts_with(rule))
    }
}

/// Per-host robots.txt cache. Fail-open: fetch errors allow the URL.
pub struct RobotsCache {
    client: reqwest::Client,
    user_agent: String,
    disk_base: PathBuf,
    rules: RwLock<HashMap<String, RobotsRules>>,
}

impl RobotsCache {
    pub fn new(client: reqwest::Client, user_agent: String, disk_base: PathBuf) -> Self {
        Self {
            client,
            user_agent,
            disk_base,
            rules: RwLock::new(HashMap::new()),
        }
    }

    /// Check a URL against the host's rules, fetching them if needed.
    /// Returns the verdict and the host's crawl-delay, if any.
    pub async fn check(&self, url: &str) -> (bool, Option<Duration>) {
        let Ok(parsed) = Url::parse(url) else {
            return (true, None);
        };
        let Some(host) = parsed.host_str().map(|h| h.to_lowercase()) else {
            return (true, None);
        };
        let origin = format!("{}://{}", parsed.scheme(), host);
        let path = parsed.path();

        if let Some(rules) = self.rules.read().await.get(&origin) {
            return (rules.allows(path), rules.crawl_delay);
        }

        let rules = self.load(&origin, &host).await;
        let verdict = (rules.allows(path), rules.crawl_delay);
        self.rules.write().await.insert(origin, rules);
        verdict
    }

    async fn load(&self, origin: &str, host: &str) -> RobotsRules {
        let disk_path = self.disk_base.join(format!("{}.txt", host));
        if let Ok(body) = tokio::fs::read_to_string(&disk_path).await {
            return RobotsRules::parse(&body, &self.user_agent);
        }

        let robots_url = format!("{}/robots.txt", origin);
        match self.client.get(&robots_url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => {
                    let _ = tokio::fs::create_dir_all(&self.disk_base).await;
                    let _ = tokio::fs::write(&disk_path, &body).await;
                    RobotsRules::parse(&body, &self.user_agent)
                }
                Err(_) => RobotsRules::default(),
            },
            Ok(resp) => {
                debug!("robots.txt for {} returned {}", origin, resp.status());
                RobotsRules::default()
            }
            Err(e) => {
                // Unreachable robots.txt allows everything.
                debug!("robots.txt fetch failed for {}: {}", origin, e);
                RobotsRules::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UA: &str = "BESS-Forensic-Crawler/1.0 (Research/Transparency)";

    #[test]
    fn wildcard_disallow_applies() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /intern/\n", UA);
        assert!(!rules.allows("/intern/protokolle"));
        assert!(rules.allows("/amtsblatt/2024"));
    }

    #[test]
    fn empty_disallow_allows_everything() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow:\n", UA);
        assert!(rules.allows("/anything"));
    }

    #[test]
    fn crawl_delay_is_parsed() {
        let rules = RobotsRules::parse("User-agent: *\nCrawl-delay: 10\n", UA);
        assert_eq!(rules.crawl_delay, Some(Duration::from_secs(10)));
    }

    #[test]
    fn other_agents_group_is_ignored() {
        let rules = RobotsRules::parse(
            "User-agent: Googlebot\nDisallow: /\n\nUser-agent: *\nDisallow: /intern/\n",
            UA,
        );
        assert!(rules.allows("/amtsblatt"));
        assert!(!rules.allows("/intern/x"));
    }

    #[test]
    fn missing_rules_default_to_allow() {
        let rules = RobotsRules::default();
        assert!(rules.allows("/anything"));
        assert_eq!(rules.crawl_delay, None);
    }
}
