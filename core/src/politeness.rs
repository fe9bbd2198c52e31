//! Per-host crawl delays.
//!
//! robots.txt is requested once per host per run; whatever it yields (or
//! the default when it yields nothing) is cached for the rest of the run.

use crate::fetch::Fetcher;
use crate::robots::parse_robots;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

pub const DEFAULT_CRAWL_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct PolitenessTracker {
    default_delay: Duration,
    delays: HashMap<String, Duration>,
}

impl Default for PolitenessTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CRAWL_DELAY)
    }
}

impl PolitenessTracker {
    pub fn new(default_delay: Duration) -> Self {
        Self { default_delay, delays: HashMap::new() }
    }

    /// Delay to observe before each request to `hostname`.
    pub async fn delay_for(&mut self, hostname: &str, fetcher: &impl Fetcher) -> Duration {
        if let Some(delay) = self.delays.get(hostname) {
            return *delay;
        }
        let delay = self.lookup(hostname, fetcher).await.unwrap_or(self.default_delay);
        tracing::debug!(hostname, delay_secs = delay.as_secs_f64(), "crawl delay cached");
        self.delays.insert(hostname.to_string(), delay);
        delay
    }

    async fn lookup(&self, hostname: &str, fetcher: &impl Fetcher) -> Option<Duration> {
        let robots_url = Url::parse(&format!("https://{hostname}/robots.txt")).ok()?;
        match fetcher.fetch_text(&robots_url).await {
            Ok(txt) => parse_robots(&txt).crawl_delay,
            Err(e) => {
                tracing::debug!(hostname, error = %e, "robots.txt unavailable");
                None
            }
        }
    }

    /// Sleep for the host's delay; the only throttle the crawl has.
    pub async fn wait(&mut self, hostname: &str, fetcher: &impl Fetcher) {
        let delay = self.delay_for(hostname, fetcher).await;
        if !delay.is_zero() {
            tracing::trace!(hostname, delay_secs = delay.as_secs_f64(), "waiting");
            tokio::time::sleep(delay).await;
        }
    }

    pub fn cached_hosts(&self) -> usize {
        self.delays.len()
    }
}
