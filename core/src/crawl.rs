use crate::fetch::{parse_page, Fetcher};
use crate::frontier::Frontier;
use crate::keywords::{choose_title, extract_keywords};
use crate::links::{is_followable, normalize, AllowedHosts};
use crate::politeness::{PolitenessTracker, DEFAULT_CRAWL_DELAY};
use crate::store::Store;
use crate::tagger::{LexiconTagger, Tagger};
use crate::writer::IndexWriter;
use anyhow::Result;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Delay used for hosts whose robots.txt sets none
    pub default_delay: Duration,
    /// Stop after this many pages have been indexed
    pub max_pages: Option<usize>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self { default_delay: DEFAULT_CRAWL_DELAY, max_pages: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    AwaitingFrontier,
    Fetching,
    Extracting,
    Committing,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub indexed: usize,
    /// Pages whose fetch failed; they are dropped from the frontier
    pub failed: usize,
    /// Entries left in the frontier when the loop stopped
    pub remaining: usize,
}

/// One sequential crawl: a single fetch or commit in flight at any time.
///
/// All mutable crawl state (frontier, crawl delays, root page titles) is
/// owned here, so independent crawls can share a process.
pub struct Crawler<'a, F, H, T = LexiconTagger> {
    store: &'a Store,
    frontier: F,
    fetcher: H,
    tagger: T,
    allowed: AllowedHosts,
    politeness: PolitenessTracker,
    root_titles: HashMap<String, Option<String>>,
    config: CrawlConfig,
    state: CrawlState,
    report: CrawlReport,
}

impl<'a, F: Frontier, H: Fetcher> Crawler<'a, F, H> {
    pub fn new(store: &'a Store, frontier: F, fetcher: H, allowed: AllowedHosts, config: CrawlConfig) -> Self {
        Self {
            store,
            frontier,
            fetcher,
            tagger: LexiconTagger,
            allowed,
            politeness: PolitenessTracker::new(config.default_delay),
            root_titles: HashMap::new(),
            config,
            state: CrawlState::Idle,
            report: CrawlReport::default(),
        }
    }
}

impl<'a, F: Frontier, H: Fetcher, T: Tagger> Crawler<'a, F, H, T> {
    pub fn with_tagger<U: Tagger>(self, tagger: U) -> Crawler<'a, F, H, U> {
        Crawler {
            store: self.store,
            frontier: self.frontier,
            fetcher: self.fetcher,
            tagger,
            allowed: self.allowed,
            politeness: self.politeness,
            root_titles: self.root_titles,
            config: self.config,
            state: self.state,
            report: self.report,
        }
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn frontier(&self) -> &F {
        &self.frontier
    }

    pub fn politeness(&self) -> &PolitenessTracker {
        &self.politeness
    }

    pub fn fetcher(&self) -> &H {
        &self.fetcher
    }

    /// Crawl until the frontier runs dry or the page budget is spent.
    ///
    /// Fetch failures skip the page. Store failures abort the run with the
    /// page still queued, so the next run retries the whole commit.
    pub async fn run(&mut self) -> Result<CrawlReport> {
        self.transition(CrawlState::AwaitingFrontier);
        while self.state != CrawlState::Done {
            if self.config.max_pages.is_some_and(|max| self.report.indexed >= max) {
                tracing::info!(indexed = self.report.indexed, "page budget reached");
                self.transition(CrawlState::Done);
                break;
            }
            match self.frontier.next(&self.allowed, self.store)? {
                Some(url) => self.crawl_page(&url).await?,
                None => self.transition(CrawlState::Done),
            }
        }
        self.report.remaining = self.frontier.len();
        tracing::info!(indexed = self.report.indexed, failed = self.report.failed, remaining = self.report.remaining, "crawl finished");
        Ok(self.report)
    }

    async fn crawl_page(&mut self, url: &Url) -> Result<()> {
        let host = url.host_str().unwrap_or_default().to_string();
        self.politeness.wait(&host, &self.fetcher).await;

        self.transition(CrawlState::Fetching);
        let page = match self.fetcher.fetch(url).await {
            Ok(html) => parse_page(&html),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "fetch failed");
                self.report.failed += 1;
                self.frontier.skip(url.as_str(), "fetch failed")?;
                self.transition(CrawlState::AwaitingFrontier);
                return Ok(());
            }
        };

        self.transition(CrawlState::Extracting);
        let keywords = extract_keywords(&page.text, &self.tagger);
        let root_title = if url.path() == "/" {
            self.root_titles.insert(host.clone(), page.title.clone());
            page.title.clone()
        } else {
            self.root_title(&host).await
        };
        let title = choose_title(page.title.as_deref(), root_title.as_deref(), page.heading.as_deref());
        let links: Vec<String> = page
            .links
            .iter()
            .filter_map(|href| normalize(href, url, &self.allowed))
            .filter(is_followable)
            .map(String::from)
            .collect();
        let discovered = links.len();
        self.frontier.extend(links)?;

        self.transition(CrawlState::Committing);
        let site_id = IndexWriter::new(self.store).commit(url.as_str(), &keywords, keywords.len() as u32, &title)?;
        self.frontier.pop()?;
        self.report.indexed += 1;
        tracing::info!(url = %url, site_id, keywords = keywords.len(), discovered, pending = self.frontier.len(), "indexed");

        self.transition(CrawlState::AwaitingFrontier);
        Ok(())
    }

    /// Title of `https://<host>/`, fetched at most once per host.
    async fn root_title(&mut self, host: &str) -> Option<String> {
        if let Some(title) = self.root_titles.get(host) {
            return title.clone();
        }
        let title = match Url::parse(&format!("https://{host}/")) {
            Ok(root) => {
                self.politeness.wait(host, &self.fetcher).await;
                match self.fetcher.fetch(&root).await {
                    Ok(html) => parse_page(&html).title,
                    Err(e) => {
                        tracing::debug!(host, error = %e, "root page unavailable");
                        None
                    }
                }
            }
            Err(_) => None,
        };
        self.root_titles.insert(host.to_string(), title.clone());
        title
    }

    fn transition(&mut self, to: CrawlState) {
        tracing::trace!(from = ?self.state, to = ?to, "crawl state");
        self.state = to;
    }
}
