use anyhow::{bail, Result};
use parking_lot::Mutex;
use spider_core::{
    AllowedHosts, Checkpoint, CrawlConfig, CrawlState, Crawler, FetchError, Fetcher, Frontier, LocalFrontier,
    PartOfSpeech, PolitenessTracker, SharedQueueFrontier, Store, Tagger,
};
use std::collections::HashMap;
use std::time::Duration;
use tempfile::tempdir;
use tokio::time::Instant;
use url::Url;

/// Serves canned pages and records every request.
#[derive(Default)]
struct StubFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<(String, Instant)>>,
}

impl StubFetcher {
    fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    fn hits(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|(u, _)| u == url).count()
    }

    fn first_request(&self, url: &str) -> Option<Instant> {
        self.requests.lock().iter().find(|(u, _)| u == url).map(|(_, at)| *at)
    }
}

impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.requests.lock().push((url.to_string(), Instant::now()));
        self.pages.get(url.as_str()).cloned().ok_or(FetchError::Status(404))
    }
}

fn html(title: &str, body: &str, links: &[&str]) -> String {
    let anchors: String = links.iter().map(|l| format!(r#"<a href="{l}">link</a>"#)).collect();
    format!("<html><head><title>{title}</title></head><body>{body}{anchors}</body></html>")
}

fn config(max_pages: Option<usize>) -> CrawlConfig {
    CrawlConfig { default_delay: Duration::ZERO, max_pages }
}

fn local(seeds: &[&str], dir: &std::path::Path) -> (AllowedHosts, LocalFrontier) {
    let seeds: Vec<String> = seeds.iter().map(|s| s.to_string()).collect();
    let allowed = AllowedHosts::from_seeds(seeds.iter().map(String::as_str));
    let frontier = LocalFrontier::open(&seeds, Checkpoint::new(dir.join("frontier.json"))).unwrap();
    (allowed, frontier)
}

#[tokio::test]
async fn discovered_links_stay_on_allowed_hosts() {
    let dir = tempdir().unwrap();
    let store = Store::temporary().unwrap();
    let fetcher = StubFetcher::default().page(
        "https://a.example/",
        &html("A", "<p>home page</p>", &["/about", "https://a.example/contact", "https://other.example/"]),
    );
    let (allowed, frontier) = local(&["https://a.example/"], dir.path());

    let mut crawler = Crawler::new(&store, frontier, fetcher, allowed, config(Some(1)));
    let report = crawler.run().await.unwrap();

    assert_eq!(report.indexed, 1);
    let queued: Vec<&String> = crawler.frontier().urls().collect();
    assert_eq!(queued, vec!["https://a.example/about", "https://a.example/contact"]);
    assert!(store.site_by_url("https://other.example/").unwrap().is_none());
    assert_eq!(crawler.fetcher().hits("https://other.example/"), 0);
}

#[tokio::test]
async fn pages_linked_twice_are_fetched_once() {
    let dir = tempdir().unwrap();
    let store = Store::temporary().unwrap();
    let fetcher = StubFetcher::default()
        .page("https://a.example/", &html("A", "<p>rust crawler</p>", &["/x", "/x", "/y"]))
        .page("https://a.example/x", &html("X", "<p>crawler index</p>", &["/y"]))
        .page("https://a.example/y", &html("Y", "<p>index rust</p>", &[]));
    let (allowed, frontier) = local(&["https://a.example/"], dir.path());

    let mut crawler = Crawler::new(&store, frontier, fetcher, allowed, config(None));
    let report = crawler.run().await.unwrap();

    assert_eq!((report.indexed, report.failed, report.remaining), (3, 0, 0));
    assert_eq!(crawler.fetcher().hits("https://a.example/x"), 1);
    assert_eq!(crawler.fetcher().hits("https://a.example/y"), 1);
    assert_eq!(store.stats().sites, 3);
    assert_eq!(store.keyword("crawler").unwrap().unwrap().document_frequency, 2);
    assert_eq!(store.keyword("rust").unwrap().unwrap().document_frequency, 2);
}

#[tokio::test]
async fn fetch_failures_are_skipped() {
    let dir = tempdir().unwrap();
    let store = Store::temporary().unwrap();
    let fetcher = StubFetcher::default().page("https://a.example/", &html("A", "<p>home</p>", &["/missing"]));
    let (allowed, frontier) = local(&["https://a.example/"], dir.path());

    let mut crawler = Crawler::new(&store, frontier, fetcher, allowed, config(None));
    let report = crawler.run().await.unwrap();

    assert_eq!((report.indexed, report.failed, report.remaining), (1, 1, 0));
    assert!(!store.is_indexed("https://a.example/missing").unwrap());
}

#[tokio::test]
async fn postings_hold_ordered_positions() {
    let dir = tempdir().unwrap();
    let store = Store::temporary().unwrap();
    let body = "<p>Crawlers crawl the web and crawlers index the web for the index</p>";
    let fetcher = StubFetcher::default().page("https://a.example/", &html("A", body, &[]));
    let (allowed, frontier) = local(&["https://a.example/"], dir.path());

    Crawler::new(&store, frontier, fetcher, allowed, config(None)).run().await.unwrap();

    let site = store.site_by_url("https://a.example/").unwrap().unwrap();
    let postings = store.postings_for_site(site.site_id).unwrap();
    assert_eq!(postings.len(), site.doc_length as usize);
    for p in &postings {
        assert_eq!(p.term_frequency as usize, p.positions.len());
        assert!(p.positions.windows(2).all(|w| w[0] < w[1]));
    }
    let crawlers = store.keyword("crawlers").unwrap().unwrap().keyword_id;
    let p = postings.iter().find(|p| p.keyword_id == crawlers).unwrap();
    // "a" is the title, which leads the page text
    assert_eq!(p.positions, vec![1, 6]);
}

#[tokio::test]
async fn repeated_site_title_falls_back_to_heading() {
    let dir = tempdir().unwrap();
    let store = Store::temporary().unwrap();
    let fetcher = StubFetcher::default()
        .page("https://a.example/", &html("Acme", "<p>welcome</p>", &["/pricing", "/blog"]))
        .page("https://a.example/pricing", &html("Acme", "<h1>Pricing</h1><p>plans</p>", &[]))
        .page("https://a.example/blog", &html("Acme Blog", "<h1>Posts</h1>", &[]));
    let (allowed, frontier) = local(&["https://a.example/"], dir.path());

    let mut crawler = Crawler::new(&store, frontier, fetcher, allowed, config(None));
    crawler.run().await.unwrap();

    let title = |u: &str| store.site_by_url(u).unwrap().unwrap().title;
    assert_eq!(title("https://a.example/pricing"), "Pricing");
    assert_eq!(title("https://a.example/blog"), "Acme Blog");
    // the root page was indexed first, so its title never had to be fetched again
    assert_eq!(crawler.fetcher().hits("https://a.example/"), 1);
}

#[tokio::test]
async fn restart_resumes_from_checkpoint() {
    let dir = tempdir().unwrap();
    let store = Store::temporary().unwrap();
    Checkpoint::new(dir.path().join("frontier.json")).save(&vec!["https://a.example/x".to_string()]).unwrap();
    let fetcher = StubFetcher::default()
        .page("https://a.example/", &html("A", "<p>home</p>", &[]))
        .page("https://a.example/x", &html("X", "<p>resumed</p>", &[]));
    let (allowed, frontier) = local(&["https://a.example/"], dir.path());

    let mut crawler = Crawler::new(&store, frontier, fetcher, allowed, config(None));
    let report = crawler.run().await.unwrap();

    assert_eq!(report.indexed, 1);
    assert!(store.is_indexed("https://a.example/x").unwrap());
    assert!(!store.is_indexed("https://a.example/").unwrap());
    let saved = Checkpoint::new(dir.path().join("frontier.json")).load().unwrap();
    assert_eq!(saved, Some(vec![]));
}

#[tokio::test]
async fn shared_queue_is_drained_and_fed() {
    let store = Store::temporary().unwrap();
    store.enqueue("https://a.example/").unwrap();
    store.enqueue("https://other.example/").unwrap();
    let fetcher = StubFetcher::default()
        .page("https://a.example/", &html("A", "<p>home</p>", &["/next"]))
        .page("https://a.example/next", &html("N", "<p>next</p>", &[]));
    let allowed = AllowedHosts::from_seeds(["https://a.example/"]);

    let mut crawler = Crawler::new(&store, SharedQueueFrontier::new(&store), fetcher, allowed, config(None));
    let report = crawler.run().await.unwrap();

    assert_eq!(report.indexed, 2);
    assert_eq!(store.stats().known_pages, 0);
    assert!(store.is_indexed("https://a.example/next").unwrap());
    assert!(!store.is_indexed("https://other.example/").unwrap());
    assert_eq!(crawler.fetcher().hits("https://other.example/"), 0);
}

#[tokio::test]
async fn robots_is_read_once_per_host() {
    let fetcher = StubFetcher::default().page("https://a.example/robots.txt", "User-agent: *\nCrawl-delay: 5\n");
    let mut tracker = PolitenessTracker::default();

    for _ in 0..3 {
        assert_eq!(tracker.delay_for("a.example", &fetcher).await, Duration::from_secs(5));
        assert_eq!(tracker.delay_for("b.example", &fetcher).await, Duration::from_secs(3));
    }
    assert_eq!(fetcher.hits("https://a.example/robots.txt"), 1);
    assert_eq!(fetcher.hits("https://b.example/robots.txt"), 1);
    assert_eq!(tracker.cached_hosts(), 2);
}

/// Treats every token as a content word.
struct KeepAll;

impl Tagger for KeepAll {
    fn tag(&self, tokens: &[String]) -> Vec<PartOfSpeech> {
        vec![PartOfSpeech::Other; tokens.len()]
    }
}

#[tokio::test]
async fn custom_tagger_drives_extraction() {
    let dir = tempdir().unwrap();
    let store = Store::temporary().unwrap();
    let fetcher = StubFetcher::default().page("https://a.example/", &html("A", "<p>the index</p>", &[]));
    let (allowed, frontier) = local(&["https://a.example/"], dir.path());

    let mut crawler = Crawler::new(&store, frontier, fetcher, allowed, config(None)).with_tagger(KeepAll);
    assert_eq!(crawler.state(), CrawlState::Idle);
    crawler.run().await.unwrap();

    assert_eq!(crawler.state(), CrawlState::Done);
    assert_eq!(store.keyword("the").unwrap().unwrap().document_frequency, 1);
    assert_eq!(store.site_by_url("https://a.example/").unwrap().unwrap().doc_length, 3);
    assert_eq!(crawler.politeness().cached_hosts(), 1);
}

/// Local frontier whose `pop` fails, as if the process died right after the commit.
struct DiesBeforePop(LocalFrontier);

impl Frontier for DiesBeforePop {
    fn peek(&mut self) -> Result<Option<String>> {
        self.0.peek()
    }

    fn pop(&mut self) -> Result<()> {
        bail!("killed")
    }

    fn extend(&mut self, urls: Vec<String>) -> Result<()> {
        self.0.extend(urls)
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

#[tokio::test]
async fn links_survive_a_crash_after_commit() {
    let dir = tempdir().unwrap();
    let store = Store::temporary().unwrap();
    let site = || {
        StubFetcher::default()
            .page("https://a.example/", &html("A", "<p>home</p>", &["/about"]))
            .page("https://a.example/about", &html("About", "<p>team</p>", &[]))
    };

    let (allowed, frontier) = local(&["https://a.example/"], dir.path());
    let mut first = Crawler::new(&store, DiesBeforePop(frontier), site(), allowed, config(None));
    assert!(first.run().await.is_err());
    assert!(store.is_indexed("https://a.example/").unwrap());

    let (allowed, frontier) = local(&["https://a.example/"], dir.path());
    let mut restarted = Crawler::new(&store, frontier, site(), allowed, config(None));
    let report = restarted.run().await.unwrap();

    // the committed page is skipped, its link is not lost
    assert_eq!(report.indexed, 1);
    assert_eq!(store.site_by_url("https://a.example/about").unwrap().unwrap().title, "About");
    assert_eq!(store.stats().sites, 2);
}

#[tokio::test(start_paused = true)]
async fn every_fetch_waits_out_the_host_delay() {
    let dir = tempdir().unwrap();
    let store = Store::temporary().unwrap();
    let fetcher = StubFetcher::default()
        .page("https://a.example/robots.txt", "User-agent: *\nCrawl-delay: 2\n")
        .page("https://a.example/", &html("Acme", "<p>home</p>", &[]))
        .page("https://a.example/x", &html("Acme", "<h1>X</h1>", &["/y"]))
        .page("https://a.example/y", &html("Y", "<p>y</p>", &[]));
    let (allowed, frontier) = local(&["https://a.example/x"], dir.path());
    let start = Instant::now();

    let mut crawler = Crawler::new(&store, frontier, fetcher, allowed, config(None));
    crawler.run().await.unwrap();

    let at = |url: &str| crawler.fetcher().first_request(url).unwrap() - start;
    let (robots, x, root, y) =
        (at("https://a.example/robots.txt"), at("https://a.example/x"), at("https://a.example/"), at("https://a.example/y"));
    assert!(robots < Duration::from_secs(1));
    // page, then the root page for its title, then the next page, 2 s apart
    assert!(x >= Duration::from_secs(2));
    assert!(root >= x + Duration::from_secs(2));
    assert!(y >= root + Duration::from_secs(2));
    assert!(y < Duration::from_secs(7));
    assert_eq!(crawler.fetcher().hits("https://a.example/robots.txt"), 1);
}
