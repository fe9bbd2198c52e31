use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use spider_core::{AllowedHosts, CrawlConfig, Crawler, HttpFetcher, SharedQueueFrontier, Store};
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Index pages from the shared known_pages queue", long_about = None)]
struct Cli {
    /// Index database directory
    #[arg(long, global = true, env = "SPIDER_DB", default_value = "./data/index.sled")]
    db: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append URLs to the shared queue
    Enqueue {
        /// Absolute URLs
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Drain the queue, indexing every page on the hosts queued at startup
    Run {
        /// Crawl delay for hosts whose robots.txt sets none
        #[arg(long, default_value_t = 3.0)]
        default_delay_secs: f64,
        /// Stop after indexing this many pages
        #[arg(long)]
        max_pages: Option<usize>,
        /// Request timeout seconds
        #[arg(long, default_value_t = 12)]
        timeout_secs: u64,
        /// User-Agent string for robots.txt and page requests
        #[arg(long, default_value = "handmade-spider/0.1")]
        user_agent: String,
    },
    /// Print row counts of every table
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let store = Store::open(&cli.db)?;

    match cli.command {
        Commands::Enqueue { urls } => enqueue(&store, &urls)?,
        Commands::Run { default_delay_secs, max_pages, timeout_secs, user_agent } => {
            let config = CrawlConfig {
                default_delay: Duration::try_from_secs_f64(default_delay_secs).context("invalid --default-delay-secs")?,
                max_pages,
            };
            let fetcher = HttpFetcher::new(&user_agent, Duration::from_secs(timeout_secs))?;
            run(&store, fetcher, config).await?;
        }
        Commands::Stats => {
            println!("{}", serde_json::to_string_pretty(&store.stats())?);
        }
    }
    store.flush()
}

fn enqueue(store: &Store, urls: &[String]) -> Result<()> {
    for raw in urls {
        let url = Url::parse(raw).with_context(|| format!("invalid url {raw}"))?;
        if url.host_str().is_none() {
            return Err(anyhow!("url without host: {raw}"));
        }
        store.enqueue(url.as_str())?;
    }
    tracing::info!(added = urls.len(), queued = store.stats().known_pages, "enqueued");
    Ok(())
}

async fn run(store: &Store, fetcher: HttpFetcher, config: CrawlConfig) -> Result<()> {
    let queued = store.queued_urls()?;
    if queued.is_empty() {
        tracing::info!("queue is empty, nothing to do");
        return Ok(());
    }
    let allowed = AllowedHosts::from_seeds(queued.iter().map(String::as_str));
    tracing::info!(queued = queued.len(), hosts = allowed.len(), "indexer starting");

    let report = Crawler::new(store, SharedQueueFrontier::new(store), fetcher, allowed, config).run().await?;
    eprintln!("done: indexed={} failed={} remaining={}", report.indexed, report.failed, report.remaining);
    Ok(())
}
