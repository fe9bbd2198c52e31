use anyhow::{anyhow, Context, Result};
use clap::Parser;
use spider_core::{AllowedHosts, Checkpoint, CrawlConfig, Crawler, HttpFetcher, LocalFrontier, Store};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

/// Crawl the seed sites into the index, checkpointing the frontier locally.
#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl seed sites into the keyword index, resumable from a local checkpoint")]
struct Cli {
    /// Path to a file with seed URLs (one per line)
    #[arg(long)]
    seeds: String,
    /// Index database directory
    #[arg(long, env = "SPIDER_DB", default_value = "./data/index.sled")]
    db: String,
    /// Frontier checkpoint file; an existing one is resumed instead of the seeds
    #[arg(long, default_value = "./data/frontier.json")]
    checkpoint: String,
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
}

fn load_seeds(path: &str) -> Result<Vec<String>> {
    let mut seeds = Vec::new();
    for line in BufReader::new(File::open(path).with_context(|| format!("cannot open seeds file {path}"))?).lines() {
        let s = line?.trim().to_string();
        if s.is_empty() || s.starts_with('#') { continue; }
        match Url::parse(&s).or_else(|_| Url::parse(&format!("https://{}", s))) {
            Ok(u) => seeds.push(u.to_string()),
            Err(e) => tracing::warn!(seed = %s, error = %e, "ignoring invalid seed"),
        }
    }
    if seeds.is_empty() { return Err(anyhow!("no valid seeds")); }
    Ok(seeds)
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let seeds = load_seeds(&args.seeds)?;
    let allowed = AllowedHosts::from_seeds(seeds.iter().map(String::as_str));
    let store = Store::open(&args.db)?;
    let frontier = LocalFrontier::open(&seeds, Checkpoint::new(&args.checkpoint))?;
    tracing::info!(seeds = seeds.len(), hosts = allowed.len(), pending = frontier.urls().count(), db = %args.db, "crawler starting");

    let fetcher = HttpFetcher::new(&args.user_agent, Duration::from_secs(args.timeout_secs))?;
    let config = CrawlConfig {
        default_delay: Duration::try_from_secs_f64(args.default_delay_secs).context("invalid --default-delay-secs")?,
        max_pages: args.max_pages,
    };
    let report = Crawler::new(&store, frontier, fetcher, allowed, config).run().await?;
    store.flush()?;

    eprintln!("done: indexed={} failed={} remaining={} -> {}", report.indexed, report.failed, report.remaining, args.db);
    Ok(())
}
