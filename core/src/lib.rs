//! Crawl-frontier and inverted-index engine.
//!
//! A crawl pops URLs from a [`Frontier`], waits out the host's crawl delay,
//! fetches and parses the page, extracts weighted keyword positions and
//! writes them to the [`Store`] through the [`IndexWriter`].

pub mod checkpoint;
pub mod crawl;
pub mod fetch;
pub mod frontier;
pub mod keywords;
pub mod links;
pub mod model;
pub mod politeness;
pub mod robots;
pub mod store;
pub mod tagger;
pub mod writer;

pub use checkpoint::Checkpoint;
pub use crawl::{CrawlConfig, CrawlReport, CrawlState, Crawler};
pub use fetch::{FetchError, Fetcher, HttpFetcher, Page};
pub use frontier::{Frontier, LocalFrontier, SharedQueueFrontier};
pub use links::AllowedHosts;
pub use model::*;
pub use politeness::PolitenessTracker;
pub use store::Store;
pub use tagger::{LexiconTagger, PartOfSpeech, Tagger};
pub use writer::IndexWriter;
