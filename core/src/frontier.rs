//! The backlog of URLs still to crawl.
//!
//! Entries are consumed in FIFO order and are not deduplicated on the way
//! in; a URL queued twice is skipped the second time because its site row
//! already exists by then.

use crate::checkpoint::Checkpoint;
use crate::links::AllowedHosts;
use crate::store::{QueueKey, Store};
use anyhow::Result;
use std::collections::VecDeque;
use url::Url;

pub trait Frontier {
    /// Head of the backlog, left in place until `pop`.
    fn peek(&mut self) -> Result<Option<String>>;

    /// Drop the head once it has been indexed or skipped.
    fn pop(&mut self) -> Result<()>;

    /// Append newly discovered URLs at the tail.
    fn extend(&mut self, urls: Vec<String>) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Next URL worth fetching, or `None` when the crawl is complete.
    ///
    /// Out-of-scope, unparsable and already indexed entries are skipped on
    /// the way. The returned URL stays at the head until `pop`.
    fn next(&mut self, allowed: &AllowedHosts, store: &Store) -> Result<Option<Url>> {
        while let Some(raw) = self.peek()? {
            let url = match Url::parse(&raw) {
                Ok(url) => url,
                Err(_) => {
                    self.skip(&raw, "malformed")?;
                    continue;
                }
            };
            if !allowed.admits(&url) {
                self.skip(&raw, "host not allowed")?;
            } else if store.is_indexed(url.as_str())? {
                self.skip(&raw, "already indexed")?;
            } else {
                return Ok(Some(url));
            }
        }
        Ok(None)
    }

    fn skip(&mut self, url: &str, reason: &str) -> Result<()> {
        tracing::debug!(url, reason, "skipping");
        self.pop()
    }
}

/// In-process frontier persisted to a checkpoint whenever it changes, so a
/// crash loses at most the URL in flight.
pub struct LocalFrontier {
    queue: VecDeque<String>,
    checkpoint: Checkpoint,
}

impl LocalFrontier {
    /// Resume from `checkpoint` if a previous run left one, else start from `seeds`.
    pub fn open(seeds: &[String], checkpoint: Checkpoint) -> Result<Self> {
        let queue = match checkpoint.load()? {
            Some(urls) => {
                tracing::info!(path = %checkpoint.path().display(), pending = urls.len(), "resuming from checkpoint");
                urls.into()
            }
            None => seeds.iter().cloned().collect(),
        };
        Ok(Self { queue, checkpoint })
    }

    pub fn urls(&self) -> impl Iterator<Item = &String> {
        self.queue.iter()
    }
}

impl Frontier for LocalFrontier {
    fn peek(&mut self) -> Result<Option<String>> {
        Ok(self.queue.front().cloned())
    }

    fn pop(&mut self) -> Result<()> {
        self.queue.pop_front();
        self.checkpoint.save(&self.queue)
    }

    /// Saved before the head is committed, so a crash after the commit
    /// cannot lose the head's links.
    fn extend(&mut self, urls: Vec<String>) -> Result<()> {
        if urls.is_empty() {
            return Ok(());
        }
        self.queue.extend(urls);
        self.checkpoint.save(&self.queue)
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Frontier kept in the store's `known_pages` table, shared between runs.
/// Nothing is held locally apart from the key of the current head.
pub struct SharedQueueFrontier<'a> {
    store: &'a Store,
    head: Option<QueueKey>,
}

impl<'a> SharedQueueFrontier<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store, head: None }
    }
}

impl Frontier for SharedQueueFrontier<'_> {
    fn peek(&mut self) -> Result<Option<String>> {
        let head = self.store.queue_head()?;
        self.head = head.as_ref().map(|(key, _)| *key);
        Ok(head.map(|(_, url)| url))
    }

    fn pop(&mut self) -> Result<()> {
        if let Some(key) = self.head.take() {
            self.store.dequeue(key)?;
        }
        Ok(())
    }

    fn extend(&mut self, urls: Vec<String>) -> Result<()> {
        for url in urls {
            self.store.enqueue(&url)?;
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.store.stats().known_pages
    }
}
