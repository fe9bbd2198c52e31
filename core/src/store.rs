use crate::{KeywordId, KeywordRow, Posting, Site, SiteId, StoreStats};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError, Transactional,
};
use sled::{Db, IVec, Tree};
use std::collections::HashMap;
use std::path::Path;

/// Position of an entry in the shared `known_pages` queue.
pub type QueueKey = u64;

/// Posting value; the (site, keyword) pair lives in the key.
#[derive(Debug, Serialize, Deserialize)]
struct PostingRow {
    term_frequency: u32,
    positions: Vec<u32>,
}

/// Everything one document contributes to the index, written atomically.
#[derive(Debug, Clone, Default)]
pub struct IndexBatch {
    pub site: Option<Site>,
    /// Final keyword rows for keywords whose counters changed or are new
    pub keyword_rows: Vec<(String, KeywordRow)>,
    /// Keyword -> positions for every keyword of the document
    pub postings: Vec<(String, Vec<u32>)>,
    /// Keywords whose postings for this site must go
    pub stale: Vec<KeywordId>,
}

/// The index tables on top of sled trees:
///
/// - `sites`: site_id -> Site, `site_urls`: url -> site_id
/// - `keywords`: keyword -> KeywordRow, `keyword_names`: keyword_id -> keyword
/// - `postings`: site_id ++ keyword_id -> PostingRow
/// - `known_pages`: sequence -> url (the shared crawl queue)
///
/// Integer keys are big-endian so trees iterate in numeric order.
pub struct Store {
    db: Db,
    sites: Tree,
    site_urls: Tree,
    keywords: Tree,
    keyword_names: Tree,
    postings: Tree,
    known_pages: Tree,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).with_context(|| format!("failed to open store at {}", path.display()))?;
        Self::from_db(db)
    }

    /// Store that disappears when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open().context("failed to open temporary store")?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let tree = |name: &str| db.open_tree(name).with_context(|| format!("failed to open table {name}"));
        Ok(Self {
            sites: tree("sites")?,
            site_urls: tree("site_urls")?,
            keywords: tree("keywords")?,
            keyword_names: tree("keyword_names")?,
            postings: tree("postings")?,
            known_pages: tree("known_pages")?,
            db,
        })
    }

    /// Fresh, never reused id for a new row.
    pub fn generate_id(&self) -> Result<u64> {
        Ok(self.db.generate_id()?)
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush().context("failed to flush store")?;
        Ok(())
    }

    // --- sites ---

    pub fn is_indexed(&self, url: &str) -> Result<bool> {
        Ok(self.site_urls.contains_key(url.as_bytes())?)
    }

    pub fn site_by_url(&self, url: &str) -> Result<Option<Site>> {
        let Some(id) = self.site_urls.get(url.as_bytes())? else { return Ok(None) };
        self.site(decode_id(&id)?)
    }

    pub fn site(&self, site_id: SiteId) -> Result<Option<Site>> {
        match self.sites.get(site_id.to_be_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    // --- keywords ---

    /// Rows for the given keywords that exist, in one pass.
    pub fn select_keywords<S: AsRef<str>>(&self, words: &[S]) -> Result<HashMap<String, KeywordRow>> {
        let mut out = HashMap::with_capacity(words.len());
        for word in words {
            let word = word.as_ref();
            if let Some(bytes) = self.keywords.get(word.as_bytes())? {
                out.insert(word.to_string(), bincode::deserialize(&bytes)?);
            }
        }
        Ok(out)
    }

    pub fn keyword(&self, word: &str) -> Result<Option<KeywordRow>> {
        Ok(self.select_keywords(&[word][..])?.remove(word))
    }

    /// Keyword strings for the given ids; unknown ids are left out.
    pub fn keyword_names(&self, ids: &[KeywordId]) -> Result<HashMap<KeywordId, String>> {
        let mut out = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(bytes) = self.keyword_names.get(id.to_be_bytes())? {
                out.insert(*id, String::from_utf8(bytes.to_vec())?);
            }
        }
        Ok(out)
    }

    // --- postings ---

    pub fn postings_for_site(&self, site_id: SiteId) -> Result<Vec<Posting>> {
        let mut out = Vec::new();
        for entry in self.postings.scan_prefix(site_id.to_be_bytes()) {
            let (key, value) = entry?;
            let keyword_id = decode_id(key.get(8..).unwrap_or_default())?;
            let row: PostingRow = bincode::deserialize(&value)?;
            out.push(Posting { site_id, keyword_id, term_frequency: row.term_frequency, positions: row.positions });
        }
        Ok(out)
    }

    /// Write a document's site row, keyword counters and postings in one
    /// transaction: either all of it lands or none of it does.
    ///
    /// Posting keywords are resolved to ids inside the transaction, after
    /// the keyword rows are written. Returns the number of postings written.
    pub fn apply(&self, batch: &IndexBatch) -> Result<usize> {
        let site = batch.site.as_ref().ok_or_else(|| anyhow!("index batch without a site"))?;
        let site_key = site.site_id.to_be_bytes();
        let site_row = bincode::serialize(site)?;
        let keyword_rows = batch
            .keyword_rows
            .iter()
            .map(|(word, row)| -> Result<_> { Ok((word.as_str(), row.keyword_id, bincode::serialize(row)?)) })
            .collect::<Result<Vec<_>>>()?;
        let posting_rows = batch
            .postings
            .iter()
            .map(|(word, positions)| -> Result<_> {
                let row = PostingRow { term_frequency: positions.len() as u32, positions: positions.clone() };
                Ok((word.as_str(), bincode::serialize(&row)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let trees = (&self.sites, &self.site_urls, &self.keywords, &self.keyword_names, &self.postings);
        let written = trees
            .transaction(|(sites, site_urls, keywords, keyword_names, postings)| -> ConflictableTransactionResult<usize, anyhow::Error> {
                sites.insert(&site_key[..], site_row.as_slice())?;
                site_urls.insert(site.url.as_bytes(), &site_key[..])?;

                for (word, id, row) in &keyword_rows {
                    keywords.insert(word.as_bytes(), row.as_slice())?;
                    keyword_names.insert(&id.to_be_bytes()[..], word.as_bytes())?;
                }

                for (word, row) in &posting_rows {
                    let Some(kw) = keywords.get(word.as_bytes())? else {
                        return Err(ConflictableTransactionError::Abort(anyhow!("keyword {word:?} has no row")));
                    };
                    let kw: KeywordRow = bincode::deserialize(&kw)
                        .map_err(|e| ConflictableTransactionError::Abort(anyhow::Error::new(e)))?;
                    postings.insert(posting_key(site.site_id, kw.keyword_id).as_slice(), row.as_slice())?;
                }

                for keyword_id in &batch.stale {
                    postings.remove(posting_key(site.site_id, *keyword_id).as_slice())?;
                }
                Ok(posting_rows.len())
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => anyhow::Error::new(e).context("index transaction failed"),
            })?;
        Ok(written)
    }

    // --- known_pages queue ---

    pub fn enqueue(&self, url: &str) -> Result<QueueKey> {
        let key = self.generate_id()?;
        self.known_pages.insert(key.to_be_bytes(), url.as_bytes())?;
        Ok(key)
    }

    /// Oldest queued entry, left in place.
    pub fn queue_head(&self) -> Result<Option<(QueueKey, String)>> {
        match self.known_pages.first()? {
            Some((key, url)) => Ok(Some((decode_id(&key)?, ivec_to_string(url)?))),
            None => Ok(None),
        }
    }

    pub fn dequeue(&self, key: QueueKey) -> Result<()> {
        self.known_pages.remove(key.to_be_bytes())?;
        Ok(())
    }

    pub fn queued_urls(&self) -> Result<Vec<String>> {
        self.known_pages.iter().values().map(|v| -> Result<String> { ivec_to_string(v?) }).collect()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            sites: self.sites.len(),
            keywords: self.keywords.len(),
            postings: self.postings.len(),
            known_pages: self.known_pages.len(),
        }
    }
}

fn posting_key(site_id: SiteId, keyword_id: KeywordId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&site_id.to_be_bytes());
    key[8..].copy_from_slice(&keyword_id.to_be_bytes());
    key
}

fn decode_id(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| anyhow!("corrupt id of {} bytes", bytes.len()))?;
    Ok(u64::from_be_bytes(raw))
}

fn ivec_to_string(v: IVec) -> Result<String> {
    Ok(String::from_utf8(v.to_vec())?)
}
