//! Turns one document's keywords into index rows.
//!
//! `document_frequency` always equals the number of postings a keyword has:
//! a commit only counts keywords that are new to the site and discounts the
//! ones that disappeared from it, so committing the same document again
//! changes nothing but the overwritten rows.

use crate::store::{IndexBatch, Store};
use crate::{KeywordRow, Keywords, Site, SiteId};
use anyhow::Result;
use std::collections::HashSet;

pub struct IndexWriter<'a> {
    store: &'a Store,
}

impl<'a> IndexWriter<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Index one document. `doc_length` is the number of distinct keywords
    /// the extractor kept, i.e. `keywords.len()` for a full extraction.
    pub fn commit(&self, url: &str, keywords: &Keywords, doc_length: u32, title: &str) -> Result<SiteId> {
        let site_id = match self.store.site_by_url(url)? {
            Some(site) => site.site_id,
            None => self.store.generate_id()?,
        };
        let site = Site { site_id, url: url.to_string(), doc_length, title: title.to_string() };

        let previous: HashSet<_> = self.store.postings_for_site(site_id)?.into_iter().map(|p| p.keyword_id).collect();
        let words: Vec<&str> = keywords.keys().map(String::as_str).collect();
        let existing = self.store.select_keywords(&words[..])?;

        let mut keyword_rows = Vec::new();
        let mut current = HashSet::with_capacity(words.len());
        for word in &words {
            match existing.get(*word) {
                Some(row) => {
                    current.insert(row.keyword_id);
                    if !previous.contains(&row.keyword_id) {
                        let row = KeywordRow { document_frequency: row.document_frequency + 1, ..*row };
                        keyword_rows.push((word.to_string(), row));
                    }
                }
                None => {
                    let row = KeywordRow { keyword_id: self.store.generate_id()?, document_frequency: 1 };
                    keyword_rows.push((word.to_string(), row));
                }
            }
        }

        let stale: Vec<_> = previous.difference(&current).copied().collect();
        if !stale.is_empty() {
            let names: Vec<String> = self.store.keyword_names(&stale)?.into_values().collect();
            for (word, row) in self.store.select_keywords(&names[..])? {
                let row = KeywordRow { document_frequency: row.document_frequency.saturating_sub(1), ..row };
                keyword_rows.push((word, row));
            }
        }

        let batch = IndexBatch {
            site: Some(site),
            keyword_rows,
            postings: keywords.iter().map(|(w, p)| (w.clone(), p.clone())).collect(),
            stale,
        };
        let written = self.store.apply(&batch)?;
        tracing::debug!(url, site_id, postings = written, dropped = batch.stale.len(), "document committed");
        Ok(site_id)
    }
}
