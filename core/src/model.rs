use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type SiteId = u64;
pub type KeywordId = u64;

/// Normalized keyword -> zero-based token offsets, in order of occurrence.
pub type Keywords = BTreeMap<String, Vec<u32>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub site_id: SiteId,
    pub url: String,
    /// Number of distinct keywords extracted from the page
    pub doc_length: u32,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRow {
    pub keyword_id: KeywordId,
    pub document_frequency: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub site_id: SiteId,
    pub keyword_id: KeywordId,
    pub term_frequency: u32,
    pub positions: Vec<u32>, // strictly increasing
}

impl Posting {
    pub fn new(site_id: SiteId, keyword_id: KeywordId, positions: Vec<u32>) -> Self {
        Self { site_id, keyword_id, term_frequency: positions.len() as u32, positions }
    }
}

/// Row counts per table, for operators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub sites: usize,
    pub keywords: usize,
    pub postings: usize,
    pub known_pages: usize,
}
