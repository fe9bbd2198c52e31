use lazy_static::lazy_static;
use reqwest::{header, Client};
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("not an html document: {0}")]
    NotHtml(String),
}

/// Retrieves raw documents over the network.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    /// Body of an HTML page.
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;

    /// Body of a plain-text resource such as robots.txt.
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        self.fetch(url).await
    }
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response, FetchError> {
        let resp = self.client.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        Ok(resp)
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let resp = self.get(url).await?;
        if let Some(ct) = resp.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            if !ct.starts_with("text/html") {
                return Err(FetchError::NotHtml(ct.to_string()));
            }
        }
        let bytes = resp.bytes().await?;
        if bytes.len() > MAX_BODY_BYTES {
            return Err(FetchError::NotHtml(format!("{} byte body", bytes.len())));
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        Ok(self.get(url).await?.text().await?)
    }
}

/// What the crawler keeps from a parsed HTML document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub text: String,
    pub title: Option<String>,
    /// First level-1 heading
    pub heading: Option<String>,
    /// Raw href values, in document order
    pub links: Vec<String>,
}

lazy_static! {
    static ref SEL_TITLE: Selector = Selector::parse("title").expect("valid selector");
    static ref SEL_H1: Selector = Selector::parse("h1").expect("valid selector");
    static ref SEL_A: Selector = Selector::parse("a[href]").expect("valid selector");
}

const INVISIBLE: [&str; 4] = ["script", "style", "noscript", "template"];

pub fn parse_page(html: &str) -> Page {
    let doc = Html::parse_document(html);
    let first_text = |sel: &Selector| {
        doc.select(sel)
            .next()
            .map(|n| n.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    };
    let title = first_text(&SEL_TITLE);
    let heading = first_text(&SEL_H1);

    let mut chunks = Vec::new();
    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else { continue };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| INVISIBLE.contains(&e.name())))
            .unwrap_or(false);
        if !hidden && !text.trim().is_empty() {
            chunks.push(text.trim());
        }
    }

    let links = doc
        .select(&SEL_A)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect();

    Page { text: chunks.join("\n"), title, heading, links }
}
