use std::collections::HashSet;
use url::Url;

/// Hostnames a crawl may visit, fixed from the seed list when the run starts.
#[derive(Debug, Clone, Default)]
pub struct AllowedHosts {
    hosts: HashSet<String>,
}

impl AllowedHosts {
    pub fn from_seeds<'a>(seeds: impl IntoIterator<Item = &'a str>) -> Self {
        let hosts = seeds
            .into_iter()
            .filter_map(|s| Url::parse(s).ok())
            .filter_map(|u| u.host_str().map(str::to_string))
            .collect();
        Self { hosts }
    }

    pub fn admits(&self, url: &Url) -> bool {
        url.host_str().map_or(false, |h| self.hosts.contains(h))
    }

    pub fn admits_str(&self, url: &str) -> bool {
        Url::parse(url).map_or(false, |u| self.admits(&u))
    }

    pub fn len(&self) -> usize { self.hosts.len() }
    pub fn is_empty(&self) -> bool { self.hosts.is_empty() }
}

/// Turn an href found on `page` into an absolute https URL on an allowed
/// host, or `None` when it should be dropped.
pub fn normalize(href: &str, page: &Url, allowed: &AllowedHosts) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href == "/" {
        return None;
    }
    let url = match Url::parse(href) {
        Ok(url) if url.scheme() == "https" => url,
        // some other scheme: http, mailto, javascript, ...
        Ok(_) => return None,
        Err(_) if href.starts_with("https:") => return None,
        Err(_) => {
            let origin = page.host_str()?;
            let absolute = if href.starts_with('/') {
                format!("https://{origin}{href}")
            } else {
                format!("https://{origin}/{href}")
            };
            Url::parse(&absolute).ok()?
        }
    };
    allowed.admits(&url).then_some(url)
}

/// Links the crawler never follows even when in scope: in-page anchors and
/// XML documents (sitemaps, feeds).
pub fn is_followable(url: &Url) -> bool {
    url.fragment().is_none() && !url.path().ends_with(".xml")
}
