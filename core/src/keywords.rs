use crate::tagger::Tagger;
use crate::Keywords;
use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w+").expect("valid regex");
}

/// Split text into lower-cased word tokens after NFKC normalization.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    WORD.find_iter(&normalized).map(|m| m.as_str().to_string()).collect()
}

/// Map every relevant keyword of `text` to the positions it occupies.
///
/// Positions count every tagged token, including the ones filtered out, so
/// they stay comparable with offsets in the page text.
pub fn extract_keywords(text: &str, tagger: &impl Tagger) -> Keywords {
    let tokens = tokenize(text);
    let tags = tagger.tag(&tokens);
    let mut keywords = Keywords::new();
    for (pos, (token, tag)) in tokens.into_iter().zip(tags).enumerate() {
        if tag.is_irrelevant() { continue; }
        keywords.entry(token).or_default().push(pos as u32);
    }
    keywords
}

/// Pick the title stored for a page.
///
/// Sites often repeat one title on every page; when the page title equals
/// the root page's, the first `<h1>` is more telling.
pub fn choose_title(page_title: Option<&str>, root_title: Option<&str>, heading: Option<&str>) -> String {
    let Some(title) = page_title.map(str::trim) else { return String::new() };
    match (root_title.map(str::trim), heading.map(str::trim)) {
        (Some(root), Some(h1)) if root == title && !h1.is_empty() => h1.to_string(),
        _ => title.to_string(),
    }
}
