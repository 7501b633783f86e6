//! Utility helpers shared by the matcher and the panel validator: a
//! memoised regex compiler and markup stripping for compose-region HTML.

use ahash::AHasher;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Compiled sets keyed by a hash of the pattern list.  Failed compiles are
/// never inserted, so a broken list fails again on every attempt.
static SET_CACHE: Lazy<DashMap<u64, Arc<RegexSet>>> = Lazy::new(DashMap::new);

/// Given a list of regex patterns, return a shared `RegexSet`.  Patterns are
/// compiled as written: unanchored and case-sensitive.
pub fn regex_set_for(list: &[String]) -> Result<Arc<RegexSet>, regex::Error> {
    let mut hasher = AHasher::default();
    list.len().hash(&mut hasher);
    for pat in list {
        pat.hash(&mut hasher);
    }
    let key = hasher.finish();
    if let Some(existing) = SET_CACHE.get(&key) {
        return Ok(existing.clone());
    }
    let set = Arc::new(RegexSet::new(list)?);
    SET_CACHE.insert(key, set.clone());
    Ok(set)
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// Reduce an HTML fragment to its text content.  Tags are dropped without
/// inserting separators, matching what `textContent` yields for
/// `<p>a</p><p>b</p>` (`"ab"`).
pub fn strip_markup(html: &str) -> String {
    let text = TAG_RE.replace_all(html, "");
    decode_entities(&text)
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    // &amp; last so "&amp;lt;" stays "&lt;"
    text.replace("&nbsp;", "\u{a0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
