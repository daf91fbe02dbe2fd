//! Search keywords wrapped in full-width lenticular brackets (`【…】`)

use regex::Regex;
use std::sync::LazyLock;

use super::MAX_EXTRACTED;

static KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"【([^【】\n]+)】").expect("keyword pattern is valid"));

/// Collect up to four bracketed keywords from `reply`, in order
///
/// Scanning stops as soon as the fourth keyword is found. Blank brackets are
/// ignored and do not count toward the cap.
pub fn extract_keywords(reply: &str) -> Vec<String> {
    KEYWORD_RE
        .captures_iter(reply)
        .filter_map(|caps| {
            let keyword = caps.get(1)?.as_str().trim();
            (!keyword.is_empty()).then(|| keyword.to_string())
        })
        .take(MAX_EXTRACTED)
        .collect()
}
