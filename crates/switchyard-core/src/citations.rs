//! Markdown link extraction.
//!
//! `[label](url)` links in an answer are replaced by `[n]` markers, numbered
//! in order of first appearance. A repeated link reuses its marker.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use switchyard_types::Citation;

static LINK_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn link_regex() -> Option<&'static Regex> {
    LINK_REGEX.get_or_init(|| Regex::new(r"\[([^\[\]]*)\]\(([^()\s]+)\)").ok()).as_ref()
}

/// Rewrite `text` with citation markers and return the extracted links.
pub fn extract_citations(text: &str) -> (String, Vec<Citation>) {
    let Some(re) = link_regex() else {
        return (text.to_string(), Vec::new());
    };

    let mut citations: Vec<Citation> = Vec::new();
    let rewritten = re.replace_all(text, |caps: &Captures<'_>| {
        let label = caps[1].trim();
        let url = &caps[2];
        let existing = citations.iter().find(|c| c.label == label && c.url == url).map(|c| c.id);
        let id = existing.unwrap_or_else(|| {
            let id = citations.len() as u32 + 1;
            citations.push(Citation { id, label: label.to_string(), url: url.to_string() });
            id
        });
        format!("[{}]", id)
    });

    (rewritten.into_owned(), citations)
}
