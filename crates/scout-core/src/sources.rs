//! Citation extraction from assistant responses.
//!
//! Responses are scanned for URLs, each URL is classified by host into a
//! coarse category, and a couple of keyword heuristics append synthetic
//! entries when the text talks about papers or Wikipedia without citing
//! an actual link. Pure text-to-data: no network, no state.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Academic,
    Encyclopedia,
    Research,
    Web,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Academic => write!(f, "academic"),
            SourceKind::Encyclopedia => write!(f, "encyclopedia"),
            SourceKind::Research => write!(f, "research"),
            SourceKind::Web => write!(f, "web"),
        }
    }
}

/// A citation record attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub kind: SourceKind,
}

impl Source {
    pub fn new(title: impl Into<String>, url: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            title: title.into(),
            url: Some(url.into()),
            kind,
        }
    }
}

/// Generic URL pattern: scheme followed by the character set URLs are
/// built from. The `$-_` range covers `/`, `:`, `?`, `=`, digits and
/// uppercase letters, so full paths and query strings match.
fn url_pattern() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| {
        Regex::new(r"https?://(?:[a-zA-Z0-9]|[$-_@.&+]|[!*(),]|%[0-9a-fA-F]{2})+").unwrap()
    })
}

fn classify(url: &str) -> Source {
    if url.contains("arxiv.org") {
        Source::new("arXiv Academic Paper", url, SourceKind::Academic)
    } else if url.contains("wikipedia.org") {
        Source::new("Wikipedia Article", url, SourceKind::Encyclopedia)
    } else if url.contains("doi.org") {
        Source::new("Research Paper", url, SourceKind::Research)
    } else {
        Source::new("Web Source", url, SourceKind::Web)
    }
}

const ACADEMIC_KEYWORDS: [&str; 4] = ["arxiv", "paper", "research", "study"];
const ENCYCLOPEDIA_KEYWORDS: [&str; 2] = ["wikipedia", "wiki"];

/// Extract citation records from response text.
///
/// URLs are returned in first-seen order, duplicates permitted. Keyword
/// heuristics then append a synthetic repository entry when the text
/// mentions academic or encyclopedic content without a matching link;
/// a real source of the same kind suppresses the synthetic one.
pub fn extract_sources(text: &str) -> Vec<Source> {
    let mut sources: Vec<Source> = url_pattern()
        .find_iter(text)
        .map(|m| classify(m.as_str()))
        .collect();

    let lowered = text.to_lowercase();

    if ACADEMIC_KEYWORDS.iter().any(|k| lowered.contains(k))
        && !sources.iter().any(|s| s.kind == SourceKind::Academic)
    {
        sources.push(Source::new(
            "arXiv Repository",
            "https://arxiv.org",
            SourceKind::Academic,
        ));
    }

    if ENCYCLOPEDIA_KEYWORDS.iter().any(|k| lowered.contains(k))
        && !sources.iter().any(|s| s.kind == SourceKind::Encyclopedia)
    {
        sources.push(Source::new(
            "Wikipedia",
            "https://wikipedia.org",
            SourceKind::Encyclopedia,
        ));
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arxiv_url_classified_academic() {
        let sources = extract_sources("See https://arxiv.org/abs/1234 for details.");
        assert_eq!(sources[0].kind, SourceKind::Academic);
        assert_eq!(sources[0].title, "arXiv Academic Paper");
        assert_eq!(sources[0].url.as_deref(), Some("https://arxiv.org/abs/1234"));
    }

    #[test]
    fn test_classification_precedence() {
        let text = "https://en.wikipedia.org/wiki/Rust https://doi.org/10.1000/x https://example.com/a";
        let sources = extract_sources(text);
        assert_eq!(sources[0].kind, SourceKind::Encyclopedia);
        assert_eq!(sources[0].title, "Wikipedia Article");
        assert_eq!(sources[1].kind, SourceKind::Research);
        assert_eq!(sources[1].title, "Research Paper");
        assert_eq!(sources[2].kind, SourceKind::Web);
        assert_eq!(sources[2].title, "Web Source");
    }

    #[test]
    fn test_keyword_only_text_yields_synthetic_academic() {
        let sources = extract_sources("Recent Research shows promising results.");
        assert_eq!(sources.len(), 1);
        assert_eq!(
            sources[0],
            Source::new("arXiv Repository", "https://arxiv.org", SourceKind::Academic)
        );
    }

    #[test]
    fn test_real_encyclopedia_source_suppresses_synthetic() {
        let text = "Check the wiki at https://en.wikipedia.org/wiki/Machine_learning";
        let sources = extract_sources(text);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].kind, SourceKind::Encyclopedia);
        assert_eq!(sources[0].title, "Wikipedia Article");
    }

    #[test]
    fn test_web_url_plus_paper_keyword_appends_synthetic() {
        let text = "This paper is summarized at https://example.com/summary";
        let sources = extract_sources(text);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].kind, SourceKind::Web);
        assert_eq!(sources[1].title, "arXiv Repository");
    }

    #[test]
    fn test_duplicates_permitted_in_first_seen_order() {
        let text = "https://example.com/a then https://example.com/a again";
        let sources = extract_sources(text);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0], sources[1]);
    }

    #[test]
    fn test_no_urls_no_keywords_is_empty() {
        assert!(extract_sources("Hello there, how can I help?").is_empty());
    }

    #[test]
    fn test_idempotent() {
        let text = "wiki stuff and a study: https://arxiv.org/abs/2401.00001";
        assert_eq!(extract_sources(text), extract_sources(text));
    }

    #[test]
    fn test_case_insensitive_keywords() {
        let sources = extract_sources("RESEARCH on this topic continues.");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].kind, SourceKind::Academic);
    }
}
