//! Lookup tools for scout: web search, arXiv, and Wikipedia.
//!
//! Each tool is a stateless text-in/text-out adapter over a third-party
//! query API, implementing the `Tool` trait from scout-core.

mod arxiv;
mod web;
mod wikipedia;

pub use arxiv::ArxivSearchTool;
pub use web::WebSearchTool;
pub use wikipedia::WikipediaSearchTool;

use std::sync::Arc;

use scout_core::Tool;

/// Result-count and length limits for the document lookup tools.
/// The web search tool is deliberately unrestricted.
#[derive(Debug, Clone, Copy)]
pub struct LookupLimits {
    /// Number of results per query.
    pub top_k: usize,
    /// Maximum characters of document content per result.
    pub max_chars: usize,
}

impl Default for LookupLimits {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_chars: 500,
        }
    }
}

/// Create the full research tool set: web search, arXiv, Wikipedia.
pub fn create_research_tools(limits: LookupLimits) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(WebSearchTool::new()),
        Arc::new(ArxivSearchTool::new(limits)),
        Arc::new(WikipediaSearchTool::new(limits)),
    ]
}

/// Truncate to a maximum character count on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = LookupLimits::default();
        assert_eq!(limits.top_k, 3);
        assert_eq!(limits.max_chars, 500);
    }

    #[test]
    fn test_create_research_tools_registers_all_three() {
        let tools = create_research_tools(LookupLimits::default());
        let mut names: Vec<_> = tools.iter().map(|t| t.name().to_string()).collect();
        names.sort();
        assert_eq!(names, ["arxiv_search", "web_search", "wikipedia_search"]);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte safety.
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
