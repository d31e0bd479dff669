//! Encyclopedia lookup via the MediaWiki query API.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use scout_core::{Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

use crate::{truncate_chars, LookupLimits};

const API_URL: &str = "https://en.wikipedia.org/w/api.php";

pub struct WikipediaSearchTool {
    client: Client,
    limits: LookupLimits,
}

impl WikipediaSearchTool {
    pub fn new(limits: LookupLimits) -> Self {
        Self {
            client: Client::builder()
                .user_agent("scout/0.1.0")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            limits,
        }
    }
}

#[derive(Deserialize)]
struct WikipediaSearchArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    index: i64,
    title: String,
    #[serde(default)]
    extract: String,
}

#[async_trait]
impl Tool for WikipediaSearchTool {
    fn name(&self) -> &str {
        "wikipedia_search"
    }

    fn description(&self) -> &str {
        "Search Wikipedia for encyclopedic background. Returns article titles, links, and intro extracts."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new().add_property(
                "query",
                PropertySchema::string("The topic to look up"),
                true,
            ),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let args: WikipediaSearchArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::tool("wikipedia_search", format!("Invalid arguments: {}", e)))?;

        let limit = self.limits.top_k.to_string();
        let response = self
            .client
            .get(API_URL)
            .query(&[
                ("action", "query"),
                ("generator", "search"),
                ("gsrsearch", args.query.as_str()),
                ("gsrlimit", limit.as_str()),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exlimit", "max"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| Error::tool("wikipedia_search", format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::tool(
                "wikipedia_search",
                format!("Wikipedia API error {}", response.status()),
            ));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::tool("wikipedia_search", format!("Failed to parse response: {}", e)))?;

        let Some(query) = parsed.query else {
            return Ok(ToolOutput::success("No articles found."));
        };

        if query.pages.is_empty() {
            return Ok(ToolOutput::success("No articles found."));
        }

        Ok(ToolOutput::success(format_pages(
            query.pages,
            self.limits.max_chars,
        )))
    }
}

fn format_pages(pages: HashMap<String, Page>, max_chars: usize) -> String {
    // The API keys pages by page id; search rank lives in `index`.
    let mut ranked: Vec<Page> = pages.into_values().collect();
    ranked.sort_by_key(|p| p.index);

    let mut output = String::new();
    for (i, page) in ranked.iter().enumerate() {
        if i > 0 {
            output.push_str("\n\n");
        }
        output.push_str(&format!(
            "{}. {}\n{}\n{}",
            i + 1,
            page.title,
            article_url(&page.title),
            truncate_chars(page.extract.trim(), max_chars),
        ));
    }
    output
}

fn article_url(title: &str) -> String {
    format!(
        "https://en.wikipedia.org/wiki/{}",
        urlencoding::encode(&title.replace(' ', "_"))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "query": {
            "pages": {
                "9316": {"pageid": 9316, "index": 2, "title": "Machine learning", "extract": "Machine learning is a field of study in artificial intelligence."},
                "1164": {"pageid": 1164, "index": 1, "title": "Artificial intelligence", "extract": "Artificial intelligence is the capability of computational systems to perform tasks."}
            }
        }
    }"#;

    #[test]
    fn test_parse_and_rank_pages() {
        let parsed: QueryResponse = serde_json::from_str(SAMPLE_RESPONSE).unwrap();
        let out = format_pages(parsed.query.unwrap().pages, 500);
        assert!(out.starts_with("1. Artificial intelligence"));
        assert!(out.contains("2. Machine learning"));
        assert!(out.contains("https://en.wikipedia.org/wiki/Artificial_intelligence"));
    }

    #[test]
    fn test_extract_truncation() {
        let parsed: QueryResponse = serde_json::from_str(SAMPLE_RESPONSE).unwrap();
        let out = format_pages(parsed.query.unwrap().pages, 10);
        assert!(out.contains("Artificial"));
        assert!(!out.contains("computational systems"));
    }

    #[test]
    fn test_missing_query_block() {
        let parsed: QueryResponse = serde_json::from_str(r#"{"batchcomplete": ""}"#).unwrap();
        assert!(parsed.query.is_none());
    }

    #[test]
    fn test_article_url() {
        assert_eq!(
            article_url("Rust (programming language)"),
            "https://en.wikipedia.org/wiki/Rust_%28programming_language%29"
        );
        // Reserved characters must not leak into the link.
        assert_eq!(
            article_url("Who? Me?"),
            "https://en.wikipedia.org/wiki/Who%3F_Me%3F"
        );
        assert_eq!(
            article_url("C# (programming language)"),
            "https://en.wikipedia.org/wiki/C%23_%28programming_language%29"
        );
    }
}
