//! Academic paper lookup against the arXiv Atom API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use scout_core::{Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

use crate::{truncate_chars, LookupLimits};

const API_URL: &str = "http://export.arxiv.org/api/query";

pub struct ArxivSearchTool {
    client: Client,
    limits: LookupLimits,
}

impl ArxivSearchTool {
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
struct ArxivSearchArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    title: String,
    summary: String,
    #[serde(default)]
    published: String,
    #[serde(default)]
    author: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
}

#[async_trait]
impl Tool for ArxivSearchTool {
    fn name(&self) -> &str {
        "arxiv_search"
    }

    fn description(&self) -> &str {
        "Search arXiv for academic papers. Returns titles, authors, and abstract summaries."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new().add_property(
                "query",
                PropertySchema::string("The topic or keywords to search papers for"),
                true,
            ),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let args: ArxivSearchArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::tool("arxiv_search", format!("Invalid arguments: {}", e)))?;

        let search_query = format!("all:{}", args.query);
        let response = self
            .client
            .get(API_URL)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", &self.limits.top_k.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::tool("arxiv_search", format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::tool(
                "arxiv_search",
                format!("arXiv API error {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::tool("arxiv_search", format!("Failed to read response: {}", e)))?;

        let feed: Feed = quick_xml::de::from_str(&body)
            .map_err(|e| Error::tool("arxiv_search", format!("Failed to parse feed: {}", e)))?;

        if feed.entry.is_empty() {
            return Ok(ToolOutput::success("No papers found."));
        }

        Ok(ToolOutput::success(format_entries(
            &feed.entry,
            self.limits.max_chars,
        )))
    }
}

fn format_entries(entries: &[Entry], max_chars: usize) -> String {
    let mut output = String::new();
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            output.push_str("\n\n");
        }
        let authors = entry
            .author
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let summary = truncate_chars(collapse_whitespace(&entry.summary).trim(), max_chars);

        output.push_str(&format!(
            "{}. {}\n{}\nAuthors: {}\nPublished: {}\n{}",
            i + 1,
            collapse_whitespace(&entry.title).trim(),
            entry.id,
            authors,
            entry.published,
            summary,
        ));
    }
    output
}

/// Atom feeds hard-wrap titles and abstracts; fold the line breaks back out.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query: search_query=all:transformers</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <title>Attention Is All
  You Need</title>
    <summary>The dominant sequence transduction models are based on complex
  recurrent or convolutional neural networks.</summary>
    <published>2017-06-12T17:57:34Z</published>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed() {
        let feed: Feed = quick_xml::de::from_str(SAMPLE_FEED).unwrap();
        assert_eq!(feed.entry.len(), 1);
        assert_eq!(feed.entry[0].id, "http://arxiv.org/abs/1706.03762v7");
        assert_eq!(feed.entry[0].author.len(), 2);
    }

    #[test]
    fn test_format_entries_collapses_wrapping() {
        let feed: Feed = quick_xml::de::from_str(SAMPLE_FEED).unwrap();
        let out = format_entries(&feed.entry, 500);
        assert!(out.contains("1. Attention Is All You Need"));
        assert!(out.contains("Authors: Ashish Vaswani, Noam Shazeer"));
        assert!(out.contains("based on complex recurrent"));
    }

    #[test]
    fn test_format_entries_truncates_summary() {
        let feed: Feed = quick_xml::de::from_str(SAMPLE_FEED).unwrap();
        let out = format_entries(&feed.entry, 20);
        assert!(out.ends_with("The dominant sequenc"));
        assert!(!out.contains("transduction"));
    }

    #[test]
    fn test_empty_feed() {
        let feed: Feed =
            quick_xml::de::from_str(r#"<feed xmlns="http://www.w3.org/2005/Atom"></feed>"#)
                .unwrap();
        assert!(feed.entry.is_empty());
    }
}
