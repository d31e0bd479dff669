//! Web search via the DuckDuckGo HTML endpoint.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;

use scout_core::{Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

pub struct WebSearchTool {
    client: Client,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent("scout/0.1.0")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct WebSearchArgs {
    query: String,
}

#[derive(Debug, PartialEq)]
struct SearchHit {
    title: String,
    url: String,
    snippet: String,
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Returns result titles, URLs, and snippets."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new().add_property(
                "query",
                PropertySchema::string("The search query (can be natural language)"),
                true,
            ),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let args: WebSearchArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::tool("web_search", format!("Invalid arguments: {}", e)))?;

        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", args.query.as_str())])
            .send()
            .await
            .map_err(|e| Error::tool("web_search", format!("Search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::tool(
                "web_search",
                format!("Search API error {}", response.status()),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::tool("web_search", format!("Failed to read response: {}", e)))?;

        let hits = parse_results(&html);

        if hits.is_empty() {
            return Ok(ToolOutput::success("No results found."));
        }

        Ok(ToolOutput::success(format_results(&hits)))
    }
}

fn parse_results(html: &str) -> Vec<SearchHit> {
    let document = Html::parse_document(html);

    // Selectors are static and known-valid.
    let result_sel = Selector::parse(".result").unwrap();
    let link_sel = Selector::parse("a.result__a").unwrap();
    let snippet_sel = Selector::parse(".result__snippet").unwrap();

    let mut hits = Vec::new();
    for result in document.select(&result_sel) {
        let Some(link) = result.select(&link_sel).next() else {
            continue;
        };
        let title = clean_text(&link.text().collect::<String>());
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(|s| clean_text(&s.text().collect::<String>()))
            .unwrap_or_default();

        hits.push(SearchHit {
            title,
            url: resolve_redirect(href),
            snippet,
        });
    }
    hits
}

/// DuckDuckGo wraps result links in a redirect of the form
/// `//duckduckgo.com/l/?uddg=<percent-encoded target>&...`; unwrap it so
/// responses cite the real destination.
fn resolve_redirect(href: &str) -> String {
    let Some(start) = href.find("uddg=") else {
        return href.to_string();
    };
    let encoded = &href[start + 5..];
    let encoded = encoded.split('&').next().unwrap_or(encoded);
    match urlencoding::decode(encoded) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => href.to_string(),
    }
}

fn format_results(hits: &[SearchHit]) -> String {
    let mut output = String::new();
    for (i, hit) in hits.iter().enumerate() {
        if i > 0 {
            output.push_str("\n\n");
        }
        output.push_str(&format!("{}. {}\n{}\n{}", i + 1, hit.title, hit.url, hit.snippet));
    }
    output
}

/// Collapse runs of whitespace into single spaces.
fn clean_text(text: &str) -> String {
    let mut result = String::new();
    let mut prev_was_whitespace = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            if !prev_was_whitespace {
                result.push(' ');
                prev_was_whitespace = true;
            }
        } else {
            result.push(ch);
            prev_was_whitespace = false;
        }
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        let input = "  Hello   world \n\n Test  ";
        assert_eq!(clean_text(input), "Hello world Test");
    }

    #[test]
    fn test_resolve_redirect() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpage&rut=abc";
        assert_eq!(resolve_redirect(href), "https://example.com/page");
        // Direct links pass through untouched.
        assert_eq!(resolve_redirect("https://example.com"), "https://example.com");
    }

    #[test]
    fn test_resolve_redirect_keeps_truncated_escape_literal() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fx.com%2Fa%2";
        assert_eq!(resolve_redirect(href), "https://x.com/a%2");
    }

    #[test]
    fn test_parse_results() {
        let html = r#"
            <html><body>
              <div class="result">
                <h2 class="result__title">
                  <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Frust-lang.org">Rust   Language</a>
                </h2>
                <a class="result__snippet">A language empowering everyone.</a>
              </div>
              <div class="result">
                <a class="result__a" href="https://example.com">Example</a>
              </div>
            </body></html>
        "#;
        let hits = parse_results(html);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Rust Language");
        assert_eq!(hits[0].url, "https://rust-lang.org");
        assert_eq!(hits[0].snippet, "A language empowering everyone.");
        assert_eq!(hits[1].snippet, "");
    }

    #[test]
    fn test_format_results() {
        let hits = vec![SearchHit {
            title: "Title".to_string(),
            url: "https://example.com".to_string(),
            snippet: "Snippet.".to_string(),
        }];
        let out = format_results(&hits);
        assert!(out.starts_with("1. Title"));
        assert!(out.contains("https://example.com"));
    }
}
