use std::sync::{Arc, LazyLock};

use lookout_core::tool::{Tool, ToolResult};
use regex::Regex;
use reqwest::{Client, Url};
use schemars::schema_for;
use serde_json::Value;

use super::{
    LookupParameters, MAX_QUERY_CHARS, collapse_whitespace, decode_entities,
    fetch_text, invalid_url, strip_tags, truncate_chars,
};
use crate::config::WebSearchConfig;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const NO_RESULT: &str = "No good DuckDuckGo Search Result was found";

// The HTML endpoint serves a captcha page to unknown clients.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) \
                                  Gecko/20100101 Firefox/128.0";

static SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__snippet"[^>]*>(.*?)</a>"#).unwrap()
});

/// A tool that searches the web through DuckDuckGo.
pub struct WebSearchTool {
    client: Client,
    config: Arc<WebSearchConfig>,
    parameter_schema: Value,
}

impl WebSearchTool {
    /// Creates a new web search tool.
    #[inline]
    pub fn new(config: WebSearchConfig) -> Self {
        WebSearchTool {
            client: Client::new(),
            config: Arc::new(config),
            parameter_schema: schema_for!(LookupParameters).to_value(),
        }
    }
}

impl Default for WebSearchTool {
    #[inline]
    fn default() -> Self {
        Self::new(WebSearchConfig::default())
    }
}

impl Tool for WebSearchTool {
    type Input = LookupParameters;

    fn name(&self) -> &str {
        "duckduckgo_search"
    }

    fn description(&self) -> &str {
        r#"
A wrapper around DuckDuckGo Search.
Useful for when you need to answer questions about current events. Input should be a search query."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: LookupParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        async move {
            let query = truncate_chars(&input.query, MAX_QUERY_CHARS);
            debug!("searching the web for {query:?}");

            // `kp=-1` is moderate safe search, `df=y` limits to the past year.
            let url = Url::parse_with_params(
                SEARCH_URL,
                &[
                    ("q", query.as_str()),
                    ("kl", config.region.as_str()),
                    ("kp", "-1"),
                    ("df", "y"),
                ],
            )
            .map_err(invalid_url)?;

            let page = fetch_text(&client, url, BROWSER_USER_AGENT).await?;
            Ok(format_snippets(&parse_snippets(&page), config.max_results))
        }
    }
}

fn parse_snippets(page: &str) -> Vec<String> {
    SNIPPET_RE
        .captures_iter(page)
        .filter_map(|caps| caps.get(1))
        .map(|m| collapse_whitespace(&decode_entities(&strip_tags(m.as_str()))))
        .filter(|snippet| !snippet.is_empty())
        .collect()
}

fn format_snippets(snippets: &[String], max_results: usize) -> String {
    if snippets.is_empty() {
        return NO_RESULT.to_owned();
    }
    snippets
        .iter()
        .take(max_results)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = include_str!("../../fixtures/duckduckgo.html");

    #[test]
    fn test_parse_snippets() {
        let snippets = parse_snippets(PAGE);
        assert_eq!(snippets.len(), 6);
        assert_eq!(
            snippets[0],
            "Paris is the capital and largest city of France. \
             It's known for the Eiffel Tower & the Louvre."
        );
        assert_eq!(snippets[5], "Sixth result.");
    }

    #[test]
    fn test_format_snippets() {
        let text = format_snippets(&parse_snippets(PAGE), 5);
        assert!(text.starts_with("Paris is the capital"));
        assert!(text.ends_with("Fifth result."));
        assert!(!text.contains("Sixth"));
    }

    #[test]
    fn test_no_result() {
        let page = r#"<html><body><div class="no-results">No results.</div></body></html>"#;
        assert!(parse_snippets(page).is_empty());
        assert_eq!(format_snippets(&[], 5), NO_RESULT);
    }
}
