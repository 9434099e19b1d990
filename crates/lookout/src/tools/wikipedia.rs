use std::sync::Arc;

use lookout_core::tool::{Error as ToolError, Tool, ToolResult};
use reqwest::{Client, Url};
use schemars::schema_for;
use serde::Deserialize;
use serde_json::Value;

use super::{
    LookupParameters, MAX_QUERY_CHARS, USER_AGENT, fetch_text, invalid_url,
    truncate_chars,
};
use crate::config::WikipediaConfig;

const NO_RESULT: &str = "No good Wikipedia Search Result was found";

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    query: Option<ExtractQuery>,
}

#[derive(Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    missing: bool,
}

/// A tool that summarizes the best matching Wikipedia pages.
pub struct WikipediaTool {
    client: Client,
    config: Arc<WikipediaConfig>,
    parameter_schema: Value,
}

impl WikipediaTool {
    /// Creates a new Wikipedia tool.
    #[inline]
    pub fn new(config: WikipediaConfig) -> Self {
        WikipediaTool {
            client: Client::new(),
            config: Arc::new(config),
            parameter_schema: schema_for!(LookupParameters).to_value(),
        }
    }
}

impl Default for WikipediaTool {
    #[inline]
    fn default() -> Self {
        Self::new(WikipediaConfig::default())
    }
}

impl Tool for WikipediaTool {
    type Input = LookupParameters;

    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        r#"
A wrapper around Wikipedia.
Useful for when you need to answer general questions about people, places, companies, facts, historical events, or other subjects. Input should be a search query."#
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
            debug!("searching wikipedia for {query:?}");
            let api_url = api_url(&config.lang);
            let limit = config.top_k_results.to_string();

            let search_url = Url::parse_with_params(
                &api_url,
                &[
                    ("action", "query"),
                    ("list", "search"),
                    ("srsearch", query.as_str()),
                    ("srlimit", limit.as_str()),
                    ("format", "json"),
                    ("formatversion", "2"),
                ],
            )
            .map_err(invalid_url)?;
            let titles =
                parse_search(&fetch_text(&client, search_url, USER_AGENT).await?)?;

            let mut pages = Vec::with_capacity(titles.len());
            for title in titles.iter().take(config.top_k_results) {
                let extract_url = Url::parse_with_params(
                    &api_url,
                    &[
                        ("action", "query"),
                        ("prop", "extracts"),
                        ("exintro", "1"),
                        ("explaintext", "1"),
                        ("redirects", "1"),
                        ("titles", title.as_str()),
                        ("format", "json"),
                        ("formatversion", "2"),
                    ],
                )
                .map_err(invalid_url)?;
                // A page that vanished between the two calls is skipped.
                match fetch_text(&client, extract_url, USER_AGENT).await {
                    Ok(body) => pages.extend(parse_extract(&body)?),
                    Err(err) => warn!("skipping page {title:?}: {err}"),
                }
            }

            Ok(format_pages(&pages, config.doc_content_chars_max))
        }
    }
}

#[inline]
fn api_url(lang: &str) -> String {
    format!("https://{lang}.wikipedia.org/w/api.php")
}

fn parse_search(body: &str) -> Result<Vec<String>, ToolError> {
    let resp: SearchResponse = serde_json::from_str(body).map_err(|err| {
        ToolError::execution_error()
            .with_reason(format!("unexpected search response: {err}"))
    })?;
    Ok(resp
        .query
        .map(|query| query.search.into_iter().map(|hit| hit.title).collect())
        .unwrap_or_default())
}

/// Returns the `(title, summary)` of the page in an extract response.
fn parse_extract(body: &str) -> Result<Option<(String, String)>, ToolError> {
    let resp: ExtractResponse = serde_json::from_str(body).map_err(|err| {
        ToolError::execution_error()
            .with_reason(format!("unexpected extract response: {err}"))
    })?;
    let page = resp
        .query
        .and_then(|query| query.pages.into_iter().find(|page| !page.missing));
    Ok(page.and_then(|page| {
        let summary = page.extract?.trim().to_owned();
        Some((page.title, summary))
    }))
}

fn format_pages(pages: &[(String, String)], max_chars: usize) -> String {
    if pages.is_empty() {
        return NO_RESULT.to_owned();
    }
    let text = pages
        .iter()
        .map(|(title, summary)| format!("Page: {title}\nSummary: {summary}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&text, max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let titles =
            parse_search(include_str!("../../fixtures/wikipedia_search.json"))
                .unwrap();
        assert_eq!(titles, vec!["Paris", "Paris Saint-Germain F.C."]);

        let titles = parse_search(r#"{"batchcomplete":true}"#).unwrap();
        assert!(titles.is_empty());

        let err = parse_search("<html>").unwrap_err();
        assert_eq!(err.kind(), lookout_core::tool::ErrorKind::ExecutionError);
    }

    #[test]
    fn test_parse_extract() {
        let (title, summary) =
            parse_extract(include_str!("../../fixtures/wikipedia_extract.json"))
                .unwrap()
                .unwrap();
        assert_eq!(title, "Paris");
        assert!(summary.starts_with("Paris is the capital"));

        let missing = r#"{"query":{"pages":[{"title":"Nowhere","missing":true}]}}"#;
        assert_eq!(parse_extract(missing).unwrap(), None);
    }

    #[test]
    fn test_format_pages() {
        let (title, summary) =
            parse_extract(include_str!("../../fixtures/wikipedia_extract.json"))
                .unwrap()
                .unwrap();
        let text = format_pages(&[(title, summary)], 200);
        assert_eq!(text.chars().count(), 200);
        assert!(text.starts_with("Page: Paris\nSummary: Paris is the capital"));

        let pages = [
            ("A".to_owned(), "First.".to_owned()),
            ("B".to_owned(), "Second.".to_owned()),
        ];
        assert_eq!(
            format_pages(&pages, 200),
            "Page: A\nSummary: First.\n\nPage: B\nSummary: Second."
        );
    }

    #[test]
    fn test_no_result() {
        assert_eq!(format_pages(&[], 200), NO_RESULT);
    }
}
