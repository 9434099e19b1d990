use std::sync::{Arc, LazyLock};

use lookout_core::tool::{Tool, ToolResult};
use regex::Regex;
use reqwest::{Client, Url};
use schemars::schema_for;
use serde_json::Value;

use super::{
    LookupParameters, MAX_QUERY_CHARS, USER_AGENT, collapse_whitespace,
    decode_entities, fetch_text, invalid_url, truncate_chars,
};
use crate::config::ArxivConfig;

const API_URL: &str = "https://export.arxiv.org/api/query";
const NO_RESULT: &str = "No good Arxiv Result was found";

static ARXIV_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}\.\d{4,5}(v\d+)?$").unwrap());
static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").unwrap());
static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<id>(.*?)</id>").unwrap());
static UPDATED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<updated>(.*?)</updated>").unwrap());
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title[^>]*>(.*?)</title>").unwrap());
static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<summary[^>]*>(.*?)</summary>").unwrap()
});
static AUTHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").unwrap()
});

/// One paper from an arXiv Atom feed.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Paper {
    published: String,
    title: String,
    authors: Vec<String>,
    summary: String,
}

/// A tool that summarizes the best matching arXiv papers.
pub struct ArxivTool {
    client: Client,
    config: Arc<ArxivConfig>,
    parameter_schema: Value,
}

impl ArxivTool {
    /// Creates a new arXiv tool.
    #[inline]
    pub fn new(config: ArxivConfig) -> Self {
        ArxivTool {
            client: Client::new(),
            config: Arc::new(config),
            parameter_schema: schema_for!(LookupParameters).to_value(),
        }
    }
}

impl Default for ArxivTool {
    #[inline]
    fn default() -> Self {
        Self::new(ArxivConfig::default())
    }
}

impl Tool for ArxivTool {
    type Input = LookupParameters;

    fn name(&self) -> &str {
        "arxiv"
    }

    fn description(&self) -> &str {
        r#"
A wrapper around Arxiv.org.
Useful for when you need to answer questions about Physics, Mathematics, Computer Science, Quantitative Biology, Quantitative Finance, Statistics, Electrical Engineering, and Economics from scientific articles on arxiv.org. Input should be a search query, or one or more arXiv identifiers like 1706.03762."#
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
            debug!("searching arxiv for {query:?}");

            let max_results = config.top_k_results.to_string();
            let url = match id_list(&query) {
                Some(ids) => Url::parse_with_params(
                    API_URL,
                    &[
                        ("id_list", ids.as_str()),
                        ("max_results", max_results.as_str()),
                    ],
                ),
                None => Url::parse_with_params(
                    API_URL,
                    &[
                        ("search_query", query.as_str()),
                        ("max_results", max_results.as_str()),
                    ],
                ),
            }
            .map_err(invalid_url)?;

            let feed = fetch_text(&client, url, USER_AGENT).await?;
            let papers = parse_feed(&feed);
            Ok(format_papers(
                &papers[..papers.len().min(config.top_k_results)],
                config.doc_content_chars_max,
            ))
        }
    }
}

/// Returns a comma-separated id list when every word of `query` is an arXiv
/// identifier.
fn id_list(query: &str) -> Option<String> {
    let ids: Vec<_> = query.split_whitespace().collect();
    if ids.is_empty() || !ids.iter().all(|id| ARXIV_ID_RE.is_match(id)) {
        return None;
    }
    Some(ids.join(","))
}

fn parse_feed(feed: &str) -> Vec<Paper> {
    ENTRY_RE
        .captures_iter(feed)
        .filter_map(|caps| parse_entry(caps.get(1)?.as_str()))
        .collect()
}

fn parse_entry(entry: &str) -> Option<Paper> {
    // Malformed queries come back as a single entry describing the error.
    if capture(&ID_RE, entry).is_some_and(|id| id.contains("/api/errors")) {
        warn!("arxiv rejected the query: {:?}", capture(&SUMMARY_RE, entry));
        return None;
    }

    let updated = capture(&UPDATED_RE, entry)?;
    Some(Paper {
        published: updated.chars().take(10).collect(),
        title: capture(&TITLE_RE, entry)?,
        authors: AUTHOR_RE
            .captures_iter(entry)
            .filter_map(|caps| caps.get(1))
            .map(|m| clean_text(m.as_str()))
            .collect(),
        summary: capture(&SUMMARY_RE, entry).unwrap_or_default(),
    })
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    let m = re.captures(text)?.get(1)?;
    Some(clean_text(m.as_str()))
}

#[inline]
fn clean_text(text: &str) -> String {
    collapse_whitespace(&decode_entities(text))
}

fn format_papers(papers: &[Paper], max_chars: usize) -> String {
    if papers.is_empty() {
        return NO_RESULT.to_owned();
    }
    let text = papers
        .iter()
        .map(|paper| {
            format!(
                "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
                paper.published,
                paper.title,
                paper.authors.join(", "),
                paper.summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&text, max_chars)
}
