//! The lookup tools the agent can call.
//!
//! Each tool turns a free-text query into a short plain-text passage. HTTP
//! failures are reported as tool errors, so the model sees them as the
//! tool's output instead of the run failing.

mod arxiv;
mod web_search;
mod wikipedia;

use std::fmt::Display;
use std::sync::LazyLock;

use lookout_core::tool::Error as ToolError;
use regex::{Captures, Regex};
use reqwest::{Client, Url, header};
use schemars::JsonSchema;
use serde::Deserialize;

pub use arxiv::ArxivTool;
pub use web_search::WebSearchTool;
pub use wikipedia::WikipediaTool;

/// Queries longer than this are cut before being sent.
const MAX_QUERY_CHARS: usize = 300;

const USER_AGENT: &str =
    concat!("lookout/", env!("CARGO_PKG_VERSION"), " (terminal search agent)");

/// Parameters shared by every lookup tool.
#[derive(Deserialize, JsonSchema)]
pub struct LookupParameters {
    #[schemars(description = "The search query.")]
    query: String,
}

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").unwrap()
});

async fn fetch_text(
    client: &Client,
    url: Url,
    user_agent: &str,
) -> Result<String, ToolError> {
    trace!("GET {url}");
    let resp = client
        .get(url)
        .header(header::USER_AGENT, user_agent)
        .send()
        .await
        .map_err(request_failed)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ToolError::execution_error()
            .with_reason(format!("lookup service answered {status}")));
    }
    resp.text().await.map_err(request_failed)
}

#[inline]
fn request_failed(err: reqwest::Error) -> ToolError {
    warn!("lookup request failed: {err}");
    ToolError::execution_error().with_reason(format!("{err}"))
}

#[inline]
fn invalid_url(err: impl Display) -> ToolError {
    ToolError::execution_error().with_reason(format!("invalid url: {err}"))
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_owned(),
        None => text.to_owned(),
    }
}

fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| {
                        entity.strip_prefix('#').map(|dec| dec.parse::<u32>())
                    })
                    .and_then(Result::ok)
                    .and_then(char::from_u32),
            };
            match decoded {
                Some(ch) => ch.to_string(),
                None => caps[0].to_owned(),
            }
        })
        .into_owned()
}
