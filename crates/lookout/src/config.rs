use std::env;
use std::fmt::{self, Debug, Formatter};
use std::str::FromStr;

use lookout_openai_model::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAIConfig, OpenAIConfigBuilder,
};

/// Variable holding the provider API key.
pub const API_KEY_VAR: &str = "GROQ_API_KEY";
/// Variable overriding the provider base URL.
pub const BASE_URL_VAR: &str = "LOOKOUT_BASE_URL";
/// Variable overriding the model identifier.
pub const MODEL_VAR: &str = "LOOKOUT_MODEL";
/// Variable overriding the agent iteration limit.
pub const MAX_ITERATIONS_VAR: &str = "LOOKOUT_MAX_ITERATIONS";

const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Errors from reading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    /// A variable is set to something unusable.
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        /// The variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Settings for the Wikipedia lookup tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WikipediaConfig {
    /// How many search hits are summarized.
    pub top_k_results: usize,
    /// Output is truncated to this many characters.
    pub doc_content_chars_max: usize,
    /// Wikipedia language edition, e.g. `en`.
    pub lang: String,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            top_k_results: 1,
            doc_content_chars_max: 200,
            lang: "en".to_owned(),
        }
    }
}

/// Settings for the arXiv lookup tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArxivConfig {
    /// How many papers are summarized.
    pub top_k_results: usize,
    /// Output is truncated to this many characters.
    pub doc_content_chars_max: usize,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            top_k_results: 1,
            doc_content_chars_max: 200,
        }
    }
}

/// Settings for the web search tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebSearchConfig {
    /// How many result snippets are joined into the output.
    pub max_results: usize,
    /// DuckDuckGo region code, `wt-wt` means no region.
    pub region: String,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            region: "wt-wt".to_owned(),
        }
    }
}

/// Static configuration of the three lookup tools.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LookupConfig {
    /// Wikipedia settings.
    pub wikipedia: WikipediaConfig,
    /// arXiv settings.
    pub arxiv: ArxivConfig,
    /// Web search settings.
    pub web_search: WebSearchConfig,
}

/// Application configuration.
#[derive(Clone)]
pub struct Config {
    api_key: String,
    base_url: String,
    model: String,
    max_iterations: usize,
    lookup: LookupConfig,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// Call [`dotenvy::dotenv`] first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let api_key = get(API_KEY_VAR).ok_or(ConfigError::Missing(API_KEY_VAR))?;
        let base_url =
            get(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                name: BASE_URL_VAR,
                value: base_url,
                reason: "expected an http(s) URL".to_owned(),
            });
        }
        let model = get(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_owned());
        let max_iterations = match get(MAX_ITERATIONS_VAR) {
            Some(value) => parse_positive(MAX_ITERATIONS_VAR, value)?,
            None => DEFAULT_MAX_ITERATIONS,
        };

        Ok(Self {
            api_key,
            base_url,
            model,
            max_iterations,
            lookup: LookupConfig::default(),
        })
    }

    /// Returns the provider base URL.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the model identifier.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns how many times the model may be sampled per question.
    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Returns the lookup tool settings.
    #[inline]
    pub fn lookup(&self) -> &LookupConfig {
        &self.lookup
    }

    /// Builds the provider configuration.
    pub fn openai_config(&self) -> OpenAIConfig {
        OpenAIConfigBuilder::with_api_key(&self.api_key)
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .build()
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_iterations", &self.max_iterations)
            .field("lookup", &self.lookup)
            .finish()
    }
}

fn parse_positive<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: fmt::Display,
{
    match value.parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        Ok(_) => Err(ConfigError::Invalid {
            name,
            value,
            reason: "must be greater than zero".to_owned(),
        }),
        Err(err) => {
            let reason = err.to_string();
            Err(ConfigError::Invalid {
                name,
                value,
                reason,
            })
        }
    }
}
