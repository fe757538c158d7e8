use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::Level;

use crate::acceptance::DEFAULT_MIN_WORDS;
use crate::llm::LlmSettings;
use crate::resolve::search::DEFAULT_SEARCH_URL;

const DEFAULT_STORE_PATH: &str = "./data/interview_questions.jsonl";
const DEFAULT_PAUSE_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleCse {
    pub api_key: String,
    pub cx: String,
}

/// Run configuration, read once at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_path: PathBuf,
    pub search_url: String,
    /// Only set when both the key and the engine id are present.
    pub google: Option<GoogleCse>,
    pub bing_api_key: Option<String>,
    pub llm: LlmSettings,
    /// Pause after every network call.
    pub request_pause: Duration,
    /// Pause after every store write.
    pub write_pause: Duration,
    pub min_answer_words: usize,
    pub log_level: Level,
}

impl Config {
    /// Reads `.env` values and the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = LlmSettings::default();
        let llm = LlmSettings {
            base_url: var("LLM_BASE_URL").unwrap_or(defaults.base_url),
            model: var("LLM_MODEL").unwrap_or(defaults.model),
            api_key: var("OPENAI_API_KEY").or_else(|| var("LLM_API_KEY")),
            ..defaults
        };

        let google = match (var("GOOGLE_API_KEY"), var("GOOGLE_CX")) {
            (Some(api_key), Some(cx)) => Some(GoogleCse { api_key, cx }),
            _ => None,
        };

        Ok(Self {
            store_path: var("STORE_PATH")
                .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string())
                .into(),
            search_url: var("SEARCH_URL").unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string()),
            google,
            bing_api_key: var("BING_API_KEY"),
            llm,
            request_pause: Duration::from_millis(
                parsed(&var, "REQUEST_PAUSE_MS")?.unwrap_or(DEFAULT_PAUSE_MS),
            ),
            write_pause: Duration::from_millis(
                parsed(&var, "WRITE_PAUSE_MS")?.unwrap_or(DEFAULT_PAUSE_MS),
            ),
            min_answer_words: parsed(&var, "MIN_ANSWER_WORDS")?.unwrap_or(DEFAULT_MIN_WORDS),
            log_level: parsed(&var, "LOG_LEVEL")?.unwrap_or(Level::INFO),
        })
    }
}

fn parsed<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(key)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("Invalid {}: {:?}", key, raw))
        })
        .transpose()
}
