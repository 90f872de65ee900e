//! TOML configuration.
//!
//! Every section is optional; a missing key falls back to its `default_*`
//! function. See `config/juris.example.toml` for a full example.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use juris_context_core::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_KEY_WINDOW};
use juris_context_core::context::{DEFAULT_MAX_CONTEXT_CHARS, DEFAULT_MIN_FRAGMENT_CHARS};
use juris_context_core::conversation::DEFAULT_INACTIVITY_TIMEOUT_SECS;
use juris_context_core::index::{DEFAULT_MAX_DF_RATIO, DEFAULT_MIN_DF};
use juris_context_core::language::{DetectionStrategy, DEFAULT_MARKER_THRESHOLD};
use juris_context_core::search::{DEFAULT_EXCERPT_CHARS, DEFAULT_TOP_K};
use juris_context_core::Language;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub language: LanguageConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_corpus_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Index the corpus when the server starts.
    #[serde(default = "default_true")]
    pub index_on_start: bool,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: default_corpus_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
            index_on_start: true,
        }
    }
}

fn default_corpus_root() -> PathBuf {
    PathBuf::from("./data/documents")
}
fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.pdf".to_string(),
        "**/*.docx".to_string(),
        "**/*.txt".to_string(),
        "**/*.md".to_string(),
    ]
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "default_min_fragment_chars")]
    pub min_fragment_chars: usize,
    #[serde(default = "default_max_df_ratio")]
    pub max_df_ratio: f64,
    #[serde(default = "default_min_df")]
    pub min_df: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            excerpt_chars: default_excerpt_chars(),
            max_context_chars: default_max_context_chars(),
            min_fragment_chars: default_min_fragment_chars(),
            max_df_ratio: default_max_df_ratio(),
            min_df: default_min_df(),
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_excerpt_chars() -> usize {
    DEFAULT_EXCERPT_CHARS
}
fn default_max_context_chars() -> usize {
    DEFAULT_MAX_CONTEXT_CHARS
}
fn default_min_fragment_chars() -> usize {
    DEFAULT_MIN_FRAGMENT_CHARS
}
fn default_max_df_ratio() -> f64 {
    DEFAULT_MAX_DF_RATIO
}
fn default_min_df() -> usize {
    DEFAULT_MIN_DF
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// Trailing transcript turns mixed into the cache key.
    #[serde(default = "default_key_window")]
    pub key_window: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            key_window: default_key_window(),
        }
    }
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}
fn default_key_window() -> usize {
    DEFAULT_KEY_WINDOW
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConversationConfig {
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: i64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
        }
    }
}

fn default_inactivity_timeout_secs() -> i64 {
    DEFAULT_INACTIVITY_TIMEOUT_SECS
}

#[derive(Debug, Deserialize, Clone)]
pub struct LanguageConfig {
    /// `script` or `markers`.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Language reported when nothing is detected (`fr`, `en`, `ar`, `aeb`).
    #[serde(default = "default_language")]
    pub default: String,
    /// Replaces the built-in dialect markers when non-empty.
    #[serde(default)]
    pub markers: Vec<String>,
    #[serde(default = "default_marker_threshold")]
    pub marker_threshold: usize,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            default: default_language(),
            markers: Vec::new(),
            marker_threshold: default_marker_threshold(),
        }
    }
}

fn default_strategy() -> String {
    "script".to_string()
}
fn default_language() -> String {
    "fr".to_string()
}
fn default_marker_threshold() -> usize {
    DEFAULT_MARKER_THRESHOLD
}

impl LanguageConfig {
    pub fn strategy(&self) -> Result<DetectionStrategy> {
        self.strategy
            .parse()
            .map_err(|e: String| anyhow::anyhow!("language.strategy: {}", e))
    }

    pub fn default_language(&self) -> Result<Language> {
        self.default
            .parse()
            .map_err(|e: String| anyhow::anyhow!("language.default: {}", e))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_top_p() -> f32 {
    1.0
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedbackConfig {
    #[serde(default = "default_feedback_path")]
    pub path: PathBuf,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            path: default_feedback_path(),
        }
    }
}

fn default_feedback_path() -> PathBuf {
    PathBuf::from("./data/feedback.csv")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.max_context_chars == 0 {
        anyhow::bail!("retrieval.max_context_chars must be > 0");
    }
    if !(config.retrieval.max_df_ratio > 0.0 && config.retrieval.max_df_ratio <= 1.0) {
        anyhow::bail!("retrieval.max_df_ratio must be in (0.0, 1.0]");
    }
    let timeout_secs = config.conversation.inactivity_timeout_secs;
    if timeout_secs <= 0 || chrono::Duration::try_seconds(timeout_secs).is_none() {
        anyhow::bail!(
            "conversation.inactivity_timeout_secs must be > 0 and representable as a duration, got {}",
            timeout_secs
        );
    }

    config.language.strategy()?;
    config.language.default_language()?;
    if config.language.marker_threshold == 0 {
        anyhow::bail!("language.marker_threshold must be >= 1");
    }

    let endpoint = config.backend.endpoint.trim();
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        anyhow::bail!(
            "backend.endpoint must start with http:// or https://, got '{}'",
            config.backend.endpoint
        );
    }
    if !(0.0..=2.0).contains(&config.backend.temperature) {
        anyhow::bail!("backend.temperature must be in [0.0, 2.0]");
    }
    if !(0.0..=1.0).contains(&config.backend.top_p) {
        anyhow::bail!("backend.top_p must be in [0.0, 1.0]");
    }

    Ok(())
}
