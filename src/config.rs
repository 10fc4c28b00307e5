//! Configuration types for meal-plan extraction.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Defaults reproduce the settings the
//! hosted services are tuned for: Italian parsing with a multimodal vendor
//! model, and a deterministic `gpt-4o-mini` extraction in JSON mode.

use crate::error::MealPlanError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default LlamaParse REST endpoint.
pub const DEFAULT_PARSE_BASE_URL: &str = "https://api.cloud.llamaindex.ai/api/parsing";

/// Default multimodal model LlamaParse uses to read the pages.
pub const DEFAULT_VENDOR_MODEL: &str = "anthropic-sonnet-3.7";

/// Default chat model for structured extraction.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// A service credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key. Blank strings yield `None`, which the pipeline treats as
    /// "not configured".
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The secret value, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// How strictly the language-model JSON is checked against the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchemaValidation {
    /// Every day must carry all five meal keys and both item lists.
    /// Violations are reported as malformed responses. (default)
    #[default]
    Strict,
    /// Missing pieces are filled with empty lists and placeholders; only a
    /// response without a day list is rejected.
    Lenient,
}

/// Configuration for one extraction session.
///
/// # Example
/// ```rust
/// use mealplan_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .parse_api_key("llx-…")
///     .llm_api_key("sk-…")
///     .model("gpt-4o")
///     .build()
///     .unwrap();
/// assert_eq!(config.language, "it");
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// LlamaParse credential (`LLAMA_CLOUD_API_KEY`).
    pub parse_api_key: Option<ApiKey>,

    /// OpenAI credential (`OPENAI_API_KEY`).
    pub llm_api_key: Option<ApiKey>,

    /// Chat model used for structured extraction. Default: `gpt-4o-mini`.
    pub model: String,

    /// Sampling temperature. Default: 0.0 so repeated runs agree.
    pub temperature: f32,

    /// Upper bound on the JSON response length, in tokens. Default: 8000.
    ///
    /// A full week with alternatives for every meal runs to roughly
    /// 3–5k tokens; truncation shows up as a malformed response.
    pub max_tokens: usize,

    /// Document language hint sent to the parser. Default: `it`.
    pub language: String,

    /// Vendor multimodal model for the parser. `None` disables the
    /// multimodal mode. Default: `anthropic-sonnet-3.7`.
    pub vendor_model: Option<String>,

    /// LlamaParse API root. Default: [`DEFAULT_PARSE_BASE_URL`].
    pub parse_base_url: String,

    /// Delay between job-status polls in milliseconds. Default: 1000.
    pub poll_interval_ms: u64,

    /// Give up waiting on a parse job after this many seconds. Default: 2000.
    pub parse_max_wait_secs: u64,

    /// Schema enforcement for the model output. Default: strict.
    pub schema_validation: SchemaValidation,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            parse_api_key: None,
            llm_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: 8000,
            language: "it".to_string(),
            vendor_model: Some(DEFAULT_VENDOR_MODEL.to_string()),
            parse_base_url: DEFAULT_PARSE_BASE_URL.to_string(),
            poll_interval_ms: 1000,
            parse_max_wait_secs: 2000,
            schema_validation: SchemaValidation::default(),
            system_prompt: None,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("parse_api_key", &self.parse_api_key)
            .field("llm_api_key", &self.llm_api_key)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("language", &self.language)
            .field("vendor_model", &self.vendor_model)
            .field("parse_base_url", &self.parse_base_url)
            .field("schema_validation", &self.schema_validation)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn parse_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.parse_api_key = ApiKey::new(key);
        self
    }

    pub fn llm_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.llm_api_key = ApiKey::new(key);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn vendor_model(mut self, model: Option<String>) -> Self {
        self.config.vendor_model = model;
        self
    }

    pub fn parse_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.parse_base_url = url.into();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn parse_max_wait_secs(mut self, secs: u64) -> Self {
        self.config.parse_max_wait_secs = secs;
        self
    }

    pub fn schema_validation(mut self, mode: SchemaValidation) -> Self {
        self.config.schema_validation = mode;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Missing credentials are *not* a build error: the pipeline reports
    /// them per stage so the shell can ask for them later.
    pub fn build(self) -> Result<ExtractionConfig, MealPlanError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(MealPlanError::InvalidConfig("Model name must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(MealPlanError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.language.trim().is_empty() {
            return Err(MealPlanError::InvalidConfig("Language must not be empty".into()));
        }
        if !(c.parse_base_url.starts_with("http://") || c.parse_base_url.starts_with("https://")) {
            return Err(MealPlanError::InvalidConfig(format!(
                "Parse base URL must be HTTP(S), got '{}'",
                c.parse_base_url
            )));
        }
        if c.poll_interval_ms == 0 {
            return Err(MealPlanError::InvalidConfig("Poll interval must be ≥ 1ms".into()));
        }
        Ok(self.config)
    }
}
