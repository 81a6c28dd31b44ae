//! Configuration types for the enrichment pipeline.
//!
//! All pipeline behaviour that is stable across runs lives in
//! [`EnrichConfig`], built via its [`EnrichConfigBuilder`]. Keeping every
//! knob in one struct makes it trivial to pass the same context into each
//! phase entry point, serialise it for logging, and diff two runs to
//! understand why their outputs differ. Per-run inputs (filters, paths)
//! live in the option structs of [`crate::run`] instead.
//!
//! # Design choice: builder over constructor
//! A ten-field constructor is unreadable and breaks on every new field. The
//! builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::EnrichError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default layout/line-detection model ("Mixed Text Line Orientation").
pub const DEFAULT_LINE_MODEL_ID: u64 = 49272;

/// Default text-recognition model ("Transkribus Print M1").
pub const DEFAULT_ATR_MODEL_ID: u64 = 39995;

/// Tag marking an item as already submitted for recognition.
pub const DEFAULT_PROCESSED_TAG: &str = "atr_processed";

/// Default language code stamped on synthesized notes.
pub const DEFAULT_LANGUAGE: &str = "de";

/// Recognition service account credentials.
///
/// Read from `TRANSKRIBUS_USER` / `TRANSKRIBUS_PASSWORD` by
/// [`Credentials::from_env`], or supplied directly.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Read credentials from the environment.
    ///
    /// Returns `None` when either variable is unset or empty.
    pub fn from_env() -> Option<Self> {
        let user = std::env::var("TRANSKRIBUS_USER").ok()?;
        let password = std::env::var("TRANSKRIBUS_PASSWORD").ok()?;
        if user.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self { user, password })
    }
}

// The password never appears in logs, even at debug level.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Pipeline context passed into each phase entry point.
///
/// Built via [`EnrichConfig::builder()`] or using
/// [`EnrichConfig::default()`].
///
/// # Example
/// ```rust
/// use tropy_atr::EnrichConfig;
///
/// let config = EnrichConfig::builder()
///     .language("fr")
///     .atr_model_id(51170)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Language code for the `@language` field of synthesized notes.
    /// Default: `"de"`.
    pub language: String,

    /// Layout/line-detection model id sent with each submission.
    /// Default: [`DEFAULT_LINE_MODEL_ID`].
    pub line_model_id: u64,

    /// Text-recognition model id sent with each submission.
    /// Default: [`DEFAULT_ATR_MODEL_ID`].
    pub atr_model_id: u64,

    /// Sentinel tag added to every submitted item. Default: `"atr_processed"`.
    ///
    /// This tag is the idempotence guard: a re-run of the submission phase
    /// selects zero items that already carry it. Change it only if your
    /// project already uses the default tag for something else.
    pub processed_tag: String,

    /// Maximum retry attempts on a failed service call. Default: 3.
    ///
    /// Recognition jobs are submitted and fetched one request at a time, so
    /// a single transient 5xx would otherwise abort a multi-hundred-row run.
    /// Permanent failures still abort after the retries are exhausted.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff).
    /// Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Per-request timeout in seconds for the service client. Default: 60.
    pub api_timeout_secs: u64,

    /// Recognition service account. Default: `None` (read from the
    /// environment at client construction).
    pub credentials: Option<Credentials>,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            line_model_id: DEFAULT_LINE_MODEL_ID,
            atr_model_id: DEFAULT_ATR_MODEL_ID,
            processed_tag: DEFAULT_PROCESSED_TAG.to_string(),
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            credentials: None,
        }
    }
}

impl EnrichConfig {
    /// Create a new builder for `EnrichConfig`.
    pub fn builder() -> EnrichConfigBuilder {
        EnrichConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EnrichConfig`].
#[derive(Debug)]
pub struct EnrichConfigBuilder {
    config: EnrichConfig,
}

impl EnrichConfigBuilder {
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn line_model_id(mut self, id: u64) -> Self {
        self.config.line_model_id = id;
        self
    }

    pub fn atr_model_id(mut self, id: u64) -> Self {
        self.config.atr_model_id = id;
        self
    }

    pub fn processed_tag(mut self, tag: impl Into<String>) -> Self {
        self.config.processed_tag = tag.into();
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EnrichConfig, EnrichError> {
        let c = &self.config;
        if c.processed_tag.is_empty() {
            return Err(EnrichError::InvalidConfig(
                "processed tag must not be empty".into(),
            ));
        }
        if c.language.is_empty() {
            return Err(EnrichError::InvalidConfig(
                "language code must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
