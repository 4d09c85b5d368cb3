//! Configuration loading and resolution.

use std::time::Duration;

use vision_lens::{ImageProfile, VisionError, VisionResult, DEFAULT_API_BASE};

/// Provider credential. Read at start-up, checked only when a call needs it.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Process-wide default model.
pub const MODEL_ENV: &str = "VISION_LENS_MODEL";
/// Override for the OpenAI-compatible API root.
pub const API_BASE_ENV: &str = "VISION_LENS_API_BASE";
/// Named image profile (`compact`, `high-fidelity`).
pub const PROFILE_ENV: &str = "VISION_LENS_PROFILE";

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Explicit settings, typically from command-line flags. `None` defers to the
/// environment and then to built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub profile: Option<String>,
    pub max_dimension: Option<u32>,
    pub quality: Option<u8>,
    pub timeout_secs: Option<u64>,
}

/// Read-only server configuration shared by every call.
#[derive(Clone)]
pub struct ServerConfig {
    pub api_key: Option<String>,
    pub default_model: Option<String>,
    pub api_base: String,
    pub profile: ImageProfile,
    pub request_timeout: Duration,
}

impl ServerConfig {
    /// Resolve from `options` and the process environment.
    pub fn resolve(options: &ConfigOptions) -> VisionResult<Self> {
        Self::resolve_with(options, |key| std::env::var(key).ok())
    }

    /// Resolve from `options` and an arbitrary variable lookup.
    pub fn resolve_with(
        options: &ConfigOptions,
        env: impl Fn(&str) -> Option<String>,
    ) -> VisionResult<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let profile_name =
            non_empty(options.profile.clone()).or_else(|| non_empty(env(PROFILE_ENV)));
        let base_profile = match profile_name {
            Some(name) => ImageProfile::named(&name).ok_or_else(|| {
                VisionError::InvalidInput(format!(
                    "unknown image profile '{name}' (expected 'compact' or 'high-fidelity')"
                ))
            })?,
            None => ImageProfile::default(),
        };
        let profile = ImageProfile::new(
            options.max_dimension.unwrap_or(base_profile.max_dimension),
            options.quality.unwrap_or(base_profile.quality),
        )?;

        Ok(Self {
            api_key: non_empty(env(API_KEY_ENV)),
            default_model: non_empty(options.model.clone()).or_else(|| non_empty(env(MODEL_ENV))),
            api_base: non_empty(options.api_base.clone())
                .or_else(|| non_empty(env(API_BASE_ENV)))
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            profile,
            request_timeout: Duration::from_secs(
                options.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1),
            ),
        })
    }

    /// The credential, if one is configured.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: None,
            api_base: DEFAULT_API_BASE.to_string(),
            profile: ImageProfile::default(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

// Hand-written so the credential never reaches a log line.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("default_model", &self.default_model)
            .field("api_base", &self.api_base)
            .field("profile", &self.profile)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
