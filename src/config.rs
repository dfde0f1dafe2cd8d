//! Configuration management for the agent.
//!
//! Configuration can be set via environment variables:
//! - `MODEL_BASE_URL` - Optional. OpenAI-compatible endpoint. Defaults to `http://localhost:8000/v1`.
//! - `MODEL_API_KEY` - Optional. API key for the model endpoint. Defaults to `EMPTY` (local vLLM).
//! - `MODEL_NAME` - Required. Model identifier passed to the endpoint.
//! - `SERPER_API_KEY` - Required. API key for the Serper.dev retrieval backends.
//! - `MAX_STEPS` - Optional. Step budget per question. Defaults to `10`.
//! - `MAX_PIXELS` / `MIN_PIXELS` - Optional. Pixel-count band images are normalized into.
//! - `CROP_PADDING` - Optional. Padding in raw pixels added around crop regions. Defaults to `56`.
//! - `REPEATED_NUMS` - Optional. How often the same image source may be reused. Defaults to `1`.
//! - `MAX_OUTPUT_TOKENS` - Optional. Completion length cap. Defaults to `2048`.
//! - `DISABLE_THINKING` - Optional. Suppress the model's built-in deliberation output. Defaults to `true`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Model endpoint configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// OpenAI-compatible endpoint base URL (e.g. a local vLLM server)
    pub base_url: String,

    /// API key sent as a bearer token
    pub api_key: String,

    /// Model identifier passed in each request
    pub model: String,

    /// Completion length cap
    pub max_output_tokens: u32,

    /// Ask the endpoint to suppress the model's built-in deliberation output
    /// (`chat_template_kwargs.enable_thinking = false`), so reasoning stays
    /// inside the prompt's own `<think>` convention
    pub disable_thinking: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            api_key: "EMPTY".to_string(),
            model: "qwen3-vl-2b-instruct".to_string(),
            max_output_tokens: 2048,
            disable_thinking: true,
        }
    }
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model endpoint settings
    pub model: ModelConfig,

    /// API key for the Serper.dev retrieval backends
    pub serper_api_key: String,

    /// Maximum think/act/observe iterations per question
    pub max_steps: usize,

    /// Upper bound of the pixel-count band images are normalized into
    pub max_pixels: u32,

    /// Lower bound of the pixel-count band
    pub min_pixels: u32,

    /// Padding in raw-image pixels added around crop regions
    pub crop_padding: u32,

    /// How many times the same image source may be returned within one run
    pub repeated_nums: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `MODEL_NAME` or
    /// `SERPER_API_KEY` is not set, and `ConfigError::InvalidValue` for
    /// unparseable numbers or an inverted pixel band.
    pub fn from_env() -> Result<Self, ConfigError> {
        let model_name = std::env::var("MODEL_NAME")
            .map_err(|_| ConfigError::MissingEnvVar("MODEL_NAME".to_string()))?;

        let serper_api_key = std::env::var("SERPER_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("SERPER_API_KEY".to_string()))?;

        let model = ModelConfig {
            base_url: std::env::var("MODEL_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000/v1".to_string()),
            api_key: std::env::var("MODEL_API_KEY").unwrap_or_else(|_| "EMPTY".to_string()),
            model: model_name,
            max_output_tokens: parse_env("MAX_OUTPUT_TOKENS", 2048)?,
            disable_thinking: std::env::var("DISABLE_THINKING")
                .ok()
                .map(|v| {
                    parse_bool(&v)
                        .map_err(|e| ConfigError::InvalidValue("DISABLE_THINKING".to_string(), e))
                })
                .transpose()?
                .unwrap_or(true),
        };

        let config = Self {
            model,
            serper_api_key,
            max_steps: parse_env("MAX_STEPS", 10)?,
            max_pixels: parse_env("MAX_PIXELS", 512 * 28 * 28)?,
            min_pixels: parse_env("MIN_PIXELS", 256 * 28 * 28)?,
            crop_padding: parse_env("CROP_PADDING", 56)?,
            repeated_nums: parse_env("REPEATED_NUMS", 1)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(model: ModelConfig, serper_api_key: String) -> Self {
        Self {
            model,
            serper_api_key,
            max_steps: 10,
            max_pixels: 512 * 28 * 28,
            min_pixels: 256 * 28 * 28,
            crop_padding: 56,
            repeated_nums: 1,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_pixels >= self.max_pixels {
            return Err(ConfigError::InvalidValue(
                "MIN_PIXELS".to_string(),
                format!(
                    "must be below MAX_PIXELS ({} >= {})",
                    self.min_pixels, self.max_pixels
                ),
            ));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_STEPS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}
