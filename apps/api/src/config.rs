use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, ensure, Context, Result};

use crate::generation::pipeline::{ModelConfig, PipelineSettings};
use crate::llm_client::retry::{JitterStrategy, RetryPolicy};

pub const DEFAULT_PLANNER_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_WRITER_MODEL: &str = "gemini-2.5-flash";

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a number does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub planner_model: String,
    pub writer_model: String,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_jitter: JitterStrategy,
    /// Pause between consecutive angles.
    pub angle_delay_ms: u64,
    /// Pause between the question and statement hook calls.
    pub hook_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same parsing as `from_env`, against any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Config {
            google_api_key: get("GOOGLE_API_KEY").with_context(|| {
                "Required environment variable 'GOOGLE_API_KEY' is not set".to_string()
            })?,
            port: parse_or(get("PORT"), "PORT", 8080)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            planner_model: get("PLANNER_MODEL").unwrap_or_else(|| DEFAULT_PLANNER_MODEL.to_string()),
            writer_model: get("WRITER_MODEL").unwrap_or_else(|| DEFAULT_WRITER_MODEL.to_string()),
            retry_max_attempts: parse_or(get("RETRY_MAX_ATTEMPTS"), "RETRY_MAX_ATTEMPTS", 3)?,
            retry_base_delay_ms: parse_or(get("RETRY_BASE_DELAY_MS"), "RETRY_BASE_DELAY_MS", 2000)?,
            retry_jitter: match get("RETRY_JITTER") {
                Some(raw) => raw
                    .parse()
                    .map_err(|e: String| anyhow!(e))
                    .context("RETRY_JITTER is invalid")?,
                None => JitterStrategy::None,
            },
            angle_delay_ms: parse_or(get("ANGLE_DELAY_MS"), "ANGLE_DELAY_MS", 2000)?,
            hook_delay_ms: parse_or(get("HOOK_DELAY_MS"), "HOOK_DELAY_MS", 1000)?,
        };

        ensure!(
            config.retry_max_attempts >= 1,
            "RETRY_MAX_ATTEMPTS must be at least 1"
        );
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            jitter: self.retry_jitter,
            ..RetryPolicy::default()
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            models: ModelConfig {
                planner: self.planner_model.clone(),
                writer: self.writer_model.clone(),
            },
            angle_delay: Duration::from_millis(self.angle_delay_ms),
            hook_delay: Duration::from_millis(self.hook_delay_ms),
        }
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{value}'")),
        None => Ok(default),
    }
}
