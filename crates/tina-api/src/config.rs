//! Server configuration, read once from the environment at startup.
use std::path::PathBuf;
use std::time::Duration;

use tina_core::InterviewError;
use tina_gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub google_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub generation_timeout: Duration,
    /// Prompt book override; the built-in one is used when unset
    pub prompts_path: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, InterviewError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, InterviewError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let google_api_key = get("GOOGLE_API_KEY").ok_or_else(|| {
            InterviewError::Misconfiguration("GOOGLE_API_KEY is not set".to_string())
        })?;

        let addr = match get("TINA_ADDR") {
            Some(addr) => addr,
            None => {
                let port = match get("PORT") {
                    Some(raw) => raw.parse::<u16>().map_err(|_| {
                        InterviewError::Misconfiguration(format!("PORT is not a valid port: {}", raw))
                    })?,
                    None => DEFAULT_PORT,
                };
                format!("0.0.0.0:{}", port)
            }
        };

        let timeout_secs = match get("TINA_GENERATION_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                InterviewError::Misconfiguration(format!(
                    "TINA_GENERATION_TIMEOUT_SECS must be a positive integer: {}",
                    raw
                ))
            })?,
            None => DEFAULT_GENERATION_TIMEOUT_SECS,
        };

        Ok(Self {
            addr,
            google_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            generation_timeout: Duration::from_secs(timeout_secs),
            prompts_path: get("TINA_PROMPTS_PATH").map(PathBuf::from),
        })
    }
}
