//! Tina Gemini: `TextGenerator` backed by the Gemini REST API

pub mod client;
pub mod types;

pub use client::{parse_http_error, GeminiClient, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
