//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. A missing required API key fails fast
//! here, before any external call is ever attempted.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// How much of the chat transcript is replayed to the generative endpoint on
/// each turn. The endpoint holds no server-side session state, so continuity
/// only exists if the transcript is resent explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatHistoryMode {
    /// Only the latest message is sent; the assistant has no memory of
    /// prior turns.
    Stateless,
    /// The accumulated transcript is resent on every call.
    FullHistory,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub gemini_api_key: String,
    pub vision_api_key: String,
    pub language_api_key: Option<String>,
    pub storage_bucket: String,
    pub firestore_project: String,
    pub firebase_api_key: String,
    pub gemini_model: String,
    pub quiz_question_count: usize,
    pub summarize_input_cap: usize,
    pub adapter_timeout_secs: u64,
    pub chat_history: ChatHistoryMode,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load API Keys ---
        // The generative, OCR, and Firebase keys are required; the Natural
        // Language key is optional and its absence only degrades sentiment
        // scoring to a neutral default.
        let gemini_api_key = require_var("GEMINI_API_KEY")?;
        let vision_api_key = require_var("VISION_API_KEY")?;
        let language_api_key = std::env::var("LANGUAGE_API_KEY").ok();
        let storage_bucket = require_var("FIREBASE_STORAGE_BUCKET")?;
        let firestore_project = require_var("FIREBASE_PROJECT_ID")?;
        let firebase_api_key = require_var("FIREBASE_API_KEY")?;

        // --- Load Adapter-specific Settings ---
        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());
        let quiz_question_count = parse_var("QUIZ_QUESTION_COUNT", 5)?;
        let summarize_input_cap = parse_var("SUMMARIZE_INPUT_CAP", 20_000)?;
        let adapter_timeout_secs = parse_var("ADAPTER_TIMEOUT_SECS", 30)?;

        let chat_history_str =
            std::env::var("CHAT_HISTORY").unwrap_or_else(|_| "stateless".to_string());
        let chat_history = match chat_history_str.to_ascii_lowercase().as_str() {
            "stateless" => ChatHistoryMode::Stateless,
            "full" => ChatHistoryMode::FullHistory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "CHAT_HISTORY".to_string(),
                    format!("'{}' is not 'stateless' or 'full'", other),
                ))
            }
        };

        Ok(Self {
            bind_address,
            log_level,
            gemini_api_key,
            vision_api_key,
            language_api_key,
            storage_bucket,
            firestore_project,
            firebase_api_key,
            gemini_model,
            quiz_question_count,
            summarize_input_cap,
            adapter_timeout_secs,
            chat_history,
        })
    }
}

fn require_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}
