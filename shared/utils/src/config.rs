use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::report::{LayoutRules, SegmentOptions, SplitStrategy};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub layout: LayoutConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size: usize,
    pub timeout_seconds: u64,
    /// Analyses older than this are dropped; 0 keeps them until evicted by
    /// `max_sessions`
    pub session_ttl_seconds: u64,
    /// Oldest analyses are evicted beyond this count
    pub max_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

/// Section splitting and card layout rules. These follow the prompt template
/// in use, so they are configuration rather than code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// `heading_pattern` or `marker_count`
    pub split_strategy: String,
    pub heading_marker_count: usize,
    pub full_width_keywords: Vec<String>,
    pub document_title_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                File::with_name(&format!(
                    "config/{}",
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            .add_source(File::with_name("config/local").required(false))
            // Environment variables with BRANDLENS prefix, e.g. BRANDLENS__LLM__API_KEY
            .add_source(Environment::with_prefix("BRANDLENS").separator("__"));

        let mut app_config: AppConfig = config.build()?.try_deserialize()?;

        if app_config.llm.api_key.is_empty() {
            if let Ok(key) = env::var("OPENAI_API_KEY") {
                app_config.llm.api_key = key;
            }
        }

        Ok(app_config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_request_size: 64 * 1024 * 1024, // 64MB, two reports per request
            timeout_seconds: 120,
            session_ttl_seconds: 24 * 60 * 60,
            max_sessions: 500,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4-0125-preview".to_string(),
            temperature: 0.7,
            timeout_seconds: 60,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            split_strategy: "heading_pattern".to_string(),
            heading_marker_count: 3,
            full_width_keywords: vec!["overlap".to_string(), "affinity".to_string()],
            document_title_prefixes: vec!["Strategic Market Analysis".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl ServerConfig {
    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_seconds > 0).then(|| Duration::from_secs(self.session_ttl_seconds))
    }
}

impl LayoutConfig {
    pub fn split_strategy(&self) -> SplitStrategy {
        match self.split_strategy.as_str() {
            "marker_count" => SplitStrategy::MarkerCount(self.heading_marker_count.max(1)),
            _ => SplitStrategy::HeadingPattern,
        }
    }

    pub fn segment_options(&self) -> SegmentOptions {
        SegmentOptions {
            strategy: self.split_strategy(),
            document_title_prefixes: self.document_title_prefixes.clone(),
        }
    }

    pub fn layout_rules(&self) -> LayoutRules {
        LayoutRules {
            full_width_keywords: self.full_width_keywords.clone(),
        }
    }
}
