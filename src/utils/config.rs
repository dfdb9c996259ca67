use crate::utils::errors::{CsvTranslatorError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub translation: TranslationDefaults,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationDefaults {
    pub max_concurrent_requests: usize,
    /// Unset means requests are only limited by concurrency.
    pub requests_per_minute: Option<u32>,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub failed_rows_output: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            timeout_seconds: 120,
        }
    }
}

impl Default for TranslationDefaults {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 4,
            requests_per_minute: None,
            max_attempts: 4,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            failed_rows_output: PathBuf::from("./failed_rows.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CsvTranslatorError::ConfigError(format!("{}: {}", path, e)))?;
        toml::from_str(&content)
            .map_err(|e| CsvTranslatorError::ConfigError(format!("{}: {}", path, e)))
    }

    /// A missing file yields defaults. A file that exists but does not parse
    /// is an error.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) if std::path::Path::new(p).exists() => Self::load_from_file(p),
            _ => Ok(Self::default()),
        }
    }
}

/// Everything one run of the driver needs, after CLI overrides are applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationJobConfig {
    pub column: String,
    pub output_column: Option<String>,
    pub source_lang: Option<String>,
    pub target_lang: String,
    pub start_row: usize,
    pub end_row: Option<usize>,
    pub max_concurrent_requests: usize,
    pub requests_per_minute: Option<u32>,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl TranslationJobConfig {
    pub fn new(column: impl Into<String>, target_lang: impl Into<String>) -> Self {
        let defaults = TranslationDefaults::default();
        Self {
            column: column.into(),
            output_column: None,
            source_lang: None,
            target_lang: target_lang.into(),
            start_row: 0,
            end_row: None,
            max_concurrent_requests: defaults.max_concurrent_requests,
            requests_per_minute: defaults.requests_per_minute,
            max_attempts: defaults.max_attempts,
            base_delay: Duration::from_millis(defaults.base_delay_ms),
            max_delay: Duration::from_millis(defaults.max_delay_ms),
        }
    }

    pub fn with_defaults(mut self, defaults: &TranslationDefaults) -> Self {
        self.max_concurrent_requests = defaults.max_concurrent_requests;
        self.requests_per_minute = defaults.requests_per_minute;
        self.max_attempts = defaults.max_attempts;
        self.base_delay = Duration::from_millis(defaults.base_delay_ms);
        self.max_delay = Duration::from_millis(defaults.max_delay_ms);
        self
    }

    /// Checks settings that do not depend on the input table.
    pub fn validate(&self) -> Result<()> {
        if self.column.trim().is_empty() {
            return Err(CsvTranslatorError::ConfigError(
                "column name must not be empty".to_string(),
            ));
        }
        if self.target_lang.trim().is_empty() {
            return Err(CsvTranslatorError::ConfigError(
                "target language must not be empty".to_string(),
            ));
        }
        if self.max_concurrent_requests == 0 {
            return Err(CsvTranslatorError::ConfigError(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(CsvTranslatorError::ConfigError(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.requests_per_minute == Some(0) {
            return Err(CsvTranslatorError::ConfigError(
                "requests_per_minute must be positive when set".to_string(),
            ));
        }
        if let Some(end) = self.end_row {
            if self.start_row > end {
                return Err(CsvTranslatorError::ConfigError(format!(
                    "start row {} is after end row {}",
                    self.start_row, end
                )));
            }
        }
        Ok(())
    }

    /// Resolves the half-open row range against the table size.
    pub fn row_range(&self, total_rows: usize) -> Result<std::ops::Range<usize>> {
        if self.start_row > total_rows {
            return Err(CsvTranslatorError::ConfigError(format!(
                "start row {} is beyond the {} rows of the input",
                self.start_row, total_rows
            )));
        }
        let end = self.end_row.unwrap_or(total_rows).min(total_rows);
        Ok(self.start_row..end)
    }
}
