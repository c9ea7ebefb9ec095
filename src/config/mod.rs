//! Configuration management for testreport
//!
//! Configuration is layered with figment: the embedded `default-config.toml`,
//! an optional project file, the environment table, CI adjustments and finally
//! explicit overrides from the caller. See [`ConfigResolver`].

use crate::aggregate::Aggregator;
use crate::model::CoverageThreshold;
use crate::reports::{ReportGenerationOptions, RequestedFormat, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod core;
mod overrides;

pub use self::core::{ConfigResolver, DEFAULT_CONFIG, PROJECT_CONFIG_FILE};
pub use self::overrides::{ConfigOverrides, OutputOverrides, PerformanceOverrides, parse_bool};

/// Invalid or unloadable configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("invalid configuration: `{field}` {reason}")]
    Invalid { field: String, reason: String },

    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

impl ConfigurationError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Run the reporting pipeline at all
    pub enabled: bool,
    /// Free-form environment label embedded in build metadata
    pub environment: String,
    pub output: OutputConfig,
    pub performance: PerformanceConfig,
    pub retry: RetryConfig,
    pub errors: ErrorsConfig,
    pub coverage: CoverageConfig,
    pub ci: CiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub base_filename: String,
    pub title: String,
    pub formats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub parallel: bool,
    /// Overall generation timeout in milliseconds, 0 = none
    pub timeout_ms: u64,
    pub max_slowest_tests: usize,
    pub max_failed_tests: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorsConfig {
    /// Log generation failures with full detail
    pub verbose: bool,
    /// Exit non-zero outside CI when a report could not be written
    pub fail_on_error: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    pub thresholds: CoverageThreshold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CiConfig {
    pub upload_artifacts: bool,
    pub timeout_multiplier: u32,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            environment: crate::metadata::DEFAULT_ENVIRONMENT.to_string(),
            output: OutputConfig::default(),
            performance: PerformanceConfig::default(),
            retry: RetryConfig::default(),
            errors: ErrorsConfig::default(),
            coverage: CoverageConfig::default(),
            ci: CiConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("test-reports"),
            base_filename: "test-report".to_string(),
            title: "Test Report".to_string(),
            formats: vec!["json".to_string(), "markdown".to_string(), "html".to_string()],
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            timeout_ms: 30_000,
            max_slowest_tests: crate::aggregate::DEFAULT_MAX_SLOWEST,
            max_failed_tests: crate::aggregate::DEFAULT_MAX_FAILED,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            fail_on_error: true,
        }
    }
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            upload_artifacts: false,
            timeout_multiplier: 4,
        }
    }
}

impl ReportingConfig {
    pub fn formats(&self) -> Vec<RequestedFormat> {
        self.output
            .formats
            .iter()
            .map(|name| RequestedFormat::from(name.as_str()))
            .collect()
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.performance.timeout_ms > 0).then(|| Duration::from_millis(self.performance.timeout_ms))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn aggregator(&self) -> Aggregator {
        Aggregator::new(
            self.performance.max_slowest_tests,
            self.performance.max_failed_tests,
            self.coverage.thresholds,
        )
    }

    /// Orchestrator options for this configuration, without a progress callback
    pub fn generation_options(&self) -> ReportGenerationOptions {
        ReportGenerationOptions {
            formats: self.formats(),
            output_dir: self.output.directory.clone(),
            title: self.output.title.clone(),
            base_filename: self.output.base_filename.clone(),
            parallel: self.performance.parallel,
            timeout: self.timeout(),
            retry: self.retry_policy(),
            verbose_errors: self.errors.verbose,
            progress: None,
        }
    }

    /// Check the merged configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.output.formats.is_empty() {
            return Err(ConfigurationError::invalid(
                "output.formats",
                "must list at least one format",
            ));
        }
        for format in self.formats() {
            if let RequestedFormat::Unsupported(name) = format {
                return Err(ConfigurationError::invalid(
                    "output.formats",
                    format!("contains unsupported format `{name}`"),
                ));
            }
        }

        if self.output.directory.as_os_str().is_empty() {
            return Err(ConfigurationError::invalid("output.directory", "must not be empty"));
        }

        let base = self.output.base_filename.trim();
        if base.is_empty() {
            return Err(ConfigurationError::invalid("output.base_filename", "must not be empty"));
        }
        if base.contains(['/', '\\']) {
            return Err(ConfigurationError::invalid(
                "output.base_filename",
                "must not contain path separators",
            ));
        }

        if !(1..=10).contains(&self.retry.max_attempts) {
            return Err(ConfigurationError::invalid(
                "retry.max_attempts",
                format!("must be between 1 and 10, got {}", self.retry.max_attempts),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigurationError::invalid(
                "retry.base_delay_ms",
                "must not exceed retry.max_delay_ms",
            ));
        }

        if self.performance.max_slowest_tests == 0 {
            return Err(ConfigurationError::invalid(
                "performance.max_slowest_tests",
                "must be at least 1",
            ));
        }

        for (name, minimum) in self.coverage.thresholds.dimensions() {
            if !(0.0..=100.0).contains(&minimum) {
                return Err(ConfigurationError::invalid(
                    &format!("coverage.thresholds.{name}"),
                    format!("must be within 0..=100, got {minimum}"),
                ));
            }
        }

        Ok(())
    }
}
