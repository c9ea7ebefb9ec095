//! Partial configuration layers merged over the file configuration
//!
//! Unset fields are skipped during serialization so that a layer only replaces
//! what it actually sets.

use super::ReportingConfig;
use crate::ci::{CiInfo, EnvSnapshot};
use serde::Serialize;

pub const ENV_REPORTS_DIR: &str = "TEST_REPORTS_DIR";
pub const ENV_ENABLED: &str = "TEST_REPORTING_ENABLED";
pub const ENV_FORMATS: &str = "TEST_REPORTING_FORMATS";
pub const ENV_PARALLEL: &str = "TEST_REPORTING_PARALLEL";
pub const ENV_ENVIRONMENT: &str = "TEST_REPORTING_ENVIRONMENT";

/// Explicit overrides, highest priority
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    pub output: OutputOverrides,
    pub performance: PerformanceOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formats: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Lenient boolean parsing for environment values
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool(env: &EnvSnapshot, key: &str) -> Option<bool> {
    let raw = env.non_empty(key)?;
    let parsed = parse_bool(raw);
    if parsed.is_none() {
        tracing::warn!("Ignoring {key}={raw:?}: expected a boolean");
    }
    parsed
}

impl ConfigOverrides {
    /// The layer described by the recognised environment variables.
    /// Malformed values are skipped and the previous value stays in effect.
    pub fn from_env(env: &EnvSnapshot) -> Self {
        let formats = env.non_empty(ENV_FORMATS).and_then(|raw| {
            let list: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if list.is_empty() {
                tracing::warn!("Ignoring {ENV_FORMATS}={raw:?}: no formats listed");
                None
            } else {
                Some(list)
            }
        });

        Self {
            enabled: env_bool(env, ENV_ENABLED),
            environment: env.non_empty(ENV_ENVIRONMENT).map(|s| s.trim().to_string()),
            output: OutputOverrides {
                directory: env.non_empty(ENV_REPORTS_DIR).map(|s| s.trim().to_string()),
                formats,
                ..OutputOverrides::default()
            },
            performance: PerformanceOverrides {
                parallel: env_bool(env, ENV_PARALLEL),
                ..PerformanceOverrides::default()
            },
        }
    }
}

/// Adjust a configuration for a CI run. `environment_pinned` keeps an
/// environment label that was set explicitly through the environment table.
pub(crate) fn apply_ci(config: &mut ReportingConfig, ci: &CiInfo, environment_pinned: bool) {
    if !ci.is_ci {
        return;
    }

    if config.performance.timeout_ms > 0 {
        config.performance.timeout_ms = config
            .performance
            .timeout_ms
            .saturating_mul(u64::from(config.ci.timeout_multiplier.max(1)));
    }
    config.errors.verbose = true;
    config.errors.fail_on_error = false;
    config.ci.upload_artifacts = true;
    if !environment_pinned {
        config.environment = "ci".to_string();
    }

    tracing::debug!(
        "Applied CI overrides for {} (timeout {}ms)",
        ci.provider_name(),
        config.performance.timeout_ms
    );
}
