//! Command implementations for the testreport CLI
//!
//! Each command lives in its own module.

use crate::ci::EnvSnapshot;
use crate::config::{ConfigOverrides, ConfigResolver, ReportingConfig};
use anyhow::{Context, Result};
use std::path::Path;

pub mod config;
pub mod detect;
pub mod generate;

/// Resolve the configuration for this run, falling back to defaults when the
/// merged configuration is invalid
pub(crate) fn resolve_config(
    env: &EnvSnapshot,
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<ReportingConfig> {
    let resolver = match config_path {
        Some(path) => ConfigResolver::new(env).with_config_file(path),
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            ConfigResolver::new(env).with_project_dir(&cwd)
        }
    };
    Ok(resolver.resolve_or_default(overrides))
}
