//! `testreport config` - inspect the resolved configuration

use super::resolve_config;
use crate::ci::EnvSnapshot;
use crate::cli::Output;
use crate::config::ConfigOverrides;
use crate::pipeline::ExitStatus;
use anyhow::{Context, Result};
use std::path::Path;

/// Print the configuration after every layer has been applied
pub fn show(config_path: Option<&Path>, json: bool, output: &Output) -> Result<ExitStatus> {
    let env = EnvSnapshot::capture();
    let config = resolve_config(&env, config_path, &ConfigOverrides::default())?;

    let rendered = if json {
        serde_json::to_string_pretty(&config).context("Failed to serialize configuration")?
    } else {
        toml::to_string_pretty(&config).context("Failed to serialize configuration")?
    };

    if !json && !output.is_quiet() {
        println!("# Resolved testreport configuration");
    }
    println!("{}", rendered.trim_end());
    Ok(ExitStatus::Success)
}
