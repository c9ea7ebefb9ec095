//! `testreport detect` - show the CI identity of this environment

use crate::ci::{self, EnvSnapshot};
use crate::cli::Output;
use crate::pipeline::ExitStatus;
use anyhow::{Context, Result};

/// Execute the detect command
pub fn execute(json: bool, output: &Output) -> Result<ExitStatus> {
    let info = ci::detect(&EnvSnapshot::capture());

    if json {
        let rendered = serde_json::to_string_pretty(&info).context("Failed to serialize CI info")?;
        println!("{rendered}");
        return Ok(ExitStatus::Success);
    }

    if !info.is_ci {
        output.info("Not running under CI");
        return Ok(ExitStatus::Success);
    }

    let provider = info.provider.map_or("unknown", |p| p.display_name());
    output.header("CI environment");
    output.key_value("Provider", provider, true);
    output.key_value("Build", info.build_number.as_deref().unwrap_or("N/A"), false);
    if let Some(sha) = &info.commit_sha {
        output.key_value("Commit", sha, false);
    }
    if let Some(job) = &info.job_name {
        output.key_value("Job", job, false);
    }
    Ok(ExitStatus::Success)
}
