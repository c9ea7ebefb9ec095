//! `testreport generate` - run the full reporting pipeline

use super::resolve_config;
use crate::ci::{self, EnvSnapshot};
use crate::cli::{GenerateArgs, Output};
use crate::config::{ConfigOverrides, OutputOverrides, PerformanceOverrides};
use crate::input;
use crate::pipeline::{ExitStatus, Pipeline, PipelineOutcome};
use crate::reports::utils::{format_duration_ms, format_file_size, format_percent};
use crate::reports::{GenerationOutcome, ProgressStage, ProgressUpdate, RequestedFormat};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

impl GenerateArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            output: OutputOverrides {
                directory: self.output_dir.as_ref().map(|p| p.display().to_string()),
                base_filename: self.base_name.clone(),
                title: self.title.clone(),
                ..OutputOverrides::default()
            },
            performance: PerformanceOverrides {
                parallel: self.sequential.then_some(false),
                timeout_ms: self.timeout_ms,
            },
            ..ConfigOverrides::default()
        }
    }
}

/// Execute the generate command
pub async fn execute(args: GenerateArgs, config_path: Option<&Path>, output: &Output) -> Result<ExitStatus> {
    let env = EnvSnapshot::capture();
    let config = resolve_config(&env, config_path, &args.overrides())?;

    if !config.enabled {
        output.info("Test reporting is disabled; skipping report generation");
        return Ok(ExitStatus::Success);
    }

    // Unreadable inputs are fatal locally; in CI the run continues with what loaded
    let in_ci = ci::detect(&env).is_ci;
    let suites = tolerate_in_ci(input::load_suites(&args.results), in_ci, output)?.unwrap_or_default();
    let coverage = match args.coverage.as_deref() {
        Some(path) => tolerate_in_ci(input::load_coverage(path), in_ci, output)?,
        None => None,
    };
    output.verbose(&format!("Loaded {} suites from {}", suites.len(), args.results.display()));

    let bar = output.progress_bar("generating reports");
    let progress_bar = bar.clone();
    let mut pipeline = Pipeline::new(&config, &env).with_progress(Arc::new(move |update: &ProgressUpdate| {
        progress_bar.set_position(update.percentage.round() as u64);
        if let (ProgressStage::FormatStarted, Some(format)) = (update.stage, &update.format) {
            progress_bar.set_message(format!("{format}..."));
        }
    }));
    // Formats named on the command line bypass config validation so that an
    // unsupported name fails only its own entry.
    if let Some(list) = &args.formats {
        pipeline = pipeline.with_formats(RequestedFormat::parse_list(list));
    }

    let outcome = pipeline.run(&suites, coverage.as_ref()).await;
    bar.finish_and_clear();

    print_summary(&outcome, output);
    Ok(outcome.exit_status(&config))
}

fn tolerate_in_ci<T>(loaded: Result<T>, in_ci: bool, output: &Output) -> Result<Option<T>> {
    match loaded {
        Ok(value) => Ok(Some(value)),
        Err(e) if in_ci => {
            tracing::error!("Ignoring unreadable test input in CI: {e:#}");
            output.error(&format!("{e:#}"));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn print_summary(outcome: &PipelineOutcome, output: &Output) {
    let summary = &outcome.model.metrics.summary;

    output.header(&outcome.model.title);
    output.key_value("Tests", &summary.total_tests.to_string(), false);
    output.key_value("Passed", &summary.passed_tests.to_string(), summary.failed_tests == 0);
    output.key_value("Failed", &summary.failed_tests.to_string(), false);
    output.key_value("Skipped", &summary.skipped_tests.to_string(), false);
    output.key_value("Pass rate", &format_percent(summary.pass_rate), false);
    output.key_value("Duration", &format_duration_ms(summary.execution_time), false);

    let ci = outcome.ci_info();
    if ci.is_ci {
        output.key_value("CI", ci.provider_name(), false);
    }

    output.section_header("Reports");
    for report in &outcome.generation.reports {
        match (&report.error, &report.path) {
            (None, Some(path)) => output.status_indicator(
                &report.format,
                &format!("{} ({})", path.display(), format_file_size(report.size)),
                true,
            ),
            (Some(error), _) => output.status_indicator(&report.format, &error.message, false),
            (None, None) => {}
        }
    }

    match outcome.generation.outcome() {
        GenerationOutcome::Success => output.success("All reports generated"),
        GenerationOutcome::Partial => output.warning("Some reports could not be generated"),
        GenerationOutcome::Failed => {
            let reasons: Vec<String> = outcome.generation.errors.iter().map(ToString::to_string).collect();
            output.error(&format!("No report could be generated: {}", reasons.join("; ")));
        }
    }

    if summary.failed_tests > 0 {
        output.error(&format!("{} test(s) failed", summary.failed_tests));
    }
}
