//! End-to-end reporting run
//!
//! Ties the pieces together for one build: collect metadata, aggregate suite
//! results, generate every configured format and decide the process exit
//! status.

use crate::ci::{self, CiInfo, EnvSnapshot};
use crate::config::ReportingConfig;
use crate::git::{GitQuery, GitRepo};
use crate::metadata::MetadataCollector;
use crate::model::{CoverageInput, SuiteResult};
use crate::reports::{GenerationResult, ProgressCallback, ReportModel, ReportOrchestrator, RequestedFormat};

/// Exit status of a reporting run, for the wrapping build step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// At least one test failed
    TestsFailed,
    /// Reports could not be written and the configuration treats that as fatal
    ReportsFailed,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::TestsFailed => 1,
            ExitStatus::ReportsFailed => 2,
        }
    }

    /// Test failures win over report failures. Report failures never fail a CI
    /// build and only fail a local build when `fail_on_error` is set.
    pub fn decide(tests_failed: bool, reports_ok: bool, is_ci: bool, fail_on_error: bool) -> Self {
        if tests_failed {
            ExitStatus::TestsFailed
        } else if !reports_ok && !is_ci && fail_on_error {
            ExitStatus::ReportsFailed
        } else {
            ExitStatus::Success
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub model: ReportModel,
    pub generation: GenerationResult,
}

impl PipelineOutcome {
    pub fn ci_info(&self) -> &CiInfo {
        &self.model.build_metadata.ci_info
    }

    pub fn exit_status(&self, config: &ReportingConfig) -> ExitStatus {
        ExitStatus::decide(
            self.model.metrics.has_failures(),
            self.generation.success,
            self.ci_info().is_ci,
            config.errors.fail_on_error,
        )
    }
}

/// One reporting run over a resolved configuration
pub struct Pipeline<'a> {
    config: &'a ReportingConfig,
    env: &'a EnvSnapshot,
    git: Box<dyn GitQuery + 'a>,
    formats: Option<Vec<RequestedFormat>>,
    progress: Option<ProgressCallback>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a ReportingConfig, env: &'a EnvSnapshot) -> Self {
        Self {
            config,
            env,
            git: Box::new(GitRepo::discover()),
            formats: None,
            progress: None,
        }
    }

    pub fn with_git(mut self, git: impl GitQuery + 'a) -> Self {
        self.git = Box::new(git);
        self
    }

    /// Generate these formats instead of the configured ones
    pub fn with_formats(mut self, formats: Vec<RequestedFormat>) -> Self {
        self.formats = Some(formats);
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Aggregate inputs and collect metadata into the model shared by every generator
    pub fn build_model(&self, suites: &[SuiteResult], coverage: Option<&CoverageInput>) -> ReportModel {
        let build_metadata = MetadataCollector::new(self.env)
            .with_git(&*self.git)
            .with_environment(self.config.environment.clone())
            .collect();
        let metrics = self.config.aggregator().aggregate(suites, coverage);

        tracing::debug!(
            "Aggregated {} suites: {} tests, {} failed",
            suites.len(),
            metrics.summary.total_tests,
            metrics.summary.failed_tests
        );

        ReportModel {
            title: self.config.output.title.clone(),
            metrics,
            build_metadata,
            suites: suites.to_vec(),
        }
    }

    pub async fn run(&self, suites: &[SuiteResult], coverage: Option<&CoverageInput>) -> PipelineOutcome {
        let model = self.build_model(suites, coverage);

        let mut options = self.config.generation_options();
        if let Some(formats) = &self.formats {
            options.formats = formats.clone();
        }
        options.progress = self.progress.clone();

        let generation = ReportOrchestrator::generate_reports(&model, &options).await;
        if ci::detect(self.env).is_ci && self.config.ci.upload_artifacts {
            for report in generation.successful() {
                if let Some(path) = &report.path {
                    tracing::info!("Artifact ready for upload: {}", path.display());
                }
            }
        }

        PipelineOutcome { model, generation }
    }
}
