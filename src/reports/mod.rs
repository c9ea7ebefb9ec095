//! Report generation
//!
//! One generator per [`ReportFormat`], selected by an exhaustive match in
//! [`generator_for`]. Each generator renders the shared [`ReportModel`] into a
//! string; [`generate`] writes that string to exactly one file and turns any
//! failure into a failed [`ReportResult`] instead of an error.
//!
//! [`ReportOrchestrator`] runs several formats in one go, in parallel or
//! sequentially, with retries, an optional overall timeout and progress
//! callbacks.

use crate::metadata::BuildMetadata;
use crate::model::{SuiteResult, TestMetrics};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

mod error;
mod html;
mod json;
mod markdown;
mod orchestrator;
mod retry;
pub mod utils;

pub use error::{GenerationError, GenerationErrorKind};
pub use html::HtmlReportGenerator;
pub use json::{JsonReport, JsonReportGenerator};
pub use markdown::MarkdownReportGenerator;
pub use orchestrator::ReportOrchestrator;
pub use retry::RetryPolicy;

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Structured data; the normative schema
    Json,
    /// Formatted document
    Markdown,
    /// Styled document
    Html,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 3] = [ReportFormat::Json, ReportFormat::Markdown, ReportFormat::Html];

    pub fn name(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "markdown",
            ReportFormat::Html => "html",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "md",
            ReportFormat::Html => "html",
        }
    }

    /// `<dir>/<base>.<extension>`
    pub fn output_path(&self, dir: &Path, base_filename: &str) -> PathBuf {
        dir.join(format!("{base_filename}.{}", self.extension()))
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportFormat {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "html" => Ok(ReportFormat::Html),
            other => Err(GenerationError::unsupported(other)),
        }
    }
}

/// A format as requested by the caller, which may name an unsupported format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedFormat {
    Known(ReportFormat),
    Unsupported(String),
}

impl RequestedFormat {
    pub fn name(&self) -> &str {
        match self {
            RequestedFormat::Known(format) => format.name(),
            RequestedFormat::Unsupported(name) => name,
        }
    }

    /// Parse a comma-separated list, skipping blank entries
    pub fn parse_list(list: &str) -> Vec<RequestedFormat> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(RequestedFormat::from)
            .collect()
    }
}

impl From<&str> for RequestedFormat {
    fn from(name: &str) -> Self {
        match name.parse() {
            Ok(format) => RequestedFormat::Known(format),
            Err(_) => RequestedFormat::Unsupported(name.trim().to_string()),
        }
    }
}

impl From<ReportFormat> for RequestedFormat {
    fn from(format: ReportFormat) -> Self {
        RequestedFormat::Known(format)
    }
}

/// Immutable input of every generator
#[derive(Debug, Clone, PartialEq)]
pub struct ReportModel {
    pub title: String,
    pub metrics: TestMetrics,
    pub build_metadata: BuildMetadata,
    pub suites: Vec<SuiteResult>,
}

/// Renders a [`ReportModel`] into the content of one artifact
pub trait ReportGenerator: Send + Sync {
    fn format(&self) -> ReportFormat;

    fn render(&self, model: &ReportModel) -> Result<String, GenerationError>;
}

/// The generator for a format
pub fn generator_for(format: ReportFormat) -> Box<dyn ReportGenerator> {
    match format {
        ReportFormat::Json => Box::new(JsonReportGenerator),
        ReportFormat::Markdown => Box::new(MarkdownReportGenerator),
        ReportFormat::Html => Box::new(HtmlReportGenerator),
    }
}

/// Outcome of one format
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResult {
    pub format: String,
    pub path: Option<PathBuf>,
    /// Size of the written file in bytes
    pub size: u64,
    pub success: bool,
    pub error: Option<GenerationError>,
    pub attempts: u32,
}

impl ReportResult {
    pub fn succeeded(format: ReportFormat, path: PathBuf, size: u64, attempts: u32) -> Self {
        Self {
            format: format.name().to_string(),
            path: Some(path),
            size,
            success: true,
            error: None,
            attempts,
        }
    }

    pub fn failed(format: &str, path: Option<PathBuf>, error: GenerationError, attempts: u32) -> Self {
        Self {
            format: format.to_string(),
            path,
            size: 0,
            success: false,
            error: Some(error),
            attempts,
        }
    }
}

/// Overall result classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationOutcome {
    Success,
    /// Some, but not all, requested formats were produced
    Partial,
    /// No requested format was produced
    Failed,
}

/// Merged result of a multi-format run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// True only if every requested format succeeded
    pub success: bool,
    pub reports: Vec<ReportResult>,
    pub errors: Vec<GenerationError>,
    /// Total wall time in milliseconds
    pub duration: u64,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl GenerationResult {
    pub fn from_reports(reports: Vec<ReportResult>, duration: Duration) -> Self {
        let errors: Vec<GenerationError> = reports.iter().filter_map(|r| r.error.clone()).collect();
        Self {
            success: !reports.is_empty() && reports.iter().all(|r| r.success),
            reports,
            errors,
            duration: millis(duration),
        }
    }

    /// A request rejected before any generator ran
    pub fn rejected(error: GenerationError, duration: Duration) -> Self {
        Self {
            success: false,
            reports: Vec::new(),
            errors: vec![error],
            duration: millis(duration),
        }
    }

    pub fn outcome(&self) -> GenerationOutcome {
        let succeeded = self.reports.iter().filter(|r| r.success).count();
        if self.success {
            GenerationOutcome::Success
        } else if succeeded > 0 {
            GenerationOutcome::Partial
        } else {
            GenerationOutcome::Failed
        }
    }

    pub fn successful(&self) -> impl Iterator<Item = &ReportResult> {
        self.reports.iter().filter(|r| r.success)
    }
}

/// Stage of a progress update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    Started,
    FormatStarted,
    FormatFinished,
    Completed,
}

/// Progress notification passed to [`ProgressCallback`]
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Share of settled formats, 0-100
    pub percentage: f64,
    pub stage: ProgressStage,
    pub format: Option<String>,
}

pub type ProgressCallback = Arc<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Options for [`ReportOrchestrator::generate_reports`]
#[derive(Clone)]
pub struct ReportGenerationOptions {
    pub formats: Vec<RequestedFormat>,
    pub output_dir: PathBuf,
    /// Overrides the model title when non-empty
    pub title: String,
    pub base_filename: String,
    pub parallel: bool,
    pub timeout: Option<Duration>,
    pub retry: RetryPolicy,
    /// Log failures with their full message instead of a one-line summary
    pub verbose_errors: bool,
    pub progress: Option<ProgressCallback>,
}

impl Default for ReportGenerationOptions {
    fn default() -> Self {
        Self {
            formats: ReportFormat::ALL.iter().copied().map(RequestedFormat::from).collect(),
            output_dir: PathBuf::from("test-reports"),
            title: String::new(),
            base_filename: "test-report".to_string(),
            parallel: true,
            timeout: None,
            retry: RetryPolicy::default(),
            verbose_errors: false,
            progress: None,
        }
    }
}

impl fmt::Debug for ReportGenerationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportGenerationOptions")
            .field("formats", &self.formats)
            .field("output_dir", &self.output_dir)
            .field("title", &self.title)
            .field("base_filename", &self.base_filename)
            .field("parallel", &self.parallel)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("verbose_errors", &self.verbose_errors)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Render and write one artifact. Never returns an error; failures become a
/// failed [`ReportResult`].
pub async fn generate(format: ReportFormat, model: &ReportModel, output_path: &Path) -> ReportResult {
    match try_generate(format, model, output_path).await {
        Ok(size) => ReportResult::succeeded(format, output_path.to_path_buf(), size, 1),
        Err(e) => ReportResult::failed(format.name(), Some(output_path.to_path_buf()), e, 1),
    }
}

/// Render and write one artifact, returning the written byte count
pub(crate) async fn try_generate(
    format: ReportFormat,
    model: &ReportModel,
    output_path: &Path,
) -> Result<u64, GenerationError> {
    let content = generator_for(format).render(model)?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        // create_dir_all treats a concurrently created directory as success
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| GenerationError::io(format.name(), parent, &e))?;
    }

    tokio::fs::write(output_path, content.as_bytes())
        .await
        .map_err(|e| GenerationError::io(format.name(), output_path, &e))?;

    Ok(content.len() as u64)
}
