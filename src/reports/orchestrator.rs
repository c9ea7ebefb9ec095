//! Report orchestration
//!
//! Runs one generator per requested format and merges their results. Every
//! format settles on its own: a failing or slow generator never cancels the
//! others, and only the optional overall timeout cancels work that is still
//! running.

use super::{
    GenerationError, GenerationResult, ProgressCallback, ProgressStage, ProgressUpdate,
    ReportFormat, ReportGenerationOptions, ReportModel, ReportResult, RequestedFormat, RetryPolicy,
    try_generate,
};
use std::collections::HashSet;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;

type JobFuture = Pin<Box<dyn Future<Output = ReportResult> + Send>>;

/// One unit of scheduled work; `index` is its slot in the final result list
struct Job {
    index: usize,
    label: String,
    future: JobFuture,
}

/// High-level report orchestrator - main entry point for report generation
pub struct ReportOrchestrator;

impl ReportOrchestrator {
    /// Generate every requested format and merge the per-format results
    pub async fn generate_reports(
        model: &ReportModel,
        options: &ReportGenerationOptions,
    ) -> GenerationResult {
        let started = Instant::now();

        if options.formats.is_empty() {
            let error = GenerationError::validation(
                "formats",
                "no report format requested: at least one format must be listed",
            );
            tracing::warn!("{error}");
            return GenerationResult::rejected(error, started.elapsed());
        }

        let model = Arc::new(if options.title.trim().is_empty() {
            model.clone()
        } else {
            ReportModel {
                title: options.title.clone(),
                ..model.clone()
            }
        });

        let requested = dedupe(&options.formats);
        let mut slots: Vec<Option<ReportResult>> = vec![None; requested.len()];
        let mut paths: Vec<Option<PathBuf>> = vec![None; requested.len()];
        let mut progress = ProgressTracker::new(options.progress.clone(), requested.len());
        progress.emit(ProgressStage::Started, None);

        let mut jobs = Vec::new();
        for (index, format) in requested.iter().enumerate() {
            match format {
                RequestedFormat::Known(format) => {
                    let path = format.output_path(&options.output_dir, &options.base_filename);
                    paths[index] = Some(path.clone());
                    jobs.push(Job {
                        index,
                        label: format.name().to_string(),
                        future: generation_job(*format, Arc::clone(&model), path, options.retry),
                    });
                }
                RequestedFormat::Unsupported(name) => {
                    let result = ReportResult::failed(name, None, GenerationError::unsupported(name), 0);
                    progress.settle(&result);
                    slots[index] = Some(result);
                }
            }
        }

        let deadline = options.timeout.map(|timeout| started + timeout);
        let timed_out = settle_jobs(jobs, options.parallel, deadline, &mut progress, &mut slots).await;

        let reports: Vec<ReportResult> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    let name = requested[index].name();
                    let error = match options.timeout {
                        Some(timeout) if timed_out => GenerationError::timeout(name, timeout),
                        _ => GenerationError::render(name, "generator task ended without a result"),
                    };
                    ReportResult::failed(name, paths[index].take(), error, 0)
                })
            })
            .collect();

        for report in &reports {
            log_report(report, options.verbose_errors);
        }

        progress.complete();
        let result = GenerationResult::from_reports(reports, started.elapsed());
        tracing::debug!(
            "Report generation finished in {}ms: {:?}",
            result.duration,
            result.outcome()
        );
        result
    }
}

/// Drop repeated formats, keeping the first occurrence
fn dedupe(formats: &[RequestedFormat]) -> Vec<RequestedFormat> {
    let mut seen = HashSet::new();
    formats
        .iter()
        .filter(|format| {
            let fresh = seen.insert(format.name().to_string());
            if !fresh {
                tracing::debug!("Ignoring duplicate report format `{}`", format.name());
            }
            fresh
        })
        .cloned()
        .collect()
}

fn generation_job(
    format: ReportFormat,
    model: Arc<ReportModel>,
    path: PathBuf,
    retry: RetryPolicy,
) -> JobFuture {
    Box::pin(async move {
        let (result, attempts) = retry
            .run(format.name(), || try_generate(format, &model, &path))
            .await;
        match result {
            Ok(size) => ReportResult::succeeded(format, path, size, attempts),
            Err(e) => ReportResult::failed(format.name(), Some(path), e, attempts),
        }
    })
}

fn log_report(report: &ReportResult, verbose: bool) {
    match (&report.error, &report.path) {
        (None, Some(path)) => {
            tracing::info!("Generated {} report: {} ({} bytes)", report.format, path.display(), report.size)
        }
        (Some(error), _) if verbose => tracing::warn!(
            format = %report.format,
            kind = %error.kind,
            transient = error.transient,
            attempts = report.attempts,
            "Report generation failed: {}",
            error.message
        ),
        (Some(error), _) => tracing::warn!("{} report failed ({})", report.format, error.kind),
        (None, None) => {}
    }
}

/// Run jobs to completion (or the deadline), filling `slots`.
/// Returns true if the deadline cut any job short.
async fn settle_jobs(
    jobs: Vec<Job>,
    parallel: bool,
    deadline: Option<Instant>,
    progress: &mut ProgressTracker,
    slots: &mut [Option<ReportResult>],
) -> bool {
    if parallel {
        settle_parallel(jobs, deadline, progress, slots).await
    } else {
        settle_sequential(jobs, deadline, progress, slots).await
    }
}

async fn settle_parallel(
    jobs: Vec<Job>,
    deadline: Option<Instant>,
    progress: &mut ProgressTracker,
    slots: &mut [Option<ReportResult>],
) -> bool {
    let mut set = JoinSet::new();
    for job in jobs {
        progress.emit(ProgressStage::FormatStarted, Some(&job.label));
        let Job { index, future, .. } = job;
        set.spawn(async move { (index, future.await) });
    }

    let mut timed_out = false;
    loop {
        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(next) => next,
                Err(_) => {
                    timed_out = true;
                    set.abort_all();
                    break;
                }
            },
            None => set.join_next().await,
        };

        match next {
            Some(Ok((index, result))) => {
                progress.settle(&result);
                slots[index] = Some(result);
            }
            Some(Err(e)) => tracing::warn!("Report task did not complete: {e}"),
            None => break,
        }
    }

    if timed_out {
        // Tasks that finished before the abort landed keep their results
        while let Some(joined) = set.join_next().await {
            if let Ok((index, result)) = joined {
                progress.settle(&result);
                slots[index] = Some(result);
            }
        }
    }
    timed_out
}

async fn settle_sequential(
    jobs: Vec<Job>,
    deadline: Option<Instant>,
    progress: &mut ProgressTracker,
    slots: &mut [Option<ReportResult>],
) -> bool {
    for job in jobs {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return true;
        }

        progress.emit(ProgressStage::FormatStarted, Some(&job.label));
        // Each job runs in its own task so a panicking generator fails only its slot
        let mut handle = tokio::spawn(job.future);
        let joined = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    return true;
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(result) => {
                progress.settle(&result);
                slots[job.index] = Some(result);
            }
            Err(e) => tracing::warn!("{} report task did not complete: {e}", job.label),
        }
    }
    false
}

/// Emits monotonically non-decreasing progress updates. All updates are sent
/// from the orchestrating task, never from generator tasks.
struct ProgressTracker {
    callback: Option<ProgressCallback>,
    total: usize,
    settled: usize,
}

impl ProgressTracker {
    fn new(callback: Option<ProgressCallback>, total: usize) -> Self {
        Self {
            callback,
            total,
            settled: 0,
        }
    }

    fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.settled.min(self.total) as f64 / self.total as f64 * 100.0
        }
    }

    fn emit(&self, stage: ProgressStage, format: Option<&str>) {
        let Some(callback) = &self.callback else {
            return;
        };

        let update = ProgressUpdate {
            percentage: self.percentage(),
            stage,
            format: format.map(str::to_string),
        };
        if catch_unwind(AssertUnwindSafe(|| callback(&update))).is_err() {
            tracing::debug!("Progress callback panicked; ignoring");
        }
    }

    fn settle(&mut self, result: &ReportResult) {
        self.settled += 1;
        self.emit(ProgressStage::FormatFinished, Some(&result.format));
    }

    fn complete(&mut self) {
        self.settled = self.total;
        self.emit(ProgressStage::Completed, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::test_support::sample_model;
    use crate::reports::{GenerationErrorKind, GenerationOutcome};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    fn options(dir: &TempDir, formats: &[&str]) -> ReportGenerationOptions {
        ReportGenerationOptions {
            formats: formats.iter().map(|f| RequestedFormat::from(*f)).collect(),
            output_dir: dir.path().to_path_buf(),
            base_filename: "report".to_string(),
            retry: RetryPolicy::none(),
            ..ReportGenerationOptions::default()
        }
    }

    fn instant_job(index: usize, format: ReportFormat) -> Job {
        Job {
            index,
            label: format.name().to_string(),
            future: Box::pin(async move {
                ReportResult::succeeded(format, PathBuf::from(format.extension()), 1, 1)
            }),
        }
    }

    fn slow_job(index: usize, format: ReportFormat) -> Job {
        Job {
            index,
            label: format.name().to_string(),
            future: Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                ReportResult::succeeded(format, PathBuf::from(format.extension()), 1, 1)
            }),
        }
    }

    #[tokio::test]
    async fn test_empty_formats_rejected() {
        let dir = TempDir::new().unwrap();
        let result = ReportOrchestrator::generate_reports(&sample_model(), &options(&dir, &[])).await;

        assert!(!result.success);
        assert!(result.reports.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].to_string().contains("format"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_all_formats_in_parallel() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir, &["json", "markdown", "html"]);
        let result = ReportOrchestrator::generate_reports(&sample_model(), &opts).await;

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.outcome(), GenerationOutcome::Success);
        for ext in ["json", "md", "html"] {
            let path = dir.path().join(format!("report.{ext}"));
            assert!(std::fs::metadata(&path).unwrap().len() > 0);
        }
        let formats: Vec<_> = result.reports.iter().map(|r| r.format.as_str()).collect();
        assert_eq!(formats, vec!["json", "markdown", "html"]);
    }

    #[tokio::test]
    async fn test_failing_format_is_isolated() {
        let dir = TempDir::new().unwrap();
        // A directory squatting on the html path makes that write fail
        std::fs::create_dir(dir.path().join("report.html")).unwrap();

        for parallel in [true, false] {
            let opts = ReportGenerationOptions {
                parallel,
                ..options(&dir, &["json", "html"])
            };
            let result = ReportOrchestrator::generate_reports(&sample_model(), &opts).await;

            assert!(!result.success);
            assert_eq!(result.outcome(), GenerationOutcome::Partial);
            assert_eq!(result.successful().count(), 1);
            assert_eq!(result.successful().next().unwrap().format, "json");
            assert_eq!(result.errors.len(), 1);
            assert_eq!(result.errors[0].format, "html");
        }
    }

    #[tokio::test]
    async fn test_unsupported_format_fails_only_its_entry() {
        let dir = TempDir::new().unwrap();
        let result =
            ReportOrchestrator::generate_reports(&sample_model(), &options(&dir, &["pdf", "json"])).await;

        assert_eq!(result.outcome(), GenerationOutcome::Partial);
        assert_eq!(result.reports[0].format, "pdf");
        assert_eq!(
            result.reports[0].error.as_ref().unwrap().kind,
            GenerationErrorKind::UnsupportedFormat
        );
        assert!(result.reports[1].success);
    }

    #[tokio::test]
    async fn test_title_override_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let opts = ReportGenerationOptions {
            title: "Nightly".to_string(),
            ..options(&dir, &["markdown", "md"])
        };
        let result = ReportOrchestrator::generate_reports(&sample_model(), &opts).await;

        assert_eq!(result.reports.len(), 1);
        let md = std::fs::read_to_string(dir.path().join("report.md")).unwrap();
        assert!(md.starts_with("# Nightly\n"));
    }

    #[tokio::test]
    async fn test_zero_timeout_fails_everything_with_timeout() {
        let dir = TempDir::new().unwrap();
        let opts = ReportGenerationOptions {
            parallel: false,
            timeout: Some(Duration::ZERO),
            ..options(&dir, &["json", "html"])
        };
        let result = ReportOrchestrator::generate_reports(&sample_model(), &opts).await;

        assert_eq!(result.outcome(), GenerationOutcome::Failed);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().all(|e| e.kind == GenerationErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_partial_timeout_keeps_finished_results() {
        for parallel in [true, false] {
            let jobs = vec![instant_job(0, ReportFormat::Json), slow_job(1, ReportFormat::Html)];
            let mut slots = vec![None, None];
            let mut progress = ProgressTracker::new(None, 2);
            let deadline = Instant::now() + Duration::from_millis(100);

            let timed_out = settle_jobs(jobs, parallel, Some(deadline), &mut progress, &mut slots).await;

            assert!(timed_out);
            assert!(slots[0].as_ref().is_some_and(|r| r.success));
            assert!(slots[1].is_none());
        }
    }

    #[tokio::test]
    async fn test_sequential_runs_in_request_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let jobs = ["json", "markdown", "html"]
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                let order = Arc::clone(&order);
                Job {
                    index,
                    label: name.to_string(),
                    future: Box::pin(async move {
                        tokio::time::sleep(Duration::from_millis(5 * (3 - index as u64))).await;
                        order.lock().unwrap().push(name);
                        ReportResult::failed(name, None, GenerationError::render(name, "boom"), 1)
                    }),
                }
            })
            .collect();

        let mut slots = vec![None, None, None];
        let mut progress = ProgressTracker::new(None, 3);
        assert!(!settle_jobs(jobs, false, None, &mut progress, &mut slots).await);

        // Failures do not stop the remaining formats
        assert_eq!(*order.lock().unwrap(), vec!["json", "markdown", "html"]);
        assert!(slots.iter().all(Option::is_some));
    }

    async fn broken_generator() -> ReportResult {
        panic!("generator bug")
    }

    #[tokio::test]
    async fn test_panicking_generator_fails_only_its_slot() {
        for parallel in [true, false] {
            let jobs = vec![
                Job {
                    index: 0,
                    label: "json".to_string(),
                    future: Box::pin(broken_generator()),
                },
                instant_job(1, ReportFormat::Markdown),
            ];
            let mut slots = vec![None, None];
            let mut progress = ProgressTracker::new(None, 2);

            assert!(!settle_jobs(jobs, parallel, None, &mut progress, &mut slots).await);
            assert!(slots[0].is_none());
            assert!(slots[1].as_ref().is_some_and(|r| r.success));
        }
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_panics_are_ignored() {
        let dir = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let opts = ReportGenerationOptions {
            progress: Some(Arc::new(move |update: &ProgressUpdate| {
                sink.lock().unwrap().push((update.percentage, update.stage));
                if update.stage == ProgressStage::FormatStarted {
                    panic!("callback failure");
                }
            })),
            ..options(&dir, &["json", "markdown", "html"])
        };

        let result = ReportOrchestrator::generate_reports(&sample_model(), &opts).await;
        assert!(result.success);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.first().unwrap(), &(0.0, ProgressStage::Started));
        assert_eq!(seen.last().unwrap(), &(100.0, ProgressStage::Completed));
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
        let finished = seen.iter().filter(|(_, s)| *s == ProgressStage::FormatFinished).count();
        assert_eq!(finished, 3);
    }
}
