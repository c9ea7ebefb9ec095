//! Markdown report generator
//!
//! Suitable for PR comments and CI job summaries.

use super::utils::{format_duration_ms, format_percent, markdown_cell, or_na};
use super::{GenerationError, ReportFormat, ReportGenerator, ReportModel};
use crate::model::CoverageSummary;
use std::fmt::Write;

/// Markdown report generator - formatted document
pub struct MarkdownReportGenerator;

impl ReportGenerator for MarkdownReportGenerator {
    fn format(&self) -> ReportFormat {
        ReportFormat::Markdown
    }

    fn render(&self, model: &ReportModel) -> Result<String, GenerationError> {
        render_markdown(model)
            .map_err(|e| GenerationError::render(self.format().name(), e.to_string()))
    }
}

fn render_markdown(model: &ReportModel) -> Result<String, std::fmt::Error> {
    let mut md = String::new();
    let summary = &model.metrics.summary;
    let meta = &model.build_metadata;

    let status = if model.metrics.has_failures() { "❌ Failing" } else { "✅ Passing" };
    writeln!(md, "# {}\n", markdown_cell(or_na(&model.title)))?;
    writeln!(md, "**Status:** {status}  ")?;
    writeln!(md, "**Generated:** {}\n", meta.timestamp_string())?;

    writeln!(md, "## Summary\n")?;
    writeln!(md, "| Total | Passed | Failed | Skipped | Todo | Pass Rate | Duration |")?;
    writeln!(md, "|------:|-------:|-------:|--------:|-----:|----------:|---------:|")?;
    writeln!(
        md,
        "| {} | {} | {} | {} | {} | {} | {} |\n",
        summary.total_tests,
        summary.passed_tests,
        summary.failed_tests,
        summary.skipped_tests,
        summary.todo_tests,
        format_percent(summary.pass_rate),
        format_duration_ms(summary.execution_time)
    )?;
    writeln!(
        md,
        "Suites: {} total, {} passed, {} failed\n",
        summary.total_suites, summary.passed_suites, summary.failed_suites
    )?;

    if !model.metrics.by_category.is_empty() {
        writeln!(md, "## Categories\n")?;
        writeln!(md, "| Category | Suites | Tests | Passed | Failed | Pass Rate |")?;
        writeln!(md, "|----------|-------:|------:|-------:|-------:|----------:|")?;
        for (category, metrics) in &model.metrics.by_category {
            writeln!(
                md,
                "| {} | {} | {} | {} | {} | {} |",
                category,
                metrics.suites,
                metrics.total,
                metrics.passed,
                metrics.failed,
                format_percent(metrics.pass_rate)
            )?;
        }
        md.push('\n');
    }

    writeln!(md, "## Coverage\n")?;
    write_coverage_table(&mut md, &model.metrics.coverage.overall, model)?;

    if !model.metrics.failed_tests.is_empty() {
        writeln!(md, "## Failed Tests\n")?;
        for failed in &model.metrics.failed_tests {
            writeln!(
                md,
                "- **{}** › {} (`{}`)",
                markdown_cell(or_na(&failed.suite)),
                markdown_cell(or_na(&failed.name)),
                or_na(&failed.file_path)
            )?;
            if let Some(message) = failed.failure_messages.first() {
                let first_line = message.lines().next().unwrap_or_default();
                writeln!(md, "  > {}", markdown_cell(first_line))?;
            }
        }
        md.push('\n');
    }

    if !model.metrics.slowest_tests.is_empty() {
        writeln!(md, "## Slowest Tests\n")?;
        writeln!(md, "| # | Suite | Test | Duration |")?;
        writeln!(md, "|--:|-------|------|---------:|")?;
        for (rank, slow) in model.metrics.slowest_tests.iter().enumerate() {
            writeln!(
                md,
                "| {} | {} | {} | {} |",
                rank + 1,
                markdown_cell(or_na(&slow.suite)),
                markdown_cell(or_na(&slow.name)),
                format_duration_ms(slow.duration)
            )?;
        }
        md.push('\n');
    }

    writeln!(md, "## Build\n")?;
    let git = &meta.git_info;
    writeln!(md, "- **Environment:** {}", or_na(&meta.environment))?;
    writeln!(md, "- **Branch:** `{}`", or_na(&git.branch))?;
    writeln!(
        md,
        "- **Commit:** `{}`{}",
        or_na(git.short_commit()),
        if git.is_dirty { " (dirty)" } else { "" }
    )?;
    writeln!(md, "- **Author:** {}", or_na(&git.author))?;
    writeln!(md, "- **Platform:** {} / {}", meta.platform, meta.architecture)?;
    match meta.ci_info.provider {
        Some(provider) if meta.ci_info.is_ci => writeln!(
            md,
            "- **CI:** {} (build {})",
            provider.display_name(),
            meta.ci_info.build_number.as_deref().unwrap_or("N/A")
        )?,
        _ => writeln!(md, "- **CI:** no")?,
    }

    writeln!(md, "\n---\n*{}*", meta.node_version)?;
    Ok(md)
}

fn write_coverage_table(
    md: &mut String,
    overall: &CoverageSummary,
    model: &ReportModel,
) -> std::fmt::Result {
    let threshold = &model.metrics.coverage.threshold;
    writeln!(md, "| Dimension | Covered | Total | Coverage | Threshold |")?;
    writeln!(md, "|-----------|--------:|------:|---------:|----------:|")?;
    for ((name, counter), (_, minimum)) in overall.dimensions().into_iter().zip(threshold.dimensions()) {
        let marker = if counter.percentage >= minimum { "✅" } else { "⚠️" };
        writeln!(
            md,
            "| {name} | {} | {} | {} {marker} | {} |",
            counter.covered,
            counter.total,
            format_percent(counter.percentage),
            format_percent(minimum)
        )?;
    }
    md.push('\n');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::test_support::sample_model;

    #[test]
    fn test_renders_sections() {
        let md = MarkdownReportGenerator.render(&sample_model()).unwrap();
        assert!(md.starts_with("# Sample Report\n"));
        assert!(md.contains("❌ Failing"));
        assert!(md.contains("| 3 | 2 | 1 | 0 | 0 | 66.7% |"));
        assert!(md.contains("## Failed Tests"));
        assert!(md.contains("pays & confirms"));
        assert!(md.contains("> expected <200> got 500"));
        assert!(md.contains("| lines | 0 | 0 | 0.0% ⚠️ | 80.0% |"));
        assert!(md.contains("- **CI:** no"));
    }

    #[test]
    fn test_empty_model_degrades_gracefully() {
        let mut model = sample_model();
        model.title.clear();
        model.metrics = Default::default();
        model.suites.clear();

        let md = MarkdownReportGenerator.render(&model).unwrap();
        assert!(md.starts_with("# N/A\n"));
        assert!(md.contains("✅ Passing"));
        assert!(!md.contains("## Failed Tests"));
        assert!(!md.contains("## Slowest Tests"));
    }
}
