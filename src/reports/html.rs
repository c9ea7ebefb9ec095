//! HTML report generator - human-friendly, styled single page

use super::utils::{format_duration_ms, format_percent, html_escape, or_na};
use super::{GenerationError, ReportFormat, ReportGenerator, ReportModel};
use crate::model::{CoverageCounter, CoverageThreshold, TestMetrics};

/// HTML report generator - styled document
pub struct HtmlReportGenerator;

impl ReportGenerator for HtmlReportGenerator {
    fn format(&self) -> ReportFormat {
        ReportFormat::Html
    }

    fn render(&self, model: &ReportModel) -> Result<String, GenerationError> {
        Ok(render_html(model))
    }
}

fn render_html(model: &ReportModel) -> String {
    let metrics = &model.metrics;
    let summary = &metrics.summary;
    let meta = &model.build_metadata;
    let title = html_escape(or_na(&model.title));
    let status_class = if metrics.has_failures() { "failing" } else { "passing" };

    let ci = match meta.ci_info.provider {
        Some(provider) if meta.ci_info.is_ci => format!(
            "{} (build {})",
            provider.display_name(),
            html_escape(meta.ci_info.build_number.as_deref().unwrap_or("N/A"))
        ),
        _ => "Local build".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 0; padding: 20px; background: #f5f5f5; }}
        .container {{ max-width: 1200px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }}
        .header {{ border-bottom: 3px solid #27ae60; padding-bottom: 20px; margin-bottom: 30px; }}
        .header.failing {{ border-bottom-color: #e74c3c; }}
        .stats-grid {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 15px; margin: 20px 0; }}
        .stat-card {{ background: #f8f9fa; padding: 15px; border-radius: 6px; text-align: center; }}
        .stat-number {{ font-size: 2em; font-weight: bold; color: #34495e; }}
        .stat-number.bad {{ color: #e74c3c; }}
        .stat-number.good {{ color: #27ae60; }}
        .section {{ margin: 30px 0; }}
        .section h2 {{ background: #34495e; color: white; padding: 12px 15px; border-radius: 4px 4px 0 0; margin: 0; font-size: 1.1em; }}
        table {{ width: 100%; border-collapse: collapse; margin: 0; }}
        th, td {{ padding: 10px 12px; text-align: left; border-bottom: 1px solid #ddd; }}
        th {{ background: #ecf0f1; font-weight: 600; }}
        tr:hover {{ background: #f8f9fa; }}
        .bar {{ background: #ecf0f1; border-radius: 4px; height: 10px; width: 160px; display: inline-block; vertical-align: middle; }}
        .bar span {{ display: block; height: 100%; border-radius: 4px; background: #27ae60; }}
        .bar span.low {{ background: #e67e22; }}
        .file-path {{ font-family: monospace; color: #2980b9; word-break: break-all; }}
        .failure-msg {{ color: #c0392b; font-family: monospace; white-space: pre-wrap; }}
        .meta dt {{ font-weight: 600; float: left; width: 140px; clear: left; }}
        .meta dd {{ margin: 0 0 6px 150px; }}
        .empty {{ color: #7f8c8d; padding: 12px; font-style: italic; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header {status_class}">
            <h1>{title}</h1>
            <p>Generated on {timestamp}</p>
        </div>

        <div class="stats-grid">
            <div class="stat-card"><div class="stat-number">{total}</div><div>Total Tests</div></div>
            <div class="stat-card"><div class="stat-number good">{passed}</div><div>Passed</div></div>
            <div class="stat-card"><div class="stat-number{failed_class}">{failed}</div><div>Failed</div></div>
            <div class="stat-card"><div class="stat-number">{skipped}</div><div>Skipped</div></div>
            <div class="stat-card"><div class="stat-number">{pass_rate}</div><div>Pass Rate</div></div>
            <div class="stat-card"><div class="stat-number">{duration}</div><div>Duration</div></div>
        </div>
{coverage}{categories}{failures}{slowest}
        <div class="section">
            <h2>Build</h2>
            <dl class="meta">
                <dt>Environment</dt><dd>{environment}</dd>
                <dt>Branch</dt><dd>{branch}</dd>
                <dt>Commit</dt><dd>{commit}{dirty}</dd>
                <dt>Message</dt><dd>{message}</dd>
                <dt>Author</dt><dd>{author}</dd>
                <dt>Platform</dt><dd>{platform} / {arch}</dd>
                <dt>CI</dt><dd>{ci}</dd>
                <dt>Generator</dt><dd>{runtime}</dd>
            </dl>
        </div>
    </div>
</body>
</html>
"#,
        timestamp = meta.timestamp_string(),
        total = summary.total_tests,
        passed = summary.passed_tests,
        failed = summary.failed_tests,
        failed_class = if summary.failed_tests > 0 { " bad" } else { "" },
        skipped = summary.skipped_tests,
        pass_rate = format_percent(summary.pass_rate),
        duration = format_duration_ms(summary.execution_time),
        coverage = coverage_section(metrics),
        categories = categories_section(metrics),
        failures = failures_section(metrics),
        slowest = slowest_section(metrics),
        environment = html_escape(or_na(&meta.environment)),
        branch = html_escape(or_na(&meta.git_info.branch)),
        commit = html_escape(or_na(meta.git_info.short_commit())),
        dirty = if meta.git_info.is_dirty { " (dirty)" } else { "" },
        message = html_escape(or_na(&meta.git_info.commit_message)),
        author = html_escape(or_na(&meta.git_info.author)),
        platform = html_escape(&meta.platform),
        arch = html_escape(&meta.architecture),
        runtime = html_escape(&meta.node_version),
    )
}

fn coverage_bar(counter: &CoverageCounter, minimum: f64) -> String {
    let width = counter.percentage.clamp(0.0, 100.0);
    let class = if counter.percentage >= minimum { "" } else { " class=\"low\"" };
    format!(r#"<div class="bar"><span{class} style="width: {width:.1}%"></span></div>"#)
}

fn coverage_section(metrics: &TestMetrics) -> String {
    let coverage = &metrics.coverage;
    let threshold: &CoverageThreshold = &coverage.threshold;
    let mut rows = String::new();

    for ((name, counter), (_, minimum)) in coverage
        .overall
        .dimensions()
        .into_iter()
        .zip(threshold.dimensions())
    {
        rows.push_str(&format!(
            "                <tr><td>{name}</td><td>{}/{}</td><td>{} {}</td><td>{}</td></tr>\n",
            counter.covered,
            counter.total,
            format_percent(counter.percentage),
            coverage_bar(counter, minimum),
            format_percent(minimum)
        ));
    }

    format!(
        r#"
        <div class="section">
            <h2>Coverage</h2>
            <table>
                <thead><tr><th>Dimension</th><th>Covered</th><th>Coverage</th><th>Threshold</th></tr></thead>
                <tbody>
{rows}                </tbody>
            </table>
        </div>
"#
    )
}

fn categories_section(metrics: &TestMetrics) -> String {
    if metrics.by_category.is_empty() {
        return String::new();
    }

    let rows: String = metrics
        .by_category
        .iter()
        .map(|(category, m)| {
            format!(
                "                <tr><td>{category}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                m.suites,
                m.total,
                m.passed,
                m.failed,
                format_percent(m.pass_rate),
                format_duration_ms(m.execution_time)
            )
        })
        .collect();

    format!(
        r#"
        <div class="section">
            <h2>Categories</h2>
            <table>
                <thead><tr><th>Category</th><th>Suites</th><th>Tests</th><th>Passed</th><th>Failed</th><th>Pass Rate</th><th>Duration</th></tr></thead>
                <tbody>
{rows}                </tbody>
            </table>
        </div>
"#
    )
}

fn failures_section(metrics: &TestMetrics) -> String {
    if metrics.failed_tests.is_empty() {
        return String::new();
    }

    let rows: String = metrics
        .failed_tests
        .iter()
        .map(|failed| {
            format!(
                "                <tr><td>{}</td><td>{}</td><td class=\"file-path\">{}</td><td class=\"failure-msg\">{}</td></tr>\n",
                html_escape(or_na(&failed.suite)),
                html_escape(or_na(&failed.name)),
                html_escape(or_na(&failed.file_path)),
                html_escape(&failed.failure_messages.join("\n"))
            )
        })
        .collect();

    format!(
        r#"
        <div class="section">
            <h2>Failed Tests ({count})</h2>
            <table>
                <thead><tr><th>Suite</th><th>Test</th><th>File</th><th>Message</th></tr></thead>
                <tbody>
{rows}                </tbody>
            </table>
        </div>
"#,
        count = metrics.failed_tests.len()
    )
}

fn slowest_section(metrics: &TestMetrics) -> String {
    let rows: String = metrics
        .slowest_tests
        .iter()
        .map(|slow| {
            format!(
                "                <tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                html_escape(or_na(&slow.suite)),
                html_escape(or_na(&slow.name)),
                format_duration_ms(slow.duration)
            )
        })
        .collect();

    let body = if rows.is_empty() {
        r#"            <p class="empty">No timed tests recorded.</p>
"#
        .to_string()
    } else {
        format!(
            r#"            <table>
                <thead><tr><th>Suite</th><th>Test</th><th>Duration</th></tr></thead>
                <tbody>
{rows}                </tbody>
            </table>
"#
        )
    };

    format!(
        r#"
        <div class="section">
            <h2>Slowest Tests</h2>
{body}        </div>
"#
    )
}
