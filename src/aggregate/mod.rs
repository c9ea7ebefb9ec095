//! Test result aggregation
//!
//! Turns raw [`SuiteResult`]s and optional coverage into [`TestMetrics`]. This
//! is a pure transformation: the same inputs always give the same metrics, and
//! a single malformed suite only contributes its (defaulted) fields instead of
//! failing the whole aggregation.

use crate::model::{
    CategoryMetrics, CoverageInput, CoverageMetrics, CoverageSummary, CoverageThreshold,
    FailedTest, SlowTest, SuiteResult, TestCategory, TestMetrics, TestStatus, TestSummary,
    ThresholdStatus, coverage::percentage,
};
use std::collections::BTreeMap;

/// Default length of the slowest-tests ranking
pub const DEFAULT_MAX_SLOWEST: usize = 10;
/// Default length of the failed-tests list
pub const DEFAULT_MAX_FAILED: usize = 50;

/// Aggregation settings
#[derive(Debug, Clone)]
pub struct Aggregator {
    pub max_slowest: usize,
    pub max_failed: usize,
    pub threshold: CoverageThreshold,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            max_slowest: DEFAULT_MAX_SLOWEST,
            max_failed: DEFAULT_MAX_FAILED,
            threshold: CoverageThreshold::default(),
        }
    }
}

impl Aggregator {
    pub fn new(max_slowest: usize, max_failed: usize, threshold: CoverageThreshold) -> Self {
        Self {
            max_slowest,
            max_failed,
            threshold,
        }
    }

    /// Aggregate suites and coverage into fresh metrics
    pub fn aggregate(&self, suites: &[SuiteResult], coverage: Option<&CoverageInput>) -> TestMetrics {
        let metrics = TestMetrics {
            summary: summarize(suites),
            by_category: category_breakdown(suites),
            coverage: self.coverage_metrics(coverage),
            slowest_tests: self.slowest_tests(suites),
            failed_tests: self.failed_tests(suites),
        };

        tracing::debug!(
            "Aggregated {} suites: {} tests, {:.1}% passing",
            suites.len(),
            metrics.summary.total_tests,
            metrics.summary.pass_rate
        );
        metrics
    }

    fn coverage_metrics(&self, coverage: Option<&CoverageInput>) -> CoverageMetrics {
        let Some(input) = coverage else {
            return CoverageMetrics {
                threshold: self.threshold,
                meets_threshold: ThresholdStatus::evaluate(&CoverageSummary::default(), &self.threshold),
                ..CoverageMetrics::default()
            };
        };

        let overall = input.overall.normalized();
        let by_file: BTreeMap<String, CoverageSummary> = input
            .by_file
            .iter()
            .map(|(path, summary)| (path.clone(), summary.normalized()))
            .collect();

        let mut by_category: BTreeMap<TestCategory, CoverageSummary> = BTreeMap::new();
        for (path, summary) in &by_file {
            let entry = by_category.entry(TestCategory::infer(path)).or_default();
            *entry = entry.add(summary);
        }

        CoverageMetrics {
            meets_threshold: ThresholdStatus::evaluate(&overall, &self.threshold),
            overall,
            by_file,
            by_category,
            threshold: self.threshold,
        }
    }

    fn slowest_tests(&self, suites: &[SuiteResult]) -> Vec<SlowTest> {
        let mut all: Vec<SlowTest> = suites
            .iter()
            .flat_map(|suite| {
                suite.tests.iter().map(move |test| SlowTest {
                    suite: suite.name.clone(),
                    name: test.name.clone(),
                    duration: test.duration,
                })
            })
            .collect();

        all.sort_by(|a, b| {
            b.duration
                .cmp(&a.duration)
                .then_with(|| a.suite.cmp(&b.suite))
                .then_with(|| a.name.cmp(&b.name))
        });
        all.truncate(self.max_slowest);
        all
    }

    fn failed_tests(&self, suites: &[SuiteResult]) -> Vec<FailedTest> {
        suites
            .iter()
            .flat_map(|suite| {
                suite
                    .tests
                    .iter()
                    .filter(|test| test.status == TestStatus::Failed)
                    .map(move |test| FailedTest {
                        suite: suite.name.clone(),
                        file_path: suite.file_path.clone(),
                        name: test.name.clone(),
                        failure_messages: test.failure_messages.clone(),
                    })
            })
            .take(self.max_failed)
            .collect()
    }
}

fn summarize(suites: &[SuiteResult]) -> TestSummary {
    let mut summary = TestSummary {
        total_suites: suites.len() as u64,
        ..TestSummary::default()
    };

    for suite in suites {
        let counts = suite.counts();
        summary.passed_tests = summary.passed_tests.saturating_add(counts.passed);
        summary.failed_tests = summary.failed_tests.saturating_add(counts.failed);
        summary.skipped_tests = summary.skipped_tests.saturating_add(counts.skipped);
        summary.todo_tests = summary.todo_tests.saturating_add(counts.todo);
        summary.execution_time = summary.execution_time.saturating_add(suite.effective_duration());

        if suite.has_failures() {
            summary.failed_suites += 1;
        } else {
            summary.passed_suites += 1;
        }
    }

    summary.total_tests = summary
        .passed_tests
        .saturating_add(summary.failed_tests)
        .saturating_add(summary.skipped_tests)
        .saturating_add(summary.todo_tests);
    summary.pass_rate = percentage(summary.passed_tests, summary.total_tests);
    summary
}

fn category_breakdown(suites: &[SuiteResult]) -> BTreeMap<TestCategory, CategoryMetrics> {
    let mut breakdown: BTreeMap<TestCategory, CategoryMetrics> = BTreeMap::new();

    for suite in suites {
        let counts = suite.counts();
        let entry = breakdown.entry(suite.effective_category()).or_default();
        entry.suites += 1;
        entry.passed = entry.passed.saturating_add(counts.passed);
        entry.failed = entry.failed.saturating_add(counts.failed);
        entry.skipped = entry.skipped.saturating_add(counts.skipped);
        entry.todo = entry.todo.saturating_add(counts.todo);
        entry.total = entry.total.saturating_add(counts.total());
        entry.execution_time = entry.execution_time.saturating_add(suite.effective_duration());
    }

    for entry in breakdown.values_mut() {
        entry.pass_rate = percentage(entry.passed, entry.total);
    }
    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoverageCounter, TestOutcome};

    fn test(name: &str, status: TestStatus, duration: u64) -> TestOutcome {
        TestOutcome {
            name: name.to_string(),
            status,
            duration,
            failure_messages: if status == TestStatus::Failed {
                vec![format!("{name} failed")]
            } else {
                Vec::new()
            },
        }
    }

    fn suite(name: &str, path: &str, tests: Vec<TestOutcome>) -> SuiteResult {
        let mut suite = SuiteResult {
            name: name.to_string(),
            file_path: path.to_string(),
            duration: tests.iter().map(|t| t.duration).sum(),
            tests,
            ..Default::default()
        };
        let counts = suite.counts();
        suite.num_passing_tests = counts.passed;
        suite.num_failing_tests = counts.failed;
        suite.num_pending_tests = counts.skipped;
        suite.num_todo_tests = counts.todo;
        suite
    }

    #[test]
    fn test_empty_input_has_zero_pass_rate() {
        let metrics = Aggregator::default().aggregate(&[], None);
        assert_eq!(metrics.summary.total_tests, 0);
        assert_eq!(metrics.summary.pass_rate, 0.0);
        assert!(metrics.summary.pass_rate.is_finite());
        assert_eq!(metrics.coverage.overall.lines.percentage, 0.0);
        assert!(metrics.slowest_tests.is_empty());
    }

    #[test]
    fn test_summary_counts_and_pass_rate() {
        let suites = vec![
            suite("a", "src/a.test.ts", vec![
                test("a1", TestStatus::Passed, 5),
                test("a2", TestStatus::Failed, 7),
            ]),
            suite("b", "src/b.test.ts", vec![
                test("b1", TestStatus::Passed, 3),
                test("b2", TestStatus::Pending, 0),
                test("b3", TestStatus::Todo, 0),
            ]),
        ];

        let summary = Aggregator::default().aggregate(&suites, None).summary;
        assert_eq!(summary.total_tests, 5);
        assert_eq!(summary.passed_tests, 2);
        assert_eq!(summary.failed_tests, 1);
        assert_eq!(summary.skipped_tests, 1);
        assert_eq!(summary.todo_tests, 1);
        assert_eq!(summary.pass_rate, 40.0);
        assert_eq!(summary.execution_time, 15);
        assert_eq!((summary.total_suites, summary.passed_suites, summary.failed_suites), (2, 1, 1));
    }

    #[test]
    fn test_category_breakdown_groups_by_tag() {
        let mut tagged = suite("perf", "src/x.test.ts", vec![test("p", TestStatus::Passed, 100)]);
        tagged.category = Some(TestCategory::Performance);
        let suites = vec![
            tagged,
            suite("api", "tests/integration/api.test.ts", vec![test("i", TestStatus::Failed, 1)]),
            suite("util", "src/util.test.ts", vec![test("u", TestStatus::Passed, 1)]),
        ];

        let breakdown = Aggregator::default().aggregate(&suites, None).by_category;
        assert_eq!(breakdown[&TestCategory::Performance].passed, 1);
        assert_eq!(breakdown[&TestCategory::Integration].failed, 1);
        assert_eq!(breakdown[&TestCategory::Integration].pass_rate, 0.0);
        assert_eq!(breakdown[&TestCategory::Unit].suites, 1);
        assert!(!breakdown.contains_key(&TestCategory::E2e));
    }

    #[test]
    fn test_slowest_tests_ranked_with_deterministic_ties() {
        let suites = vec![
            suite("zeta", "z.test.ts", vec![test("t", TestStatus::Passed, 50)]),
            suite("alpha", "a.test.ts", vec![
                test("b", TestStatus::Passed, 50),
                test("a", TestStatus::Passed, 50),
                test("slowest", TestStatus::Passed, 900),
            ]),
        ];

        let aggregator = Aggregator { max_slowest: 3, ..Aggregator::default() };
        let slowest = aggregator.aggregate(&suites, None).slowest_tests;
        let names: Vec<_> = slowest.iter().map(|t| (t.suite.as_str(), t.name.as_str())).collect();
        assert_eq!(names, vec![("alpha", "slowest"), ("alpha", "a"), ("alpha", "b")]);
    }

    #[test]
    fn test_failed_tests_keep_suite_order_and_attribution() {
        let suites = vec![
            suite("first", "f.test.ts", vec![
                test("x", TestStatus::Failed, 1),
                test("y", TestStatus::Passed, 1),
                test("z", TestStatus::Failed, 1),
            ]),
            suite("second", "s.test.ts", vec![test("w", TestStatus::Failed, 1)]),
        ];

        let failed = Aggregator::default().aggregate(&suites, None).failed_tests;
        let names: Vec<_> = failed.iter().map(|t| (t.suite.as_str(), t.name.as_str())).collect();
        assert_eq!(names, vec![("first", "x"), ("first", "z"), ("second", "w")]);
        assert_eq!(failed[0].failure_messages, vec!["x failed".to_string()]);

        let bounded = Aggregator { max_failed: 2, ..Aggregator::default() };
        assert_eq!(bounded.aggregate(&suites, None).failed_tests.len(), 2);
    }

    #[test]
    fn test_corrupt_suite_does_not_blank_report() {
        let suites = vec![
            suite("good", "g.test.ts", vec![test("ok", TestStatus::Passed, 2)]),
            SuiteResult::default(),
        ];
        let metrics = Aggregator::default().aggregate(&suites, None);
        assert_eq!(metrics.summary.total_tests, 1);
        assert_eq!(metrics.summary.total_suites, 2);
        assert_eq!(metrics.summary.pass_rate, 100.0);
    }

    #[test]
    fn test_huge_counts_saturate_instead_of_overflowing() {
        let huge = SuiteResult {
            name: "huge".to_string(),
            file_path: "src/huge.test.ts".to_string(),
            num_passing_tests: u64::MAX / 2 + 1,
            duration: u64::MAX / 2 + 1,
            ..Default::default()
        };
        let suites = vec![huge.clone(), SuiteResult { name: "huge2".to_string(), ..huge }];

        let metrics = Aggregator::default().aggregate(&suites, None);
        assert_eq!(metrics.summary.passed_tests, u64::MAX);
        assert_eq!(metrics.summary.total_tests, u64::MAX);
        assert_eq!(metrics.summary.execution_time, u64::MAX);
        assert_eq!(metrics.summary.pass_rate, 100.0);
        assert_eq!(metrics.by_category[&TestCategory::Unit].total, u64::MAX);
    }

    #[test]
    fn test_coverage_percentages_and_categories() {
        let mut by_file = BTreeMap::new();
        by_file.insert(
            "src/e2e/helpers.ts".to_string(),
            CoverageSummary { lines: CoverageCounter::new(10, 5), ..Default::default() },
        );
        by_file.insert(
            "src/core.ts".to_string(),
            CoverageSummary { lines: CoverageCounter::new(490, 395), ..Default::default() },
        );
        let input = CoverageInput {
            overall: CoverageSummary {
                lines: CoverageCounter { total: 500, covered: 400, percentage: 12.0 },
                ..Default::default()
            },
            by_file,
        };

        let coverage = Aggregator::default().aggregate(&[], Some(&input)).coverage;
        assert_eq!(coverage.overall.lines.percentage, 80.0);
        assert_eq!(coverage.overall.functions.percentage, 0.0);
        assert!(coverage.meets_threshold.lines);
        assert!(!coverage.meets_threshold.functions);
        assert_eq!(coverage.by_category[&TestCategory::E2e].lines.percentage, 50.0);
        assert_eq!(coverage.by_category[&TestCategory::Unit].lines.total, 490);
    }
}
