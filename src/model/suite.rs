//! Raw suite results as produced by the external test runner

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Test category tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestCategory {
    Unit,
    Integration,
    E2e,
    Performance,
}

impl TestCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestCategory::Unit => "unit",
            TestCategory::Integration => "integration",
            TestCategory::E2e => "e2e",
            TestCategory::Performance => "performance",
        }
    }

    /// Infer a category from a test or source file path
    pub fn infer(path: &str) -> Self {
        let path = path.to_ascii_lowercase();
        if path.contains("e2e") {
            TestCategory::E2e
        } else if path.contains("integration") {
            TestCategory::Integration
        } else if ["performance", "perf", "bench"].iter().any(|p| path.contains(p)) {
            TestCategory::Performance
        } else {
            TestCategory::Unit
        }
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall status of a suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteStatus {
    #[default]
    Passed,
    Failed,
    Mixed,
}

/// Status of a single test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    #[default]
    Passed,
    Failed,
    #[serde(alias = "skipped")]
    Pending,
    Todo,
}

/// Outcome of one test case
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestOutcome {
    pub name: String,
    pub status: TestStatus,
    /// Duration in milliseconds
    pub duration: u64,
    pub failure_messages: Vec<String>,
}

/// Results of one test file/suite
///
/// Every field has a default so that partially written runner output still
/// deserializes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SuiteResult {
    pub name: String,
    pub file_path: String,
    pub status: SuiteStatus,
    /// Duration in milliseconds
    pub duration: u64,
    pub tests: Vec<TestOutcome>,
    pub category: Option<TestCategory>,
    pub num_passing_tests: u64,
    pub num_failing_tests: u64,
    pub num_pending_tests: u64,
    pub num_todo_tests: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Per-status counts of a suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuiteCounts {
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub todo: u64,
}

impl SuiteCounts {
    pub fn total(&self) -> u64 {
        self.passed
            .saturating_add(self.failed)
            .saturating_add(self.skipped)
            .saturating_add(self.todo)
    }
}

impl SuiteResult {
    /// Explicit tag, or a category inferred from the file path
    pub fn effective_category(&self) -> TestCategory {
        self.category.unwrap_or_else(|| {
            if self.file_path.is_empty() {
                TestCategory::infer(&self.name)
            } else {
                TestCategory::infer(&self.file_path)
            }
        })
    }

    /// Counts from the runner's counters, or from the listed tests when the
    /// counters are all zero
    pub fn counts(&self) -> SuiteCounts {
        let declared = SuiteCounts {
            passed: self.num_passing_tests,
            failed: self.num_failing_tests,
            skipped: self.num_pending_tests,
            todo: self.num_todo_tests,
        };
        if declared.total() > 0 || self.tests.is_empty() {
            return declared;
        }

        self.tests
            .iter()
            .fold(SuiteCounts::default(), |mut counts, test| {
                match test.status {
                    TestStatus::Passed => counts.passed += 1,
                    TestStatus::Failed => counts.failed += 1,
                    TestStatus::Pending => counts.skipped += 1,
                    TestStatus::Todo => counts.todo += 1,
                }
                counts
            })
    }

    /// Duration in milliseconds, falling back to `end - start`
    pub fn effective_duration(&self) -> u64 {
        if self.duration > 0 {
            return self.duration;
        }
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if end > start => {
                u64::try_from((end - start).num_milliseconds()).unwrap_or(0)
            }
            _ => 0,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.status == SuiteStatus::Failed || self.counts().failed > 0
    }
}
