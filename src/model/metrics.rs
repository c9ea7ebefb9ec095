//! Aggregated test metrics

use super::coverage::CoverageMetrics;
use super::suite::TestCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary counts across all suites
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub total_tests: u64,
    pub passed_tests: u64,
    pub failed_tests: u64,
    pub skipped_tests: u64,
    pub todo_tests: u64,
    pub pass_rate: f64,
    /// Sum of suite durations in milliseconds
    pub execution_time: u64,
    pub total_suites: u64,
    pub passed_suites: u64,
    pub failed_suites: u64,
}

/// Counts for one test category
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMetrics {
    pub suites: u64,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub todo: u64,
    pub pass_rate: f64,
    pub execution_time: u64,
}

/// Entry of the slowest-tests ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowTest {
    pub suite: String,
    pub name: String,
    pub duration: u64,
}

/// A failing test with its suite attribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedTest {
    pub suite: String,
    pub file_path: String,
    pub name: String,
    pub failure_messages: Vec<String>,
}

/// Everything the report generators render
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMetrics {
    pub summary: TestSummary,
    pub by_category: BTreeMap<TestCategory, CategoryMetrics>,
    pub coverage: CoverageMetrics,
    pub slowest_tests: Vec<SlowTest>,
    pub failed_tests: Vec<FailedTest>,
}

impl TestMetrics {
    pub fn has_failures(&self) -> bool {
        self.summary.failed_tests > 0 || self.summary.failed_suites > 0
    }
}
