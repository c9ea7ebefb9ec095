//! Loading raw results written by the external test runner
//!
//! Suites come from a JSON file that is either an array of suites or an object
//! with a `suites` (or Jest-style `testResults`) array. Coverage comes from an
//! istanbul-style `coverage-summary.json`.
//!
//! Parsing is lenient per suite: an element with wrong-typed fields keeps every
//! field that can be read and defaults the rest.

use crate::model::{
    CoverageCounter, CoverageInput, CoverageSummary, SuiteResult, SuiteStatus, TestCategory,
    TestOutcome,
};
use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;

/// Read suite results from a JSON file
pub fn load_suites(path: &Path) -> Result<Vec<SuiteResult>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read test results: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse test results: {}", path.display()))?;
    parse_suites(value)
}

/// Extract suites from an already parsed JSON document
pub fn parse_suites(value: Value) -> Result<Vec<SuiteResult>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("suites").or_else(|| map.remove("testResults")) {
            Some(Value::Array(items)) => items,
            _ => bail!("Test results object has no `suites` or `testResults` array"),
        },
        _ => bail!("Test results must be a JSON array or object"),
    };

    Ok(items
        .into_iter()
        .enumerate()
        .map(|(index, item)| parse_suite(index, item))
        .collect())
}

fn parse_suite(index: usize, item: Value) -> SuiteResult {
    match serde_json::from_value::<SuiteResult>(item.clone()) {
        Ok(suite) => suite,
        Err(e) => {
            tracing::warn!("Suite #{index} is malformed ({e}); using defaults for unreadable fields");
            lenient_suite(&item)
        }
    }
}

/// Field-by-field extraction used when strict deserialization fails
fn lenient_suite(item: &Value) -> SuiteResult {
    let text = |key: &str| item.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    let count = |key: &str| item.get(key).and_then(Value::as_u64).unwrap_or(0);

    let tests = item
        .get("tests")
        .and_then(Value::as_array)
        .map(|tests| {
            tests
                .iter()
                .filter_map(|t| serde_json::from_value::<TestOutcome>(t.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    SuiteResult {
        name: text("name"),
        file_path: text("filePath"),
        status: typed(item, "status").unwrap_or(SuiteStatus::Passed),
        duration: count("duration"),
        tests,
        category: typed::<TestCategory>(item, "category"),
        num_passing_tests: count("numPassingTests"),
        num_failing_tests: count("numFailingTests"),
        num_pending_tests: count("numPendingTests"),
        num_todo_tests: count("numTodoTests"),
        start_time: typed(item, "startTime"),
        end_time: typed(item, "endTime"),
    }
}

fn typed<T: DeserializeOwned>(item: &Value, key: &str) -> Option<T> {
    item.get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
}

/// Read an istanbul-style coverage summary
pub fn load_coverage(path: &Path) -> Result<CoverageInput> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read coverage summary: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse coverage summary: {}", path.display()))?;
    parse_coverage(&value)
}

pub fn parse_coverage(value: &Value) -> Result<CoverageInput> {
    let Some(map) = value.as_object() else {
        bail!("Coverage summary must be a JSON object");
    };

    let mut input = CoverageInput::default();
    for (key, entry) in map {
        let summary = parse_summary(entry);
        if key == "total" {
            input.overall = summary;
        } else {
            input.by_file.insert(key.clone(), summary);
        }
    }

    // Without a `total` entry, roll the files up ourselves
    if !map.contains_key("total") {
        input.overall = input
            .by_file
            .values()
            .fold(CoverageSummary::default(), |acc, s| acc.add(s));
    }
    Ok(input)
}

fn parse_summary(entry: &Value) -> CoverageSummary {
    let counter = |key: &str| {
        let dim = entry.get(key);
        let read = |field: &str| dim.and_then(|d| d.get(field)).and_then(Value::as_u64).unwrap_or(0);
        CoverageCounter::new(read("total"), read("covered"))
    };

    CoverageSummary {
        lines: counter("lines"),
        functions: counter("functions"),
        branches: counter("branches"),
        statements: counter("statements"),
    }
}
