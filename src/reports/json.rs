//! JSON report generator
//!
//! The structured-data artifact is the normative schema; the other formats are
//! views of the same model. Output is deterministic for a given model: maps are
//! ordered and the timestamp comes from the build metadata, so parsing the
//! artifact back into [`JsonReport`] and serializing it again reproduces the
//! same bytes.

use super::{GenerationError, ReportFormat, ReportGenerator, ReportModel};
use crate::metadata::BuildMetadata;
use crate::model::{
    CategoryMetrics, CoverageMetrics, FailedTest, SlowTest, SuiteResult, TestCategory, TestSummary,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level document of the JSON artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport {
    pub timestamp: String,
    pub title: String,
    pub build_metadata: BuildMetadata,
    pub summary: TestSummary,
    pub category_breakdown: BTreeMap<TestCategory, CategoryMetrics>,
    pub coverage_data: CoverageMetrics,
    pub slowest_tests: Vec<SlowTest>,
    pub failed_tests: Vec<FailedTest>,
    pub suite_results: Vec<SuiteResult>,
}

impl JsonReport {
    pub fn from_model(model: &ReportModel) -> Self {
        Self {
            timestamp: model.build_metadata.timestamp_string(),
            title: model.title.clone(),
            build_metadata: model.build_metadata.clone(),
            summary: model.metrics.summary.clone(),
            category_breakdown: model.metrics.by_category.clone(),
            coverage_data: model.metrics.coverage.clone(),
            slowest_tests: model.metrics.slowest_tests.clone(),
            failed_tests: model.metrics.failed_tests.clone(),
            suite_results: model.suites.clone(),
        }
    }

    /// Serialize with the artifact's formatting
    pub fn to_pretty_string(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}

/// JSON report generator - machine-friendly format
pub struct JsonReportGenerator;

impl ReportGenerator for JsonReportGenerator {
    fn format(&self) -> ReportFormat {
        ReportFormat::Json
    }

    fn render(&self, model: &ReportModel) -> Result<String, GenerationError> {
        JsonReport::from_model(model)
            .to_pretty_string()
            .map_err(|e| GenerationError::render(self.format().name(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::test_support::sample_model;

    #[test]
    fn test_schema_keys() {
        let content = JsonReportGenerator.render(&sample_model()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert_eq!(value["timestamp"], "2024-03-01T12:00:00.000Z");
        assert_eq!(value["summary"]["totalTests"], 3);
        assert_eq!(value["summary"]["failedTests"], 1);
        assert!(value["summary"]["passRate"].is_number());
        assert!(value["buildMetadata"]["gitInfo"]["branch"].is_string());
        assert!(value["buildMetadata"]["ciInfo"]["provider"].is_null());
        assert_eq!(value["coverageData"]["overall"]["lines"]["percentage"], 0.0);
        assert!(value["coverageData"]["byFile"].is_object());
        assert!(value["coverageData"]["byCategory"].is_object());
        assert_eq!(value["coverageData"]["threshold"]["lines"], 80.0);
        assert_eq!(value["suiteResults"].as_array().unwrap().len(), 2);
        assert_eq!(value["categoryBreakdown"]["e2e"]["failed"], 1);
    }

    #[test]
    fn test_reparse_and_reserialize_is_byte_identical() {
        let content = JsonReportGenerator.render(&sample_model()).unwrap();
        let parsed: JsonReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.to_pretty_string().unwrap(), content);
    }

    #[test]
    fn test_same_model_renders_identically() {
        let model = sample_model();
        let first = JsonReportGenerator.render(&model).unwrap();
        let second = JsonReportGenerator.render(&model.clone()).unwrap();
        assert_eq!(first, second);
    }
}
