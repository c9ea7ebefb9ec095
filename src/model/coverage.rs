//! Coverage metrics

use super::suite::TestCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One coverage dimension: `{total, covered, percentage}`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoverageCounter {
    pub total: u64,
    pub covered: u64,
    pub percentage: f64,
}

impl CoverageCounter {
    /// Build a counter; the percentage is always derived, never NaN
    pub fn new(total: u64, covered: u64) -> Self {
        // Runner output occasionally reports covered > total; clamp it.
        let covered = covered.min(total);
        Self {
            total,
            covered,
            percentage: percentage(covered, total),
        }
    }

    pub fn add(&self, other: &CoverageCounter) -> Self {
        Self::new(
            self.total.saturating_add(other.total),
            self.covered.saturating_add(other.covered),
        )
    }
}

/// `part/whole*100`, or 0 when `whole` is 0
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Coverage along all four dimensions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub lines: CoverageCounter,
    pub functions: CoverageCounter,
    pub branches: CoverageCounter,
    pub statements: CoverageCounter,
}

impl CoverageSummary {
    pub fn add(&self, other: &CoverageSummary) -> Self {
        Self {
            lines: self.lines.add(&other.lines),
            functions: self.functions.add(&other.functions),
            branches: self.branches.add(&other.branches),
            statements: self.statements.add(&other.statements),
        }
    }

    /// Recompute every percentage from its counts
    pub fn normalized(&self) -> Self {
        let fix = |c: &CoverageCounter| CoverageCounter::new(c.total, c.covered);
        Self {
            lines: fix(&self.lines),
            functions: fix(&self.functions),
            branches: fix(&self.branches),
            statements: fix(&self.statements),
        }
    }

    pub fn dimensions(&self) -> [(&'static str, &CoverageCounter); 4] {
        [
            ("lines", &self.lines),
            ("functions", &self.functions),
            ("branches", &self.branches),
            ("statements", &self.statements),
        ]
    }
}

/// Minimum percentages per dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageThreshold {
    pub lines: f64,
    pub functions: f64,
    pub branches: f64,
    pub statements: f64,
}

impl Default for CoverageThreshold {
    fn default() -> Self {
        Self {
            lines: 80.0,
            functions: 80.0,
            branches: 80.0,
            statements: 80.0,
        }
    }
}

impl CoverageThreshold {
    pub fn dimensions(&self) -> [(&'static str, f64); 4] {
        [
            ("lines", self.lines),
            ("functions", self.functions),
            ("branches", self.branches),
            ("statements", self.statements),
        ]
    }
}

/// Whether each dimension of the overall summary meets its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThresholdStatus {
    pub lines: bool,
    pub functions: bool,
    pub branches: bool,
    pub statements: bool,
}

impl ThresholdStatus {
    pub fn evaluate(summary: &CoverageSummary, threshold: &CoverageThreshold) -> Self {
        Self {
            lines: summary.lines.percentage >= threshold.lines,
            functions: summary.functions.percentage >= threshold.functions,
            branches: summary.branches.percentage >= threshold.branches,
            statements: summary.statements.percentage >= threshold.statements,
        }
    }

    pub fn all(&self) -> bool {
        self.lines && self.functions && self.branches && self.statements
    }
}

/// Raw coverage as supplied by the coverage tool
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoverageInput {
    pub overall: CoverageSummary,
    pub by_file: BTreeMap<String, CoverageSummary>,
}

/// Aggregated coverage section of a report
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageMetrics {
    pub overall: CoverageSummary,
    pub by_file: BTreeMap<String, CoverageSummary>,
    pub by_category: BTreeMap<TestCategory, CoverageSummary>,
    pub threshold: CoverageThreshold,
    pub meets_threshold: ThresholdStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_total_is_zero_percent() {
        let c = CoverageCounter::new(0, 0);
        assert_eq!(c.percentage, 0.0);
        assert!(!c.percentage.is_nan());
    }

    #[test]
    fn test_percentage_is_derived() {
        assert_eq!(CoverageCounter::new(500, 400).percentage, 80.0);
        assert_eq!(CoverageCounter::new(10, 25).covered, 10);
    }

    #[test]
    fn test_normalized_recomputes_percentages() {
        let raw = CoverageSummary {
            lines: CoverageCounter { total: 4, covered: 1, percentage: 99.0 },
            ..Default::default()
        };
        assert_eq!(raw.normalized().lines.percentage, 25.0);
    }

    #[test]
    fn test_add_saturates_large_totals() {
        let half = CoverageCounter::new(u64::MAX / 2 + 1, u64::MAX / 2 + 1);
        let sum = half.add(&half);
        assert_eq!((sum.total, sum.covered), (u64::MAX, u64::MAX));
        assert_eq!(sum.percentage, 100.0);
    }

    #[test]
    fn test_threshold_evaluation() {
        let summary = CoverageSummary {
            lines: CoverageCounter::new(100, 90),
            functions: CoverageCounter::new(100, 50),
            branches: CoverageCounter::new(0, 0),
            statements: CoverageCounter::new(100, 80),
        };
        let status = ThresholdStatus::evaluate(&summary, &CoverageThreshold::default());
        assert!(status.lines);
        assert!(!status.functions);
        assert!(!status.branches);
        assert!(status.statements);
        assert!(!status.all());
    }
}
