//! Report data model
//!
//! Raw suite results and coverage flow in, [`TestMetrics`] flows out to the
//! report generators. All of it is rebuilt on every run.

pub mod coverage;
pub mod metrics;
pub mod suite;

pub use coverage::{
    CoverageCounter, CoverageInput, CoverageMetrics, CoverageSummary, CoverageThreshold,
    ThresholdStatus,
};
pub use metrics::{CategoryMetrics, FailedTest, SlowTest, TestMetrics, TestSummary};
pub use suite::{SuiteCounts, SuiteResult, SuiteStatus, TestCategory, TestOutcome, TestStatus};
