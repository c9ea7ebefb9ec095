//! # testreport - test result aggregation and report generation
//!
//! Turns the raw output of a test run (per-suite results and an optional
//! coverage summary) into build artifacts: a JSON document with a stable
//! schema, a Markdown summary and a styled HTML page.
//!
//! ## Features
//!
//! - **CI aware**: detects GitHub Actions, Jenkins, GitLab CI, Azure DevOps and
//!   CircleCI from an immutable environment snapshot
//! - **Build metadata**: git branch, commit and author embedded in every report
//! - **Isolated formats**: formats are generated concurrently and a failing
//!   format never prevents the others from being written
//! - **Layered configuration**: embedded defaults, `testreport.toml`,
//!   environment variables and CLI flags
//!
//! ## Quick Start
//!
//! ```bash
//! # Generate reports from a results file
//! testreport generate --results results.json --coverage coverage-summary.json
//!
//! # Show what CI provider is detected
//! testreport detect --json
//! ```

pub mod aggregate;
pub mod ci;
pub mod cli;
pub mod config;
pub mod git;
pub mod input;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod reports;

pub use cli::{Cli, Output};
pub use config::ReportingConfig;
pub use pipeline::{ExitStatus, Pipeline};
