//! Build metadata collection
//!
//! Gathers the timestamp, environment name, git state, runtime platform and CI
//! identity for a report. Collection never fails: anything that cannot be read
//! is replaced with a placeholder, because missing metadata must not block
//! report generation.

use crate::ci::{self, CiInfo, EnvSnapshot};
use crate::git::{GitInfo, GitQuery, GitRepo, UNKNOWN};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Runtime version string reported in the `nodeVersion` field
pub const RUNTIME_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

/// Default environment name
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Metadata sub-collection failure; always recovered with placeholders
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("git information unavailable: {0:#}")]
    Git(anyhow::Error),
}

/// Snapshot of the build the report describes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildMetadata {
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    pub git_info: GitInfo,
    /// Runtime version of the process that produced the report
    pub node_version: String,
    pub platform: String,
    pub architecture: String,
    pub ci_info: CiInfo,
}

impl BuildMetadata {
    /// Metadata with placeholders everywhere except the timestamp
    pub fn placeholder(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            git_info: GitInfo::unknown(),
            node_version: RUNTIME_VERSION.to_string(),
            platform: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            ci_info: CiInfo::local(),
        }
    }

    pub fn timestamp_string(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Collects [`BuildMetadata`] from an environment snapshot and a git source
pub struct MetadataCollector<'a> {
    env: &'a EnvSnapshot,
    environment: String,
    git: Box<dyn GitQuery + 'a>,
}

impl<'a> MetadataCollector<'a> {
    /// Collector using the repository around the current directory
    pub fn new(env: &'a EnvSnapshot) -> Self {
        Self {
            env,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            git: Box::new(GitRepo::discover()),
        }
    }

    pub fn with_git(mut self, git: impl GitQuery + 'a) -> Self {
        self.git = Box::new(git);
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        let environment = environment.into();
        if !environment.trim().is_empty() {
            self.environment = environment;
        }
        self
    }

    pub fn collect(&self) -> BuildMetadata {
        self.collect_at(Utc::now())
    }

    /// Collect with a fixed timestamp
    pub fn collect_at(&self, timestamp: DateTime<Utc>) -> BuildMetadata {
        let ci_info = ci::detect(self.env);

        let git_info = self.git_info().unwrap_or_else(|e| {
            tracing::debug!("{e}");
            let mut info = GitInfo::unknown();
            if let Some(sha) = &ci_info.commit_sha {
                info.commit = sha.clone();
            }
            info
        });

        BuildMetadata {
            environment: self.environment.clone(),
            git_info,
            ci_info,
            ..BuildMetadata::placeholder(timestamp)
        }
    }

    fn git_info(&self) -> Result<GitInfo, CollectionError> {
        let mut info = self.git.snapshot().map_err(CollectionError::Git)?;
        if info.branch.is_empty() {
            info.branch = UNKNOWN.to_string();
        }
        Ok(info)
    }
}

/// ISO-8601 (RFC 3339, millisecond precision) timestamps
pub(crate) mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
