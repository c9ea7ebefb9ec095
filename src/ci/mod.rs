//! CI environment detection
//!
//! Maps an immutable snapshot of environment variables to the identity of the
//! CI provider running the build. Detection is a pure function of the snapshot,
//! so every caller (config resolution, metadata collection) sees the same answer
//! for the whole run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Immutable view of the process environment taken once at the start of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment
    pub fn capture() -> Self {
        // Non-UTF-8 variables can never match a signature, so they are dropped.
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Build a snapshot from explicit key/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Value of `key` if present and not blank
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// True if `key` holds a truthy flag value (`true`/`1`, case-insensitive)
    pub fn is_truthy(&self, key: &str) -> bool {
        self.non_empty(key)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }
}

/// Known CI providers, in detection order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CiProvider {
    GithubActions,
    Jenkins,
    GitlabCi,
    AzureDevops,
    Circleci,
    /// Generic `CI=true` without a recognised provider signature
    Unknown,
}

impl CiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CiProvider::GithubActions => "github-actions",
            CiProvider::Jenkins => "jenkins",
            CiProvider::GitlabCi => "gitlab-ci",
            CiProvider::AzureDevops => "azure-devops",
            CiProvider::Circleci => "circleci",
            CiProvider::Unknown => "unknown",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CiProvider::GithubActions => "GitHub Actions",
            CiProvider::Jenkins => "Jenkins",
            CiProvider::GitlabCi => "GitLab CI",
            CiProvider::AzureDevops => "Azure DevOps",
            CiProvider::Circleci => "CircleCI",
            CiProvider::Unknown => "Unknown CI",
        }
    }
}

impl fmt::Display for CiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a signature's marker variable is matched
#[derive(Debug, Clone, Copy)]
enum Marker {
    /// Variable must equal `true` (case-insensitive) or `1`
    Truthy(&'static str),
    /// Variable must be present and non-empty
    Present(&'static str),
}

impl Marker {
    fn matches(&self, env: &EnvSnapshot) -> bool {
        match self {
            Marker::Truthy(key) => env.is_truthy(key),
            Marker::Present(key) => env.non_empty(key).is_some(),
        }
    }
}

/// Environment fingerprint of a single provider
struct Signature {
    provider: CiProvider,
    marker: Marker,
    build_number: &'static str,
    commit_sha: Option<&'static str>,
    job_name: Option<&'static str>,
}

/// Ordered provider signatures; the first match wins.
const SIGNATURES: &[Signature] = &[
    Signature {
        provider: CiProvider::GithubActions,
        marker: Marker::Truthy("GITHUB_ACTIONS"),
        build_number: "GITHUB_RUN_ID",
        commit_sha: Some("GITHUB_SHA"),
        job_name: None,
    },
    Signature {
        provider: CiProvider::Jenkins,
        marker: Marker::Present("JENKINS_URL"),
        build_number: "BUILD_NUMBER",
        commit_sha: None,
        job_name: Some("JOB_NAME"),
    },
    Signature {
        provider: CiProvider::GitlabCi,
        marker: Marker::Truthy("GITLAB_CI"),
        build_number: "CI_PIPELINE_ID",
        commit_sha: Some("CI_COMMIT_SHA"),
        job_name: Some("CI_JOB_ID"),
    },
    Signature {
        provider: CiProvider::AzureDevops,
        marker: Marker::Truthy("TF_BUILD"),
        build_number: "BUILD_BUILDNUMBER",
        commit_sha: None,
        job_name: Some("SYSTEM_TEAMPROJECT"),
    },
    Signature {
        provider: CiProvider::Circleci,
        marker: Marker::Truthy("CIRCLECI"),
        build_number: "CIRCLE_BUILD_NUM",
        commit_sha: None,
        job_name: Some("CIRCLE_JOB"),
    },
];

/// CI identity of the current build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CiInfo {
    #[serde(rename = "isCI")]
    pub is_ci: bool,
    pub provider: Option<CiProvider>,
    pub build_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
}

impl CiInfo {
    /// Result for a build outside any CI system
    pub fn local() -> Self {
        Self::default()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.map_or("none", |p| p.as_str())
    }
}

/// Detect the CI provider from an environment snapshot. Never fails.
pub fn detect(env: &EnvSnapshot) -> CiInfo {
    let owned = |key: &str| env.non_empty(key).map(str::to_string);

    if let Some(sig) = SIGNATURES.iter().find(|sig| sig.marker.matches(env)) {
        return CiInfo {
            is_ci: true,
            provider: Some(sig.provider),
            build_number: owned(sig.build_number),
            commit_sha: sig.commit_sha.and_then(owned),
            job_name: sig.job_name.and_then(owned),
        };
    }

    if env.is_truthy("CI") {
        return CiInfo {
            is_ci: true,
            provider: Some(CiProvider::Unknown),
            ..CiInfo::default()
        };
    }

    CiInfo::local()
}
