//! Git integration layer
//!
//! Provides a read-only snapshot of the repository state (branch, HEAD commit,
//! last commit message/author, dirty flag) using git2. The metadata collector
//! talks to this through the [`GitQuery`] trait so that failures can be
//! substituted in tests.

use anyhow::{Context, Result};
use git2::{Repository, StatusOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder for git fields that could not be read
pub const UNKNOWN: &str = "unknown";

/// Version-control state captured for a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitInfo {
    pub branch: String,
    pub commit: String,
    pub commit_message: String,
    pub author: String,
    pub is_dirty: bool,
}

impl GitInfo {
    /// Snapshot used when the repository cannot be queried
    pub fn unknown() -> Self {
        Self {
            branch: UNKNOWN.to_string(),
            commit: UNKNOWN.to_string(),
            commit_message: UNKNOWN.to_string(),
            author: UNKNOWN.to_string(),
            is_dirty: false,
        }
    }

    /// Short form of the commit hash for display
    pub fn short_commit(&self) -> &str {
        if self.commit == UNKNOWN {
            return &self.commit;
        }
        match self.commit.char_indices().nth(8) {
            Some((end, _)) => &self.commit[..end],
            None => &self.commit,
        }
    }
}

impl Default for GitInfo {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Source of version-control state
pub trait GitQuery: Send + Sync {
    fn snapshot(&self) -> Result<GitInfo>;
}

impl<T: GitQuery + ?Sized> GitQuery for &T {
    fn snapshot(&self) -> Result<GitInfo> {
        (**self).snapshot()
    }
}

/// git2-backed query rooted at a directory inside the repository
#[derive(Debug, Clone)]
pub struct GitRepo {
    start: PathBuf,
}

impl GitRepo {
    /// Query the repository containing `path` (searching parent directories)
    pub fn at<P: AsRef<Path>>(path: P) -> Self {
        Self {
            start: path.as_ref().to_path_buf(),
        }
    }

    /// Query the repository containing the current directory
    pub fn discover() -> Self {
        Self::at(".")
    }

    fn open(&self) -> Result<Repository> {
        Repository::discover(&self.start).with_context(|| {
            format!("No Git repository found at {}", self.start.display())
        })
    }
}

impl GitQuery for GitRepo {
    fn snapshot(&self) -> Result<GitInfo> {
        let repo = self.open()?;
        let head = repo.head().context("Failed to get HEAD reference")?;

        let branch = head.shorthand().unwrap_or("HEAD").to_string();
        let commit = head
            .peel_to_commit()
            .context("HEAD does not point at a commit")?;

        let commit_message = commit.summary().unwrap_or_default().trim().to_string();
        let author = commit.author().name().unwrap_or(UNKNOWN).to_string();

        let mut opts = StatusOptions::new();
        opts.include_untracked(true).include_ignored(false);
        let is_dirty = !repo
            .statuses(Some(&mut opts))
            .context("Failed to get repository status")?
            .is_empty();

        Ok(GitInfo {
            branch,
            commit: commit.id().to_string(),
            commit_message,
            author,
            is_dirty,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use git2::{Repository, Signature};
    use std::path::Path;

    /// Create a repository with a single commit on the default branch
    pub fn init_repo_with_commit(dir: &Path, message: &str) -> Repository {
        let repo = Repository::init(dir).unwrap();
        std::fs::write(dir.join("README.md"), "hello\n").unwrap();
        {
            let mut index = repo.index().unwrap();
            index.add_path(Path::new("README.md")).unwrap();
            index.write().unwrap();
            let tree_id = index.write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            let sig = Signature::now("Ada Lovelace", "ada@example.com").unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[])
                .unwrap();
        }
        repo
    }
}
