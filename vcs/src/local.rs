//! Local repository adapter
//!
//! The narrow, read-only surface a browsing front end needs, expressed as a
//! trait so views can be exercised against an in-memory repository.

use crate::client::{Git, GitError, GitResult};
use crate::config::GitConfig;
use crate::parse::normalize_ref;
use crate::types::{Branch, Commit, FileEntry, Opened, TreePath};
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait RepositoryBrowser: Send + Sync {
    async fn branches(&self) -> GitResult<Vec<Branch>>;

    async fn current_branch(&self) -> GitResult<String>;

    /// History reachable from `reference`, newest first.
    async fn commit_history(&self, reference: &str) -> GitResult<Vec<Commit>>;

    async fn latest_commit(&self, reference: &str) -> GitResult<Commit>;

    /// Entries of the directory `reference` (`<base>` or `<base>:<path>`)
    /// points at. Never changes the checked-out branch.
    async fn file_structure(&self, reference: &str) -> GitResult<Vec<FileEntry>>;

    async fn open(&self, reference: &str) -> GitResult<Opened>;

    fn browser_name(&self) -> &'static str;
}

/// [`RepositoryBrowser`] backed by the git CLI.
pub struct GitLocal {
    git: Git,
}

impl GitLocal {
    pub fn new(config: GitConfig) -> GitResult<Self> {
        Ok(Self::from_git(Git::new(config)?))
    }

    pub fn from_git(git: Git) -> Self {
        Self { git }
    }

    pub fn git(&self) -> &Git {
        &self.git
    }
}

#[async_trait]
impl RepositoryBrowser for GitLocal {
    async fn branches(&self) -> GitResult<Vec<Branch>> {
        self.git.branches(&[]).await
    }

    async fn current_branch(&self) -> GitResult<String> {
        self.git.branch(None, &[]).await
    }

    async fn commit_history(&self, reference: &str) -> GitResult<Vec<Commit>> {
        self.git.log(Some(reference), &[]).await
    }

    async fn latest_commit(&self, reference: &str) -> GitResult<Commit> {
        self.git
            .log(Some(reference), &["-1"])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GitError::EmptyHistory {
                reference: reference.to_string(),
            })
    }

    async fn file_structure(&self, reference: &str) -> GitResult<Vec<FileEntry>> {
        let target = TreePath::parse(&normalize_ref(reference));
        debug!("Listing {}", target);
        self.git.file_structure(&target.base, &target.path, &[]).await
    }

    async fn open(&self, reference: &str) -> GitResult<Opened> {
        self.git.open(reference).await
    }

    fn browser_name(&self) -> &'static str {
        "git-local"
    }
}
