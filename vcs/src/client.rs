//! Repository client
//!
//! [`Git`] composes the [`CommandRunner`] and the output parsers into
//! repository-level operations. Every call spawns its own processes and
//! keeps no state between calls; concurrent mutating calls against one
//! working directory must be serialized by the caller.

use crate::config::GitConfig;
use crate::parse::{
    log_format, normalize_ref, parse_branches, parse_log, parse_object_kind, parse_tree_listing,
};
use crate::runner::{Capture, CommandOutput, CommandRunner, CommandSpec, ProcessRunner, RunnerError};
use crate::types::{Branch, Commit, FileEntry, ObjectKind, Opened, TreePath};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to read status: {output}")]
    Status { output: String },

    #[error("Failed to list branches: {output}")]
    Branch { output: String },

    #[error("No branch is marked as current")]
    NoCurrentBranch,

    #[error("More than one branch is marked as current: {}", .candidates.join(", "))]
    AmbiguousCurrentBranch { candidates: Vec<String> },

    #[error("Failed to check out '{reference}': {output}")]
    Checkout { reference: String, output: String },

    #[error("Failed to read commit history: {output}")]
    Log { output: String },

    #[error("Malformed commit log: {0}")]
    LogFormat(#[from] serde_json::Error),

    #[error("No commits found for '{reference}'")]
    EmptyHistory { reference: String },

    #[error("Failed to list '{reference}': {output}")]
    FileStructure { reference: String, output: String },

    #[error("Failed to read contents of '{reference}': {output}")]
    Contents { reference: String, output: String },

    #[error("Failed to resolve type of '{reference}': {output}")]
    TypeQuery { reference: String, output: String },

    #[error("Unexpected object kind '{kind}' for '{reference}'")]
    UnexpectedObjectKind { reference: String, kind: String },
}

pub type GitResult<T> = Result<T, GitError>;

/// Client for one repository location, driving the git CLI.
pub struct Git {
    config: GitConfig,
    runner: Arc<dyn CommandRunner>,
}

impl Git {
    pub fn new(config: GitConfig) -> GitResult<Self> {
        Self::with_runner(config, Arc::new(ProcessRunner::new()))
    }

    pub fn with_runner(config: GitConfig, runner: Arc<dyn CommandRunner>) -> GitResult<Self> {
        config
            .validate()
            .map_err(|message| GitError::InvalidConfig { message })?;

        Ok(Self { config, runner })
    }

    pub fn config(&self) -> &GitConfig {
        &self.config
    }

    pub fn runner_name(&self) -> &'static str {
        self.runner.runner_name()
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.config.program, &self.config.working_dir)
            .with_timeout(self.config.timeout)
            .with_envs(&self.config.envs)
    }

    async fn run(&self, spec: CommandSpec) -> GitResult<CommandOutput> {
        Ok(self.runner.run(&spec).await?)
    }

    /// Creates a repository in the working directory.
    pub async fn init(&self, flags: &[&str]) -> GitResult<bool> {
        let output = self.run(self.command().arg("init").args(flags)).await?;
        Ok(output.success())
    }

    /// Stages `paths`.
    pub async fn add(&self, paths: &[&str], flags: &[&str]) -> GitResult<bool> {
        let output = self
            .run(self.command().arg("add").args(paths).args(flags))
            .await?;
        Ok(output.success())
    }

    /// Records a commit whose message is `title`, a blank line, and `body`.
    ///
    /// A rejected commit (nothing staged, no identity, ...) is `Ok(false)`;
    /// use [`Git::status`] to find out why.
    pub async fn commit(&self, title: &str, body: &str, flags: &[&str]) -> GitResult<bool> {
        let message = format!("{}\n\n{}", title, body);
        let output = self
            .run(self.command().args(["commit", "-m"]).arg(message).args(flags))
            .await?;
        if !output.success() {
            debug!("Commit rejected: {}", output.diagnostic());
        }
        Ok(output.success())
    }

    pub async fn status(&self, flags: &[&str]) -> GitResult<String> {
        let output = self
            .run(
                self.command()
                    .args(["--no-pager", "status"])
                    .args(flags)
                    .with_capture(Capture::FirstOf),
            )
            .await?;

        if !output.success() {
            return Err(GitError::Status {
                output: output.diagnostic(),
            });
        }
        Ok(output.text())
    }

    async fn branch_listing(&self, flags: &[&str]) -> GitResult<Vec<Branch>> {
        let output = self
            .run(self.command().args(["--no-pager", "branch"]).args(flags))
            .await?;

        if !output.success() {
            return Err(GitError::Branch {
                output: output.diagnostic(),
            });
        }
        Ok(parse_branches(&output.text()))
    }

    /// Without a name, returns the checked-out branch. With one, checks it
    /// out and returns the branch that was active before.
    pub async fn branch(&self, name: Option<&str>, flags: &[&str]) -> GitResult<String> {
        match name {
            Some(name) => self.checkout(name, flags).await,
            None => self.current_branch(flags).await,
        }
    }

    async fn current_branch(&self, flags: &[&str]) -> GitResult<String> {
        let branches = self.branch_listing(flags).await?;
        let mut current = branches.into_iter().filter(|b| b.is_current);
        match (current.next(), current.next()) {
            (Some(branch), None) => Ok(branch.name),
            (None, _) => Err(GitError::NoCurrentBranch),
            (Some(first), Some(second)) => {
                let candidates = [first.name, second.name]
                    .into_iter()
                    .chain(current.map(|b| b.name))
                    .collect();
                Err(GitError::AmbiguousCurrentBranch { candidates })
            }
        }
    }

    /// Every branch, with the checked-out one flagged.
    pub async fn branches(&self, flags: &[&str]) -> GitResult<Vec<Branch>> {
        let branches = self.branch_listing(flags).await?;
        debug!("Found {} branches", branches.len());
        Ok(branches)
    }

    /// Switches to `reference` and returns the branch that was active
    /// before, so the caller can switch back.
    pub async fn checkout(&self, reference: &str, flags: &[&str]) -> GitResult<String> {
        let previous = self.current_branch(&[]).await?;

        let output = self
            .run(
                self.command()
                    .arg("checkout")
                    .args(flags)
                    .arg(reference)
                    .with_capture(Capture::Combined),
            )
            .await?;

        if output.success() && output.text().contains(reference) {
            info!("Checked out {} (was {})", reference, previous);
            Ok(previous)
        } else {
            Err(GitError::Checkout {
                reference: reference.to_string(),
                output: output.diagnostic(),
            })
        }
    }

    /// History reachable from `path` (a revision; `None` means the current
    /// head), newest first.
    pub async fn log(&self, path: Option<&str>, flags: &[&str]) -> GitResult<Vec<Commit>> {
        let mut spec = self.command().args([
            "--no-pager".to_string(),
            "log".to_string(),
            format!("--pretty=format:{}", log_format()),
            "--date=raw".to_string(),
        ]);
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            spec = spec.arg(path);
        }
        let output = self.run(spec.args(flags).arg("--")).await?;

        if !output.success() {
            return Err(GitError::Log {
                output: output.diagnostic(),
            });
        }

        let commits = parse_log(&output.text())?;
        debug!("Parsed {} commits", commits.len());
        Ok(commits)
    }

    /// Entries directly under `root` at `reference`.
    ///
    /// Directory-ness comes from one type query per entry; up to
    /// `type_query_concurrency` of them run at once and the listing keeps
    /// its order. If any query fails, nothing is returned.
    pub async fn file_structure(
        &self,
        reference: &str,
        root: &str,
        flags: &[&str],
    ) -> GitResult<Vec<FileEntry>> {
        let listing = TreePath::new(reference, root);
        let output = self
            .run(
                self.command()
                    .args(["--no-pager", "ls-tree", "-z", "--name-only"])
                    .arg(listing.to_string())
                    .args(flags),
            )
            .await?;

        if !output.success() {
            return Err(GitError::FileStructure {
                reference: listing.to_string(),
                output: output.diagnostic(),
            });
        }

        let names = parse_tree_listing(&output.text());
        debug!("Resolving {} entries of {}", names.len(), listing);

        stream::iter(names.into_iter().map(|name| {
            let reference = listing.child(&name);
            async move {
                let kind = self.object_kind(reference.to_string()).await?;
                Ok::<_, GitError>(FileEntry {
                    name,
                    reference,
                    is_dir: kind == ObjectKind::Tree,
                })
            }
        }))
        .buffered(self.config.type_query_concurrency)
        .try_collect()
        .await
    }

    /// Raw bytes of the blob at `reference`.
    pub async fn contents(&self, reference: &str, flags: &[&str]) -> GitResult<Vec<u8>> {
        let output = self
            .run(
                self.command()
                    .args(["cat-file", "-p"])
                    .args(flags)
                    .arg(reference),
            )
            .await?;

        if !output.success() {
            return Err(GitError::Contents {
                reference: reference.to_string(),
                output: output.diagnostic(),
            });
        }
        Ok(output.output)
    }

    /// Kind of the object `reference` resolves to, after normalization.
    pub async fn this_is(&self, reference: &str) -> GitResult<ObjectKind> {
        self.object_kind(normalize_ref(reference)).await
    }

    /// Type query for a ref that is already canonical. Entry refs built from
    /// a listing skip normalization so names keep their exact bytes.
    async fn object_kind(&self, reference: String) -> GitResult<ObjectKind> {
        let output = self
            .run(self.command().args(["cat-file", "-t"]).arg(&reference))
            .await?;

        if !output.success() {
            return Err(GitError::TypeQuery {
                reference,
                output: output.diagnostic(),
            });
        }

        let text = output.text();
        parse_object_kind(&text).ok_or_else(|| GitError::UnexpectedObjectKind {
            reference,
            kind: text.trim().to_string(),
        })
    }

    /// Opens whatever `reference` names: trees and commits as directory
    /// listings, blobs as their contents.
    pub async fn open(&self, reference: &str) -> GitResult<Opened> {
        let normalized = normalize_ref(reference);
        let target = TreePath::parse(&normalized);
        let kind = self.this_is(&normalized).await?;
        debug!("{} is a {}", normalized, kind);

        match kind {
            ObjectKind::Tree | ObjectKind::Commit => Ok(Opened::Directory(
                self.file_structure(&target.base, &target.path, &[]).await?,
            )),
            ObjectKind::Blob => Ok(Opened::Blob(self.contents(&normalized, &[]).await?)),
        }
    }
}
