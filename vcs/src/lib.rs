pub mod client;
pub mod config;
pub mod local;
pub mod parse;
pub mod runner;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{Git, GitError, GitResult};
pub use config::GitConfig;
pub use local::{GitLocal, RepositoryBrowser};
pub use parse::{
    log_format, normalize_ref, parse_branches, parse_log, parse_object_kind, parse_tree_listing,
};
pub use runner::{
    Capture, CommandOutput, CommandRunner, CommandSpec, ProcessRunner, RunnerError, RunnerResult,
};
pub use types::{Branch, Commit, FileEntry, ObjectKind, Opened, Ref, Signature, TreePath};

pub mod prelude {
    pub use crate::client::*;
    pub use crate::config::*;
    pub use crate::local::*;
    pub use crate::runner::*;
    pub use crate::types::*;
}
