pub mod config;
pub mod view;

use thiserror::Error;
use vcs::GitError;

pub use config::BrowserConfig;
pub use view::{
    build_page, BlobView, BranchView, Breadcrumb, CommitInfo, CommitView, ContentKind, Contents,
    EntryView, Page, RepositoryPage,
};

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Repository error: {0}")]
    Git(#[from] GitError),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to parse configuration: {0}")]
    ConfigFormat(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Nothing found at '{reference}'")]
    NotFound { reference: String },
}

pub type BrowserResult<T> = Result<T, BrowserError>;
