//! Page view models
//!
//! Turns what the repository adapter returns for `/<ref>:<path>` into a
//! serializable page: breadcrumbs, a directory listing or blob view, the
//! branch and commit lists, and the last commit. Any failure while loading
//! renders [`Page::NotFound`].

use crate::config::BrowserConfig;
use crate::{BrowserError, BrowserResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::{debug, warn};
use vcs::{Branch, Commit, FileEntry, Opened, Ref, RepositoryBrowser, Signature};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub title: String,
    /// `None` for the last segment, which is the page itself.
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    pub name: String,
    pub is_dir: bool,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchView {
    pub name: String,
    pub href: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitView {
    pub name: String,
    pub href: String,
    pub is_active: bool,
    pub abbr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub commit: String,
    pub abbr: String,
    pub subject: String,
    pub body: String,
    pub author: String,
    pub email: String,
    pub date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Image,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobView {
    pub kind: ContentKind,
    pub mime: Option<String>,
    /// Decoded contents, only for text blobs.
    pub text: Option<String>,
    /// Base64 payload, only for images, ready for a `data:` URL.
    pub data: Option<String>,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Contents {
    Directory { entries: Vec<EntryView> },
    Blob(BlobView),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryPage {
    pub name: String,
    pub reference: String,
    pub path: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub contents: Contents,
    pub branches: Vec<BranchView>,
    pub commits: Vec<CommitView>,
    pub commit_info: CommitInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum Page {
    Repository(Box<RepositoryPage>),
    NotFound { reference: String },
}

impl Page {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Page::NotFound { .. })
    }
}

/// Builds the page for `/<reference>:<path>`; `path` defaults to the root.
pub async fn build_page(
    repo: &dyn RepositoryBrowser,
    config: &BrowserConfig,
    reference: &str,
    path: Option<&str>,
) -> Page {
    let path = path.filter(|p| !p.is_empty()).unwrap_or("./");
    match load_page(repo, config, reference, path).await {
        Ok(page) => Page::Repository(Box::new(page)),
        Err(e) => {
            warn!("Rendering not found for {}:{}: {}", reference, path, e);
            Page::NotFound {
                reference: format!("{}:{}", reference, path),
            }
        }
    }
}

async fn load_page(
    repo: &dyn RepositoryBrowser,
    config: &BrowserConfig,
    reference: &str,
    path: &str,
) -> BrowserResult<RepositoryPage> {
    if reference.trim().is_empty() {
        return Err(BrowserError::NotFound {
            reference: reference.to_string(),
        });
    }

    let opened = repo.open(&format!("{}:{}", reference, path)).await?;
    let latest = repo.latest_commit(reference).await?;
    let branches = repo.branches().await?;
    let history = repo.commit_history(reference).await?;

    let segments = segments(path);
    debug!(
        "Building page for {} with {} path segments",
        reference,
        segments.len()
    );

    let contents = match opened {
        Opened::Directory(entries) => Contents::Directory {
            entries: directory_entries(reference, &segments, &entries),
        },
        Opened::Blob(bytes) => Contents::Blob(blob_view(&bytes)),
    };

    Ok(RepositoryPage {
        name: config.name.clone(),
        reference: reference.to_string(),
        path: path.to_string(),
        breadcrumbs: breadcrumbs(reference, &segments),
        contents,
        branches: branch_views(reference, &branches),
        commits: commit_views(reference, &history),
        commit_info: commit_info(&latest, &config.date_format),
    })
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect()
}

pub fn breadcrumbs(reference: &str, segments: &[&str]) -> Vec<Breadcrumb> {
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| Breadcrumb {
            title: segment.to_string(),
            href: (i + 1 < segments.len())
                .then(|| format!("/{}:./{}/", reference, segments[..=i].join("/"))),
        })
        .collect()
}

pub fn directory_entries(
    reference: &str,
    segments: &[&str],
    entries: &[FileEntry],
) -> Vec<EntryView> {
    let parent = segments[..segments.len().saturating_sub(1)].join("/");
    let prefix = if segments.is_empty() {
        "./".to_string()
    } else {
        format!("{}/", segments.join("/"))
    };

    std::iter::once(EntryView {
        name: "..".to_string(),
        is_dir: true,
        href: format!("/{}:{}", reference, parent),
    })
    .chain(entries.iter().map(|entry| EntryView {
        name: entry.name.clone(),
        is_dir: entry.is_dir,
        href: format!(
            "/{}:{}{}{}",
            reference,
            prefix,
            entry.name,
            if entry.is_dir { "/" } else { "" }
        ),
    }))
    .collect()
}

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"\x1a\x45\xdf\xa3", "video/webm"),
];

pub fn blob_view(bytes: &[u8]) -> BlobView {
    if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| bytes.starts_with(magic)) {
        return BlobView {
            kind: ContentKind::Image,
            mime: Some(mime.to_string()),
            text: None,
            data: Some(STANDARD.encode(bytes)),
            size: bytes.len(),
        };
    }

    match std::str::from_utf8(bytes) {
        Ok(text) if !text.contains('\0') => BlobView {
            kind: ContentKind::Text,
            mime: None,
            text: Some(text.to_string()),
            data: None,
            size: bytes.len(),
        },
        _ => BlobView {
            kind: ContentKind::Binary,
            mime: None,
            text: None,
            data: None,
            size: bytes.len(),
        },
    }
}

/// Page link for a ref; commits link by their abbreviated hash.
pub fn href(reference: &Ref) -> String {
    format!("/{}", reference.short_name())
}

pub fn branch_views(reference: &str, branches: &[Branch]) -> Vec<BranchView> {
    let on_head = reference.eq_ignore_ascii_case("HEAD");
    branches
        .iter()
        .map(|branch| BranchView {
            name: branch.name.clone(),
            href: href(&Ref::from(branch.clone())),
            is_active: branch.name.eq_ignore_ascii_case(reference)
                || (on_head && branch.is_current),
        })
        .collect()
}

pub fn commit_views(reference: &str, commits: &[Commit]) -> Vec<CommitView> {
    commits
        .iter()
        .map(|commit| CommitView {
            name: commit.subject.clone(),
            href: href(&Ref::from(commit.clone())),
            is_active: commit.abbreviated_commit.eq_ignore_ascii_case(reference),
            abbr: commit.abbreviated_commit.clone(),
        })
        .collect()
}

/// Formats the signature date at its own offset; an unparseable date is
/// shown raw.
pub fn format_date(signature: &Signature, date_format: &str) -> String {
    let Some(datetime) = signature.datetime() else {
        return signature.date.clone();
    };
    let mut formatted = String::new();
    match write!(formatted, "{}", datetime.format(date_format)) {
        Ok(()) => formatted,
        Err(_) => signature.date.clone(),
    }
}

pub fn commit_info(commit: &Commit, date_format: &str) -> CommitInfo {
    CommitInfo {
        commit: commit.commit.clone(),
        abbr: commit.abbreviated_commit.clone(),
        subject: commit.subject.clone(),
        body: commit.body.clone(),
        author: commit.author.name.clone(),
        email: commit.author.email.clone(),
        date: format_date(&commit.author, date_format),
    }
}
