use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of object a ref resolves to, as reported by `cat-file -t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Tree,
    Blob,
    Commit,
}

impl ObjectKind {
    /// Maps the single-word type name onto a kind. Anything else, including
    /// `tag`, is not a kind this crate knows how to open.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "tree" => Some(Self::Tree),
            "blob" => Some(Self::Blob),
            "commit" => Some(Self::Commit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A movable branch pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    /// Whether the listing line carried the current-branch marker.
    pub is_current: bool,
}

impl Branch {
    pub fn new(name: impl Into<String>, is_current: bool) -> Self {
        Self {
            name: name.into(),
            is_current,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Author or committer of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Raw `<unix-seconds> <+hhmm>` timestamp, not localized.
    pub date: String,
}

impl Signature {
    /// The raw date as a point in time at its own offset.
    pub fn datetime(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_str(self.date.trim(), "%s %z").ok()
    }
}

/// One record of the commit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub commit: String,
    pub abbreviated_commit: String,
    /// Decorations, e.g. `HEAD -> master, tag: v1`.
    pub refs: String,
    pub subject: String,
    pub body: String,
    pub author: Signature,
    pub committer: Signature,
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.abbreviated_commit, self.subject)
    }
}

/// `<base>:<path>` compound reference to an object inside a tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreePath {
    pub base: String,
    pub path: String,
}

impl TreePath {
    pub fn new(base: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            path: path.into(),
        }
    }

    /// Splits on the first `:`. A ref without one addresses the root.
    pub fn parse(reference: &str) -> Self {
        match reference.split_once(':') {
            Some((base, path)) => Self::new(base, path),
            None => Self::new(reference, ""),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.path.as_str(), "" | "." | "./" | "/")
    }

    /// The compound ref of an entry directly below this one.
    pub fn child(&self, name: &str) -> Self {
        if self.is_root() {
            Self::new(self.base.clone(), name)
        } else {
            Self::new(
                self.base.clone(),
                format!("{}/{}", self.path.trim_end_matches('/'), name),
            )
        }
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.base, self.path)
    }
}

/// Anything the client hands back that names an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Ref {
    Branch(Branch),
    Commit(Box<Commit>),
    Path(TreePath),
}

impl Ref {
    /// The form a user would type: branch name, abbreviated hash, or
    /// `base:path`.
    pub fn short_name(&self) -> String {
        match self {
            Ref::Branch(branch) => branch.name.clone(),
            Ref::Commit(commit) => commit.abbreviated_commit.clone(),
            Ref::Path(path) => path.to_string(),
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ref::Branch(branch) => branch.fmt(f),
            Ref::Commit(commit) => f.write_str(&commit.commit),
            Ref::Path(path) => path.fmt(f),
        }
    }
}

impl From<Branch> for Ref {
    fn from(branch: Branch) -> Self {
        Ref::Branch(branch)
    }
}

impl From<Commit> for Ref {
    fn from(commit: Commit) -> Self {
        Ref::Commit(Box::new(commit))
    }
}

impl From<TreePath> for Ref {
    fn from(path: TreePath) -> Self {
        Ref::Path(path)
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Bare name, never containing a path separator.
    pub name: String,
    pub reference: TreePath,
    pub is_dir: bool,
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Result of opening a ref: a directory listing or raw blob bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opened {
    Directory(Vec<FileEntry>),
    Blob(Vec<u8>),
}

impl Opened {
    pub fn is_directory(&self) -> bool {
        matches!(self, Opened::Directory(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_kind_names() {
        assert_eq!(ObjectKind::from_type_name("tree"), Some(ObjectKind::Tree));
        assert_eq!(ObjectKind::from_type_name("blob"), Some(ObjectKind::Blob));
        assert_eq!(ObjectKind::from_type_name("commit"), Some(ObjectKind::Commit));
        assert_eq!(ObjectKind::from_type_name("tag"), None);
        assert_eq!(ObjectKind::from_type_name("Blob"), None);
        assert_eq!(ObjectKind::Blob.to_string(), "blob");
    }

    #[test]
    fn test_signature_datetime() {
        let signature = Signature {
            name: "dezmound".to_string(),
            email: "dez@example.com".to_string(),
            date: "1521968185 +0300".to_string(),
        };
        let datetime = signature.datetime().unwrap();
        assert_eq!(datetime.to_rfc3339(), "2018-03-25T11:56:25+03:00");

        let garbled = Signature {
            date: "Sun Mar 25".to_string(),
            ..signature
        };
        assert!(garbled.datetime().is_none());
    }

    #[test]
    fn test_tree_path_parse_and_display() {
        let path = TreePath::parse("HEAD:.dir/dir1");
        assert_eq!(path.base, "HEAD");
        assert_eq!(path.path, ".dir/dir1");
        assert_eq!(path.to_string(), "HEAD:.dir/dir1");

        let root = TreePath::parse("master");
        assert!(root.is_root());
        assert_eq!(root.to_string(), "master:");
    }

    #[test]
    fn test_tree_path_child() {
        assert_eq!(TreePath::new("HEAD", "").child(".0").to_string(), "HEAD:.0");
        assert_eq!(TreePath::new("HEAD", ".").child(".0").to_string(), "HEAD:.0");
        assert_eq!(
            TreePath::new("HEAD", ".dir/").child("dir1").to_string(),
            "HEAD:.dir/dir1"
        );
    }

    #[test]
    fn test_ref_display() {
        let branch = Ref::from(Branch::new("test", false));
        assert_eq!(branch.to_string(), "test");

        let path = Ref::from(TreePath::new("abc123", "src"));
        assert_eq!(path.to_string(), "abc123:src");

        let entry = FileEntry {
            name: ".dir".to_string(),
            reference: TreePath::new("HEAD", ".dir"),
            is_dir: true,
        };
        assert_eq!(entry.to_string(), ".dir");
    }

    #[test]
    fn test_ref_short_name() {
        let signature = Signature {
            name: "A".to_string(),
            email: "a@x".to_string(),
            date: "1 +0000".to_string(),
        };
        let commit = Ref::from(Commit {
            commit: "12f86dcb791830fd038466b55a16cd0097bc065e".to_string(),
            abbreviated_commit: "12f86dc".to_string(),
            refs: String::new(),
            subject: "README #7".to_string(),
            body: String::new(),
            author: signature.clone(),
            committer: signature,
        });
        assert_eq!(commit.short_name(), "12f86dc");
        assert_eq!(commit.to_string(), "12f86dcb791830fd038466b55a16cd0097bc065e");
        assert_eq!(Ref::from(Branch::new("c++", true)).short_name(), "c++");
        assert_eq!(Ref::from(TreePath::new("HEAD", ".dir")).short_name(), "HEAD:.dir");
    }
}
