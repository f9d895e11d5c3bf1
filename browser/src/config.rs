use crate::{BrowserError, BrowserResult};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use vcs::GitConfig;

/// Environment variable naming the repository to browse.
pub const REPO_ENV: &str = "GIT_REPO";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Application name shown on every page.
    pub name: String,
    pub repo: PathBuf,
    /// `chrono` strftime pattern for commit dates.
    pub date_format: String,
    pub timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            name: "Git Local".to_string(),
            repo: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            date_format: "%Y-%m-%d %H:%M".to_string(),
            timeout_secs: 30,
        }
    }
}

impl BrowserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, repo: impl Into<PathBuf>) -> Self {
        self.repo = repo.into();
        self
    }

    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    pub fn from_toml_str(text: &str) -> BrowserResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> BrowserResult<Self> {
        debug!("Loading configuration from {}", path.display());
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Configuration file (or defaults) with [`REPO_ENV`] applied on top.
    pub fn load(path: Option<&Path>) -> BrowserResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.apply_repo_override(std::env::var(REPO_ENV).ok()))
    }

    /// Replaces the repository location when `repo` is set and non-empty.
    pub fn apply_repo_override(mut self, repo: Option<impl Into<PathBuf>>) -> Self {
        if let Some(repo) = repo.map(Into::into) {
            if !repo.as_os_str().is_empty() {
                self.repo = repo;
            }
        }
        self
    }

    pub fn git_config(&self) -> GitConfig {
        GitConfig::new()
            .with_working_dir(&self.repo)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.repo.as_os_str().is_empty() {
            return Err("Repository path cannot be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(format!("Invalid date format '{}'", self.date_format));
        }

        Ok(())
    }

    pub fn validated(self) -> BrowserResult<Self> {
        self.validate()
            .map_err(|message| BrowserError::InvalidConfig { message })?;
        Ok(self)
    }
}
