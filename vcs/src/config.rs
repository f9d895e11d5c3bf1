use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Executable used when none is configured.
pub const DEFAULT_PROGRAM: &str = "git";

/// Configuration for a [`crate::Git`] client.
///
/// The command runner is not part of this struct: [`crate::Git::new`] uses
/// [`crate::ProcessRunner`], and [`crate::Git::with_runner`] takes any other
/// [`crate::CommandRunner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Executable name or path, `"git"` by default.
    pub program: String,
    /// Repository location every command runs in. Defaults to the current
    /// directory of the process.
    pub working_dir: PathBuf,
    /// Upper bound on how long a single spawned process may run.
    pub timeout: Duration,
    /// How many per-entry type queries `file_structure` keeps in flight.
    pub type_query_concurrency: usize,
    /// Extra environment passed to every spawned process.
    #[serde(default)]
    pub envs: Vec<(String, String)>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            timeout: Duration::from_secs(30),
            type_query_concurrency: 8,
            envs: Vec::new(),
        }
    }
}

impl GitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = working_dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_type_query_concurrency(mut self, concurrency: usize) -> Self {
        self.type_query_concurrency = concurrency;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.program.trim().is_empty() {
            return Err("Program cannot be empty".to_string());
        }

        if self.working_dir.as_os_str().is_empty() {
            return Err("Working directory cannot be empty".to_string());
        }

        if self.timeout.is_zero() {
            return Err("Timeout must be greater than 0".to_string());
        }

        if self.type_query_concurrency == 0 {
            return Err("Type query concurrency must be greater than 0".to_string());
        }

        Ok(())
    }
}
