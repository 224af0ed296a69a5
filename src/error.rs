//! Error types for plugup
//!
//! All modules use `PlugupResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for plugup operations
pub type PlugupResult<T> = Result<T, PlugupError>;

/// All errors that can occur in plugup
#[derive(Error, Debug)]
pub enum PlugupError {
    // Upstream errors
    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Not found: {url}")]
    NotFound { url: String },

    #[error("Malformed upstream data from {context}: {reason}")]
    MalformedUpstream { context: String, reason: String },

    #[error("Failed to resolve plugin {plugin}: {source}")]
    Resolution {
        plugin: String,
        #[source]
        source: Box<PlugupError>,
    },

    #[error("{count} plugin(s) could not be downloaded")]
    FetchFailed { count: usize },

    // Input errors
    #[error("Invalid plugin spec '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },

    #[error("Failed to read plugin list {path}: {reason}")]
    PluginList { path: PathBuf, reason: String },

    #[error("Failed to read deprecation ledger {path}: {reason}")]
    DeprecationLedger { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // Version control errors
    #[error("Not in a git repository: {0}")]
    NotInGitRepo(PathBuf),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlugupError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a transient network error
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a malformed upstream data error
    pub fn malformed(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedUpstream {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an error raised while resolving one plugin
    pub fn resolution(plugin: impl Into<String>, source: PlugupError) -> Self {
        Self::Resolution {
            plugin: plugin.into(),
            source: Box::new(source),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Check if the upstream reported the resource as absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Network { .. } => {
                Some("Lower --proc or pass --github-token to avoid rate limiting")
            }
            Self::NotInGitRepo(_) => Some("Run from a git checkout or pass --no-commit"),
            Self::FetchFailed { .. } => Some("Re-run with -v to see which requests failed"),
            Self::CommandFailed { .. } => {
                Some("Make sure nix, nix-prefetch-git and nix-prefetch-url are on PATH")
            }
            _ => None,
        }
    }
}
