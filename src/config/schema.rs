//! Configuration schema for plugup
//!
//! Configuration is stored at `~/.config/plugup/config.toml`

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Which plugin set is being maintained
    pub editor: EditorConfig,

    /// Network and concurrency settings
    pub fetch: FetchSettings,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Editor whose plugin set is updated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Editor name, e.g. "vim" or "kakoune"
    pub name: String,

    /// Directory holding the editor's plugin files
    pub root: PathBuf,

    /// Declared plugin list (defaults to `<root>/<name>-plugin-names`)
    pub input: Option<PathBuf>,

    /// Generated output (defaults to `<root>/generated.nix`)
    pub output: Option<PathBuf>,

    /// Deprecation ledger (defaults to `<root>/deprecated.json`)
    pub deprecated: Option<PathBuf>,

    /// Cache file name under the cache directory
    pub cache_file: Option<String>,

    /// Nix expression evaluating to the currently packaged plugins
    pub get_plugins: String,

    /// Whether a freshly added plugin can be updated on its own
    pub supports_partial_add: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            name: "vim".to_string(),
            root: PathBuf::from("."),
            input: None,
            output: None,
            deprecated: None,
            cache_file: None,
            get_plugins: String::new(),
            supports_partial_add: true,
        }
    }
}

impl EditorConfig {
    /// Declared plugin list path
    pub fn input_path(&self) -> PathBuf {
        self.input
            .clone()
            .unwrap_or_else(|| self.root.join(format!("{}-plugin-names", self.name)))
    }

    /// Generated output path
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.root.join("generated.nix"))
    }

    /// Deprecation ledger path
    pub fn deprecated_path(&self) -> PathBuf {
        self.deprecated
            .clone()
            .unwrap_or_else(|| self.root.join("deprecated.json"))
    }

    /// Cache file name
    pub fn cache_file_name(&self) -> String {
        self.cache_file
            .clone()
            .unwrap_or_else(|| format!("{}-plugin-cache.json", self.name))
    }

    /// Attribute set the plugins live in, e.g. `vimPlugins`
    pub fn attr_path(&self) -> String {
        format!("{}Plugins", self.name)
    }

    /// Full attribute name of one plugin
    pub fn drv_name(&self, plugin: &str) -> String {
        format!("{}.{}", self.attr_path(), plugin)
    }
}

/// Fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Number of plugins resolved concurrently
    pub proc: usize,

    /// Attempts per upstream request
    pub retry_attempts: u32,

    /// Delay before the first retry, in seconds
    pub retry_delay_secs: u64,

    /// Delay multiplier between retries
    pub retry_backoff: u32,

    /// Per-request timeout, in seconds
    pub http_timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            proc: 30,
            retry_attempts: 4,
            retry_delay_secs: 3,
            retry_backoff: 2,
            http_timeout_secs: 10,
        }
    }
}

impl FetchSettings {
    /// Retry policy described by these settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts.max(1),
            Duration::from_secs(self.retry_delay_secs),
            self.retry_backoff.max(1),
        )
    }
}
