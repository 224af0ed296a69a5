//! Persistent commit → plugin cache
//!
//! Resolved plugins are keyed by commit, so an unchanged upstream never has
//! to be hashed twice. Entries are never invalidated: a commit's content
//! cannot change. The cache is seeded from the currently packaged plugins,
//! overlaid with the cache file, and written back once per run.

use crate::error::{PlugupError, PlugupResult};
use crate::persist::{to_sorted_json, write_atomic};
use crate::plugin::Plugin;
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Commit-keyed store of resolved plugins
#[derive(Debug, Clone, Default)]
pub struct Cache {
    path: Option<PathBuf>,
    downloads: HashMap<String, Plugin>,
}

impl Cache {
    /// Resolve `<cache home>/<file_name>` from `XDG_CACHE_HOME` or `HOME`
    pub fn default_path(file_name: &str) -> Option<PathBuf> {
        cache_path_from(
            file_name,
            std::env::var_os("XDG_CACHE_HOME"),
            std::env::var_os("HOME"),
        )
    }

    /// Seed with `initial` plugins, then overlay entries stored at `path`.
    ///
    /// With no path the cache lives in memory only. An unreadable cache
    /// file is ignored with a warning; it only costs extra downloads.
    pub fn load(initial: &[Plugin], path: Option<PathBuf>) -> Self {
        let mut downloads: HashMap<String, Plugin> = initial
            .iter()
            .map(|p| (p.commit.clone(), p.clone()))
            .collect();

        if let Some(file) = path.as_deref() {
            match read_entries(file) {
                Ok(stored) => {
                    debug!("Loaded {} cached plugins from {}", stored.len(), file.display());
                    downloads.extend(stored);
                }
                Err(e) => warn!("Ignoring unreadable cache {}: {}", file.display(), e),
            }
        }

        Self { path, downloads }
    }

    /// Cached plugin for `commit`
    pub fn get(&self, commit: &str) -> Option<&Plugin> {
        self.downloads.get(commit)
    }

    /// Remember a resolved plugin under its commit
    pub fn insert(&mut self, plugin: Plugin) {
        self.downloads.insert(plugin.commit.clone(), plugin);
    }

    /// Number of cached commits
    pub fn len(&self) -> usize {
        self.downloads.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.downloads.is_empty()
    }

    /// File the cache is persisted to
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write every entry back to the cache file, sorted by commit
    pub fn store(&self) -> PlugupResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let sorted: BTreeMap<&String, &Plugin> = self.downloads.iter().collect();
        let json = to_sorted_json(&sorted)?;
        write_atomic(path, &json)?;
        debug!("Stored {} cached plugins in {}", sorted.len(), path.display());
        Ok(())
    }
}

fn cache_path_from(
    file_name: &str,
    xdg_cache: Option<OsString>,
    home: Option<OsString>,
) -> Option<PathBuf> {
    let root = match xdg_cache.filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(home.filter(|v| !v.is_empty())?).join(".cache"),
    };
    Some(root.join(file_name))
}

fn read_entries(path: &Path) -> PlugupResult<HashMap<String, Plugin>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| PlugupError::io(format!("reading {}", path.display()), e))?;
    let stored: HashMap<String, Plugin> = serde_json::from_str(&content)?;

    // Entries are keyed by their recorded commit
    Ok(stored
        .into_values()
        .map(|p| (p.commit.clone(), p))
        .collect())
}
