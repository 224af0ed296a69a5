//! Declared plugin list and deprecation ledger
//!
//! The declared list is a headed CSV file with `repo,branch,alias` columns.
//! The ledger is a JSON object mapping a retired normalized name to its
//! replacement and the day the change was recorded.

use crate::error::{PlugupError, PlugupResult};
use crate::merge::Redirects;
use crate::orchestrator::{resolve_one, SharedCache};
use crate::persist::{to_sorted_json, write_atomic};
use crate::plugin::{AccessToken, PluginDesc};
use crate::upstream::FetchContext;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize)]
struct Record {
    repo: String,
    #[serde(default)]
    branch: String,
    #[serde(default)]
    alias: String,
}

/// Read the declared plugin list
pub fn load_plugins(path: &Path, token: Option<&AccessToken>) -> PlugupResult<Vec<PluginDesc>> {
    let list_error = |reason: String| PlugupError::PluginList {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| list_error(e.to_string()))?;

    reader
        .deserialize::<Record>()
        .map(|row| {
            let row = row.map_err(|e| list_error(e.to_string()))?;
            Ok(PluginDesc::from_record(&row.repo, &row.branch, &row.alias, token))
        })
        .collect()
}

/// Write the declared plugin list, sorted by plugin name
pub fn write_plugins(path: &Path, plugins: &[PluginDesc]) -> PlugupResult<()> {
    let mut sorted: Vec<&PluginDesc> = plugins.iter().collect();
    sorted.sort_by(|a, b| a.name().cmp(b.name()));

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(["repo", "branch", "alias"])?;
    for desc in sorted {
        writer.serialize(Record {
            repo: desc.repo.uri(),
            branch: desc.branch.clone(),
            alias: desc.alias.clone().unwrap_or_default(),
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PlugupError::Internal(format!("flushing plugin list: {e}")))?;
    let content = String::from_utf8(bytes)
        .map_err(|e| PlugupError::Internal(format!("non UTF-8 plugin list: {e}")))?;

    debug!("Writing into {}", path.display());
    write_atomic(path, &content)
}

/// Replacement recorded for a retired plugin name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deprecation {
    pub new: String,
    pub date: String,
}

/// Retired normalized name → replacement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeprecationLedger(pub BTreeMap<String, Deprecation>);

impl DeprecationLedger {
    /// Read the ledger; it must exist
    pub fn load(path: &Path) -> PlugupResult<Self> {
        let ledger_error = |reason: String| PlugupError::DeprecationLedger {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| ledger_error(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ledger_error(e.to_string()))
    }

    /// Record that `old` is now called `new`
    pub fn record(&mut self, old: String, new: String, date: String) {
        self.0.insert(old, Deprecation { new, date });
    }

    /// Write the ledger, key-sorted with a trailing newline
    pub fn store(&self, path: &Path) -> PlugupResult<()> {
        let mut json = to_sorted_json(self)?;
        json.push('\n');
        write_atomic(path, &json)
    }
}

/// Rewrite the declared list with `append` added and `redirects` applied.
///
/// Each redirect replaces the old entry with one pointing at the new
/// repository. When the move also changes the normalized name, the old
/// name is recorded in the deprecation ledger. The ledger is only read
/// when there are redirects.
pub async fn rewrite_input(
    ctx: &FetchContext,
    token: Option<&AccessToken>,
    input: &Path,
    deprecated: &Path,
    redirects: &Redirects,
    append: &[PluginDesc],
    cache: Option<&SharedCache>,
) -> PlugupResult<()> {
    info!("Rewriting input file {}", input.display());
    let mut plugins = load_plugins(input, token)?;
    plugins.extend_from_slice(append);

    if !redirects.is_empty() {
        debug!("Dealing with deprecated plugins listed in {}", deprecated.display());
        let mut ledger = DeprecationLedger::load(deprecated)?;
        let today = Local::now().format("%Y-%m-%d").to_string();

        let mut moves: Vec<_> = redirects.iter().collect();
        moves.sort_by(|a, b| a.0.name().cmp(b.0.name()));

        for (desc, new_repo) in moves {
            info!("Resolving deprecated plugin {} -> {}", desc.name(), new_repo.name());
            let new_desc = desc.redirected(new_repo.clone());

            let (old_plugin, _) = resolve_one(ctx, desc, cache).await?;
            let (new_plugin, _) = resolve_one(ctx, &new_desc, cache).await?;

            let (old_name, new_name) = (old_plugin.normalized_name(), new_plugin.normalized_name());
            if old_name != new_name {
                ledger.record(old_name, new_name, today.clone());
            }

            if let Some(i) = plugins.iter().position(|p| p.name() == desc.name()) {
                plugins.remove(i);
            }
            plugins.push(new_desc);
        }

        ledger.store(deprecated)?;
    }

    write_plugins(input, &plugins)
}
