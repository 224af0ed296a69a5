//! Reconciling fetch results with the known plugin set

use crate::error::{PlugupError, PlugupResult};
use crate::orchestrator::FetchResult;
use crate::plugin::{Plugin, PluginDesc};
use crate::repo::SourceRepo;
use crate::ui::{self, UiContext};
use std::collections::{BTreeMap, HashMap};
use tracing::error;

/// Original description → repository it now resolves to
pub type Redirects = HashMap<PluginDesc, SourceRepo>;

/// Result of overlaying a partial fetch onto the known set
#[derive(Debug)]
pub struct Merged {
    /// One entry per normalized name, sorted by it
    pub results: Vec<FetchResult>,
    /// Names whose fetch failed and kept their previous value
    pub failed: Vec<String>,
}

/// Overlay `fetched` onto `current`, keyed by normalized name.
///
/// Successful fetches replace the known entry. Failed fetches are logged
/// and leave the known entry in place, so the merged set still covers
/// every current plugin.
pub fn merge_results(current: &[(PluginDesc, Plugin)], fetched: Vec<FetchResult>) -> Merged {
    let mut merged: BTreeMap<String, FetchResult> = current
        .iter()
        .map(|(desc, plugin)| {
            (
                plugin.normalized_name(),
                FetchResult {
                    desc: desc.clone(),
                    outcome: Ok(plugin.clone()),
                    redirect: None,
                },
            )
        })
        .collect();

    let mut failed = Vec::new();
    for result in fetched {
        match &result.outcome {
            Ok(plugin) => {
                merged.insert(plugin.normalized_name(), result);
            }
            Err(e) => {
                error!("Error fetching plugin {}: {}", result.desc.name(), e);
                failed.push(result.desc.name().to_string());
            }
        }
    }

    Merged {
        results: merged.into_values().collect(),
        failed,
    }
}

/// Split a batch into resolved plugins and redirects.
///
/// Any failure makes the whole batch fatal: every failed plugin is
/// reported and `FetchFailed` is returned. Redirected plugins are paired
/// with a description pointing at their new repository. Plugins come back
/// sorted by normalized name.
pub fn check_results(
    ctx: &UiContext,
    results: Vec<FetchResult>,
) -> PlugupResult<(Vec<(PluginDesc, Plugin)>, Redirects)> {
    let mut plugins = Vec::with_capacity(results.len());
    let mut redirects = Redirects::new();
    let mut failures = Vec::new();

    for FetchResult {
        desc,
        outcome,
        redirect,
    } in results
    {
        match outcome {
            Ok(plugin) => {
                let paired = match redirect {
                    Some(repo) => {
                        let moved = desc.redirected(repo.clone());
                        redirects.insert(desc, repo);
                        moved
                    }
                    None => desc,
                };
                plugins.push((paired, plugin));
            }
            Err(e) => failures.push((desc, e)),
        }
    }

    if !failures.is_empty() {
        error!("{} plugin(s) could not be downloaded", failures.len());
        for (desc, e) in &failures {
            ui::step_error_detail(ctx, &desc.to_string(), &failure_detail(e));
        }
        return Err(PlugupError::FetchFailed {
            count: failures.len(),
        });
    }

    plugins.sort_by_key(|(_, plugin)| plugin.normalized_name());
    Ok((plugins, redirects))
}

/// Error text without the `Resolution` wrapper repeating the plugin
fn failure_detail(e: &PlugupError) -> String {
    match e {
        PlugupError::Resolution { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(repo: &str) -> PluginDesc {
        PluginDesc::from_record(repo, "HEAD", "", None)
    }

    fn plugin(name: &str, hash: &str) -> Plugin {
        Plugin::new(name, format!("{name}-commit"), false, hash, None)
    }

    fn ok(desc: PluginDesc, plugin: Plugin) -> FetchResult {
        FetchResult {
            desc,
            outcome: Ok(plugin),
            redirect: None,
        }
    }

    fn failed(desc: PluginDesc) -> FetchResult {
        let name = desc.to_string();
        FetchResult {
            desc,
            outcome: Err(PlugupError::resolution(name, PlugupError::network("u", "reset"))),
            redirect: None,
        }
    }

    #[test]
    fn merge_replaces_fetched_and_keeps_rest() {
        let current = vec![
            (desc("foo/p1"), plugin("p1", "old")),
            (desc("foo/p2"), plugin("p2", "h2")),
        ];
        let fetched = vec![ok(desc("foo/p1"), plugin("p1", "new"))];

        let merged = merge_results(&current, fetched);
        assert!(merged.failed.is_empty());
        let hashes: Vec<_> = merged
            .results
            .iter()
            .map(|r| r.outcome.as_ref().unwrap().content_hash.as_str())
            .collect();
        assert_eq!(hashes, ["new", "h2"]);
    }

    #[test]
    fn merge_keys_by_normalized_name() {
        let current = vec![(desc("foo/nvim.lua"), plugin("nvim.lua", "old"))];
        let fetched = vec![ok(desc("foo/nvim-lua"), plugin("nvim-lua", "new"))];

        let merged = merge_results(&current, fetched);
        assert_eq!(merged.results.len(), 1);
        assert_eq!(merged.results[0].outcome.as_ref().unwrap().content_hash, "new");
    }

    #[test]
    fn merge_keeps_prior_value_on_failure() {
        let current = vec![(desc("foo/p1"), plugin("p1", "old"))];
        let merged = merge_results(&current, vec![failed(desc("foo/p1"))]);

        assert_eq!(merged.failed, ["p1"]);
        assert_eq!(merged.results.len(), 1);
        assert_eq!(merged.results[0].outcome.as_ref().unwrap().content_hash, "old");
    }

    #[test]
    fn check_substitutes_redirect_target() {
        let original = desc("foo/bar");
        let moved = SourceRepo::from_uri("baz/bar", "HEAD");
        let results = vec![FetchResult {
            desc: original.clone(),
            outcome: Ok(plugin("bar", "h")),
            redirect: Some(moved.clone()),
        }];

        let (plugins, redirects) = check_results(&UiContext::non_interactive(), results).unwrap();
        assert_eq!(redirects.len(), 1);
        assert_eq!(redirects.get(&original), Some(&moved));
        assert_eq!(plugins[0].0.repo, moved);
        assert_eq!(plugins[0].0.branch, "HEAD");
    }

    #[test]
    fn check_sorts_by_normalized_name() {
        let results = vec![
            ok(desc("foo/zeta"), plugin("zeta", "h")),
            ok(desc("foo/alpha"), plugin("alpha", "h")),
        ];
        let (plugins, redirects) = check_results(&UiContext::non_interactive(), results).unwrap();
        assert!(redirects.is_empty());
        assert_eq!(plugins[0].1.name, "alpha");
        assert_eq!(plugins[1].1.name, "zeta");
    }

    #[test]
    fn any_failure_is_fatal() {
        let results = vec![
            ok(desc("foo/good"), plugin("good", "h")),
            failed(desc("foo/bad")),
        ];
        let err = check_results(&UiContext::non_interactive(), results).unwrap_err();
        assert!(matches!(err, PlugupError::FetchFailed { count: 1 }));
    }
}
