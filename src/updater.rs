//! Update and add workflows for one editor's plugin set

use crate::cache::Cache;
use crate::config::schema::EditorConfig;
use crate::current::CurrentPlugins;
use crate::error::PlugupResult;
use crate::input::{load_plugins, rewrite_input};
use crate::merge::{check_results, merge_results, Redirects};
use crate::orchestrator::{resolve_one, shared, FetchOrchestrator, SharedCache};
use crate::plugin::{AccessToken, PluginDesc};
use crate::render::Renderer;
use crate::ui::{self, FetchProgress, UiContext};
use crate::upstream::FetchContext;
use crate::vcs::GitRepo;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Per-run settings, mostly from the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Declared plugin list
    pub input: PathBuf,
    /// Generated output
    pub output: PathBuf,
    /// Deprecation ledger
    pub deprecated: PathBuf,
    /// Checkout used for evaluation and commits
    pub nixpkgs: PathBuf,
    /// Concurrent resolutions
    pub proc: usize,
    /// Credential for the hosting service
    pub token: Option<AccessToken>,
    /// Commit the changed files afterwards
    pub autocommit: bool,
}

/// What one update pass did
#[derive(Debug)]
pub struct UpdateReport {
    /// Repositories found to have moved
    pub redirects: Redirects,
    /// Plugins resolved in this pass
    pub checked: usize,
    /// Plugins in the current set
    pub known: usize,
    /// Names whose targeted update failed and kept their old value
    pub failed: Vec<String>,
    /// Cache used by the pass
    pub cache: SharedCache,
}

/// Updater for one editor's plugin set
pub struct Editor {
    config: EditorConfig,
    ctx: FetchContext,
    current: Arc<dyn CurrentPlugins>,
    renderer: Arc<dyn Renderer>,
    ui: UiContext,
    cache_path: Option<PathBuf>,
}

impl Editor {
    /// Create an updater persisting its cache under the user cache directory
    pub fn new(
        config: EditorConfig,
        ctx: FetchContext,
        current: Arc<dyn CurrentPlugins>,
        renderer: Arc<dyn Renderer>,
        ui: UiContext,
    ) -> Self {
        let cache_path = Cache::default_path(&config.cache_file_name());
        Self {
            config,
            ctx,
            current,
            renderer,
            ui,
            cache_path,
        }
    }

    /// Persist the cache at `path`, or nowhere
    pub fn with_cache_path(mut self, path: Option<PathBuf>) -> Self {
        self.cache_path = path;
        self
    }

    /// Attribute set the plugins live in
    pub fn attr_path(&self) -> String {
        self.config.attr_path()
    }

    /// Resolve the declared plugins and regenerate the output.
    ///
    /// With `names`, only plugins whose normalized name is listed are
    /// resolved; the rest keep their current value and individual failures
    /// only produce a warning. Without names every declared plugin is
    /// resolved and any failure aborts before the output is written.
    pub async fn update_once(&self, opts: &RunOptions, names: &[String]) -> PlugupResult<UpdateReport> {
        let token = opts.token.as_ref();
        let current = self.current.current_plugins(token).await?;
        let specs = load_plugins(&opts.input, token)?;

        let known: Vec<_> = current.iter().map(|(_, plugin)| plugin.clone()).collect();
        let cache = shared(Cache::load(&known, self.cache_path.clone()));

        let to_update: Vec<PluginDesc> = if names.is_empty() {
            specs
        } else {
            specs
                .into_iter()
                .filter(|desc| names.contains(&desc.normalized_name()))
                .collect()
        };

        if to_update.is_empty() {
            error!(
                "After filtering on {} no plugins are left to update. Names must match the normalized names of entries in {}",
                names.join(", "),
                opts.input.display()
            );
            return Ok(UpdateReport {
                redirects: Redirects::new(),
                checked: 0,
                known: current.len(),
                failed: Vec::new(),
                cache,
            });
        }

        let progress = FetchProgress::new(&self.ui, to_update.len() as u64);
        let results = FetchOrchestrator::new(self.ctx.clone(), opts.proc)
            .with_progress(progress.bar())
            .resolve_many(to_update, &cache)
            .await;
        progress.finish();

        let checked = results.len();
        ui::step_info(&self.ui, &format!("{} of {} were checked", checked, current.len()));

        let (results, failed) = if names.is_empty() {
            (results, Vec::new())
        } else {
            let merged = merge_results(&current, results);
            (merged.results, merged.failed)
        };
        if !failed.is_empty() {
            ui::step_warn_hint(
                &self.ui,
                &format!("Kept previous version of {}", failed.join(", ")),
                "their update failed, see the log above",
            );
        }

        let (plugins, redirects) = check_results(&self.ui, results)?;
        self.renderer.write(&plugins, &opts.output)?;

        Ok(UpdateReport {
            redirects,
            checked,
            known: current.len(),
            failed,
            cache,
        })
    }

    /// Full update: resolve, rewrite the declared list, commit, and settle
    /// repository moves with a second pass.
    pub async fn update(&self, opts: &RunOptions, names: &[String]) -> PlugupResult<Redirects> {
        info!("Start updating plugins");
        if opts.proc > 1 && opts.token.is_none() {
            warn!("Parallel updates without a GitHub token may hit HTTP 429 rate limits");
            ui::step_warn_hint(
                &self.ui,
                "Parallel updates enabled without a GitHub token",
                "set --proc=1 or --github-token to avoid HTTP 429",
            );
        }

        let start = Instant::now();
        let report = self.update_once(opts, names).await?;
        ui::step_info(
            &self.ui,
            &format!("The plugin update took {:.2}s.", start.elapsed().as_secs_f64()),
        );

        rewrite_input(
            &self.ctx,
            opts.token.as_ref(),
            &opts.input,
            &opts.deprecated,
            &report.redirects,
            &[],
            Some(&report.cache),
        )
        .await?;

        if opts.autocommit {
            let updated = Utc::now().format("%Y-%m-%d");
            self.commit(
                opts,
                &format!("{}: update on {}", self.attr_path(), updated),
                &[opts.output.clone()],
            )
            .await?;
        }

        if !report.redirects.is_empty() {
            debug!("Updating again after {} redirects", report.redirects.len());
            self.update_once(opts, names).await?;
            if opts.autocommit {
                self.commit(
                    opts,
                    &format!("{}: resolve github repository redirects", self.attr_path()),
                    &[opts.output.clone(), opts.input.clone(), opts.deprecated.clone()],
                )
                .await?;
            }
        }

        Ok(report.redirects)
    }

    /// Add plugins given as `uri[@branch][ as alias]` lines
    pub async fn add(&self, opts: &RunOptions, specs: &[String]) -> PlugupResult<()> {
        debug!("Adding {} plugins", specs.len());
        for line in specs {
            let desc = PluginDesc::from_spec(line, opts.token.as_ref())?;
            debug!("Loaded {} as {}", line, desc);

            rewrite_input(
                &self.ctx,
                opts.token.as_ref(),
                &opts.input,
                &opts.deprecated,
                &Redirects::new(),
                std::slice::from_ref(&desc),
                None,
            )
            .await?;

            let (plugin, _) = resolve_one(&self.ctx, &desc, None).await?;
            let name = plugin.normalized_name();
            ui::step_ok_detail(&self.ui, &format!("Added {}", name), &plugin.commit);

            if self.config.supports_partial_add {
                self.update_once(opts, std::slice::from_ref(&name)).await?;
            }

            if opts.autocommit {
                self.commit(
                    opts,
                    &format!(
                        "{}: init at {}",
                        self.config.drv_name(&name),
                        plugin.version()?
                    ),
                    &[opts.output.clone(), opts.input.clone()],
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn commit(&self, opts: &RunOptions, message: &str, files: &[PathBuf]) -> PlugupResult<()> {
        let repo = GitRepo::discover(&opts.nixpkgs).await?;
        if repo.commit(message, files).await? {
            ui::step_ok_detail(&self.ui, "Committed to nixpkgs", message);
        } else {
            ui::step_info(&self.ui, "no changes in working tree to commit");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlugupError;
    use crate::input::DeprecationLedger;
    use crate::plugin::Plugin;
    use crate::render::NixRenderer;
    use crate::upstream::testing::{atom_feed, StubHost, StubPrefetcher};
    use async_trait::async_trait;
    use chrono::{FixedOffset, TimeZone};
    use tempfile::TempDir;

    const HEADER: &str = "repo,branch,alias\n";

    struct StubCurrent(Vec<(PluginDesc, Plugin)>);

    #[async_trait]
    impl CurrentPlugins for StubCurrent {
        async fn current_plugins(
            &self,
            _token: Option<&AccessToken>,
        ) -> PlugupResult<Vec<(PluginDesc, Plugin)>> {
            Ok(self.0.clone())
        }
    }

    fn feed(name: &str) -> String {
        format!("https://github.com/foo/{name}/commits/HEAD.atom")
    }

    fn archive(name: &str, commit: &str) -> String {
        format!("https://github.com/foo/{name}/archive/{commit}.tar.gz")
    }

    fn known(name: &str, commit: &str, hash: &str) -> (PluginDesc, Plugin) {
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2023, 6, 1, 0, 0, 0)
            .unwrap();
        (
            PluginDesc::from_record(&format!("foo/{name}"), "HEAD", "", None),
            Plugin::new(name, commit, false, hash, Some(date)),
        )
    }

    struct Fixture {
        _dir: TempDir,
        opts: RunOptions,
    }

    fn fixture(declared: &[&str]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let mut list = HEADER.to_string();
        for name in declared {
            list.push_str(&format!("https://github.com/foo/{name}/,HEAD,\n"));
        }
        std::fs::write(dir.path().join("names"), list).unwrap();
        std::fs::write(dir.path().join("deprecated.json"), "{}\n").unwrap();

        let opts = RunOptions {
            input: dir.path().join("names"),
            output: dir.path().join("generated.nix"),
            deprecated: dir.path().join("deprecated.json"),
            nixpkgs: dir.path().to_path_buf(),
            proc: 1,
            token: None,
            autocommit: false,
        };
        Fixture { _dir: dir, opts }
    }

    fn editor(host: StubHost, prefetcher: StubPrefetcher, current: Vec<(PluginDesc, Plugin)>) -> Editor {
        Editor::new(
            EditorConfig::default(),
            host.context(prefetcher),
            Arc::new(StubCurrent(current)),
            Arc::new(NixRenderer::for_editor("vim")),
            UiContext::non_interactive(),
        )
        .with_cache_path(None)
    }

    fn output(fx: &Fixture) -> String {
        std::fs::read_to_string(&fx.opts.output).unwrap()
    }

    #[tokio::test]
    async fn full_update_writes_output() {
        let fx = fixture(&["bar"]);
        let host = StubHost::new().with_page(&feed("bar"), &feed("bar"), atom_feed("abc123", "2024-01-01T00:00:00Z"));
        let prefetcher = StubPrefetcher::new().with_archive(&archive("bar", "abc123"), "sha-xyz");

        let redirects = editor(host, prefetcher, vec![])
            .update(&fx.opts, &[])
            .await
            .unwrap();

        assert!(redirects.is_empty());
        let nix = output(&fx);
        assert!(nix.contains("bar = buildVimPlugin"));
        assert!(nix.contains("version = \"2024-01-01\";"));
        assert!(nix.contains("sha256 = \"sha-xyz\";"));
    }

    #[tokio::test]
    async fn full_update_failure_leaves_output_untouched() {
        let fx = fixture(&["bar", "broken"]);
        std::fs::write(&fx.opts.output, "previous").unwrap();
        let host = StubHost::new()
            .with_page(&feed("bar"), &feed("bar"), atom_feed("abc123", "2024-01-01T00:00:00Z"))
            .with_network_error(&feed("broken"));
        let prefetcher = StubPrefetcher::new().with_archive(&archive("bar", "abc123"), "sha-xyz");

        let err = editor(host, prefetcher, vec![])
            .update(&fx.opts, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, PlugupError::FetchFailed { count: 1 }));
        assert_eq!(output(&fx), "previous");
    }

    #[tokio::test]
    async fn targeted_update_keeps_other_plugins() {
        let fx = fixture(&["bar", "baz"]);
        let host = StubHost::new().with_page(&feed("bar"), &feed("bar"), atom_feed("new111", "2024-01-01T00:00:00Z"));
        let prefetcher = StubPrefetcher::new().with_archive(&archive("bar", "new111"), "sha-new");
        let current = vec![known("bar", "old000", "sha-old"), known("baz", "baz000", "sha-baz")];

        let report = editor(host, prefetcher, current)
            .update_once(&fx.opts, &["bar".to_string()])
            .await
            .unwrap();

        assert_eq!((report.checked, report.known), (1, 2));
        let nix = output(&fx);
        assert!(nix.contains("sha-new"));
        assert!(nix.contains("sha-baz"));
        assert!(!nix.contains("sha-old"));
    }

    #[tokio::test]
    async fn targeted_update_failure_keeps_prior_value() {
        let fx = fixture(&["bar", "baz"]);
        let host = StubHost::new().with_network_error(&feed("bar"));
        let current = vec![known("bar", "old000", "sha-old"), known("baz", "baz000", "sha-baz")];

        let report = editor(host, StubPrefetcher::new(), current)
            .update_once(&fx.opts, &["bar".to_string()])
            .await
            .unwrap();

        assert_eq!(report.failed, ["bar"]);
        assert!(output(&fx).contains("sha-old"));
    }

    #[tokio::test]
    async fn unmatched_filter_is_not_fatal() {
        let fx = fixture(&["bar"]);
        let report = editor(StubHost::new(), StubPrefetcher::new(), vec![])
            .update_once(&fx.opts, &["nope".to_string()])
            .await
            .unwrap();

        assert!(report.redirects.is_empty());
        assert_eq!(report.checked, 0);
        assert!(!fx.opts.output.exists());
    }

    #[tokio::test]
    async fn redirect_rewrites_input_and_updates_again() {
        let fx = fixture(&["bar"]);
        let moved = "https://github.com/foo/qux/commits/HEAD.atom";
        let host = StubHost::new()
            .with_page(&feed("bar"), moved, atom_feed("abc123", "2024-01-01T00:00:00Z"))
            .with_page(moved, moved, atom_feed("abc123", "2024-01-01T00:00:00Z"));
        let prefetcher = StubPrefetcher::new()
            .with_archive(&archive("bar", "abc123"), "sha-xyz")
            .with_archive(&archive("qux", "abc123"), "sha-xyz");

        let redirects = editor(host, prefetcher, vec![])
            .update(&fx.opts, &[])
            .await
            .unwrap();

        assert_eq!(redirects.len(), 1);
        assert_eq!(
            std::fs::read_to_string(&fx.opts.input).unwrap(),
            format!("{HEADER}https://github.com/foo/qux/,HEAD,\n")
        );
        let ledger = DeprecationLedger::load(&fx.opts.deprecated).unwrap();
        assert_eq!(ledger.0["bar"].new, "qux");
        // The second pass renders the new name
        assert!(output(&fx).contains("qux = buildVimPlugin"));
        assert!(!output(&fx).contains("bar = buildVimPlugin"));
    }

    #[tokio::test]
    async fn add_appends_and_renders() {
        let fx = fixture(&[]);
        let host = StubHost::new().with_page(&feed("bar"), &feed("bar"), atom_feed("abc123", "2024-01-01T00:00:00Z"));
        let prefetcher = StubPrefetcher::new().with_archive(&archive("bar", "abc123"), "sha-xyz");

        editor(host, prefetcher, vec![])
            .add(&fx.opts, &["foo/bar".to_string()])
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&fx.opts.input).unwrap(),
            format!("{HEADER}https://github.com/foo/bar/,HEAD,\n")
        );
        assert!(output(&fx).contains("bar = buildVimPlugin"));
    }
}
