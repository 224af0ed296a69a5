//! Repositories addressed by a plain git URI

use super::{parse_timestamp, LatestCommit, DEFAULT_BRANCH};
use crate::error::PlugupResult;
use crate::plugin::{AccessToken, Plugin};
use crate::upstream::FetchContext;
use tracing::{debug, info};

/// A repository known only by its URI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericRepo {
    uri: String,
    branch: String,
    pub(crate) token: Option<AccessToken>,
}

impl GenericRepo {
    /// Create a generic repository
    pub fn new(uri: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            branch: branch.into(),
            token: None,
        }
    }

    /// The literal URI
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Last path component of the URI
    pub fn name(&self) -> &str {
        self.uri
            .trim_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.uri)
    }

    /// Branch reference, `HEAD` when unset
    pub fn branch(&self) -> &str {
        if self.branch.is_empty() {
            DEFAULT_BRANCH
        } else {
            &self.branch
        }
    }

    /// Without a cheap way to ask, assume submodules so the full fetcher is used
    pub async fn has_submodules(&self, _ctx: &FetchContext) -> PlugupResult<bool> {
        Ok(true)
    }

    /// Clone the default ref and read back its revision and date
    pub async fn latest_commit(&self, ctx: &FetchContext) -> PlugupResult<LatestCommit> {
        debug!("Latest commit for {}", self.uri);
        let meta = ctx
            .retry
            .run(|| ctx.prefetcher.prefetch_git(&self.uri, None))
            .await?;
        let date = parse_timestamp(&self.uri, &meta.date)?;

        Ok(LatestCommit {
            commit: meta.rev,
            date,
            redirect: None,
        })
    }

    /// Hash the tree at `commit`
    pub async fn prefetch(&self, ctx: &FetchContext, commit: &str) -> PlugupResult<String> {
        info!("Prefetching {}", self.uri);
        prefetch_git(ctx, &self.uri, commit).await
    }

    /// `fetchgit` expression
    pub fn as_build_expression(&self, plugin: &Plugin) -> String {
        format!(
            r#"fetchgit {{
      url = "{}";
      rev = "{}";
      sha256 = "{}";
    }}"#,
            self.uri, plugin.commit, plugin.content_hash
        )
    }
}

/// Full git fetch of `uri` at `commit`, including submodules
pub(super) async fn prefetch_git(
    ctx: &FetchContext,
    uri: &str,
    commit: &str,
) -> PlugupResult<String> {
    let meta = ctx
        .retry
        .run(|| ctx.prefetcher.prefetch_git(uri, Some(commit)))
        .await?;
    Ok(meta.sha256)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::testing::{StubHost, StubPrefetcher};

    #[test]
    fn name_is_last_segment() {
        assert_eq!(GenericRepo::new("https://git.sr.ht/~u/plug.vim/", "").name(), "plug.vim");
        assert_eq!(GenericRepo::new("plain", "").name(), "plain");
    }

    #[tokio::test]
    async fn always_reports_submodules() {
        let ctx = StubHost::new().context(StubPrefetcher::new());
        let repo = GenericRepo::new("https://gitlab.com/a/b", "");
        assert!(repo.has_submodules(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn latest_commit_uses_prefetcher_metadata() {
        let prefetcher = StubPrefetcher::new().with_git(
            "https://gitlab.com/a/b",
            "deadbeef",
            "2023-05-06T07:08:09+02:00",
            "sha-git",
        );
        let ctx = StubHost::new().context(prefetcher.clone());
        let repo = GenericRepo::new("https://gitlab.com/a/b", "");

        let latest = repo.latest_commit(&ctx).await.unwrap();
        assert_eq!(latest.commit, "deadbeef");
        assert_eq!(latest.date.format("%Y-%m-%d").to_string(), "2023-05-06");
        assert!(latest.redirect.is_none());

        let hash = repo.prefetch(&ctx, "deadbeef").await.unwrap();
        assert_eq!(hash, "sha-git");
        assert_eq!(
            prefetcher.git_calls(),
            vec![
                ("https://gitlab.com/a/b".to_string(), None),
                ("https://gitlab.com/a/b".to_string(), Some("deadbeef".to_string())),
            ]
        );
    }

    #[test]
    fn build_expression_is_fetchgit() {
        let repo = GenericRepo::new("https://gitlab.com/a/b", "");
        let plugin = Plugin::new("b", "abc", true, "sha", None);
        let expr = repo.as_build_expression(&plugin);
        assert!(expr.starts_with("fetchgit {"));
        assert!(expr.contains(r#"url = "https://gitlab.com/a/b";"#));
        assert!(expr.contains(r#"rev = "abc";"#));
    }
}
