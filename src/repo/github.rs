//! Repositories hosted on GitHub, addressed as `owner/name`

use super::generic::prefetch_git;
use super::{feed, parse_timestamp, LatestCommit, SourceRepo, DEFAULT_BRANCH, GITHUB_HOST};
use crate::error::{PlugupError, PlugupResult};
use crate::plugin::{AccessToken, Plugin};
use crate::upstream::FetchContext;
use tracing::debug;
use url::Url;

/// A GitHub repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GitHubRepo {
    pub owner: String,
    pub repo: String,
    branch: String,
    pub(crate) token: Option<AccessToken>,
}

impl GitHubRepo {
    /// Create a GitHub repository handle
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, branch: impl Into<String>) -> Self {
        let owner = owner.into();
        let repo = repo.into();
        debug!("Instantiating github repo owner={} and repo={}", owner, repo);
        Self {
            owner,
            repo,
            branch: branch.into(),
            token: None,
        }
    }

    /// Repository name
    pub fn name(&self) -> &str {
        &self.repo
    }

    /// Branch reference, `HEAD` when unset
    pub fn branch(&self) -> &str {
        if self.branch.is_empty() {
            DEFAULT_BRANCH
        } else {
            &self.branch
        }
    }

    /// URL of `path` inside the repository's web interface
    pub fn url(&self, path: &str) -> String {
        format!("https://{}/{}/{}/{}", GITHUB_HOST, self.owner, self.repo, path)
    }

    /// Probe for a `.gitmodules` file on the branch
    pub async fn has_submodules(&self, ctx: &FetchContext) -> PlugupResult<bool> {
        let url = self.url(&format!("blob/{}/.gitmodules", self.branch()));
        let probe = ctx
            .retry
            .run(|| ctx.host.probe(&url, self.token.as_ref()))
            .await;

        match probe {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read the branch's commit feed.
    ///
    /// When the host answers from a different `owner/name` the repository
    /// was moved, and the new location is returned as the redirect.
    pub async fn latest_commit(&self, ctx: &FetchContext) -> PlugupResult<LatestCommit> {
        let commit_url = self.url(&format!("commits/{}.atom", self.branch()));
        debug!("Sending request to {}", commit_url);

        let response = ctx
            .retry
            .run(|| ctx.host.get(&commit_url, self.token.as_ref()))
            .await?;
        let redirect = self.check_for_redirect(&commit_url, &response.final_url)?;

        let context = self.url("");
        let entry = feed::latest_entry(&response.body)
            .map_err(|reason| PlugupError::malformed(&context, reason))?;
        let commit = revision_from_link(&entry.link)
            .ok_or_else(|| PlugupError::malformed(&context, format!("bad commit link {}", entry.link)))?;
        let date = parse_timestamp(&context, &entry.updated)?;

        Ok(LatestCommit {
            commit,
            date,
            redirect,
        })
    }

    fn check_for_redirect(
        &self,
        request_url: &str,
        response_url: &str,
    ) -> PlugupResult<Option<SourceRepo>> {
        if request_url == response_url {
            return Ok(None);
        }

        let url = Url::parse(response_url)
            .map_err(|e| PlugupError::malformed(request_url, format!("bad redirect {response_url}: {e}")))?;
        let mut segments = url.path().trim_matches('/').split('/');
        let (Some(owner), Some(name)) = (segments.next(), segments.next()) else {
            return Err(PlugupError::malformed(
                request_url,
                format!("redirect {response_url} has no owner/name"),
            ));
        };

        if owner == self.owner && name == self.repo {
            return Ok(None);
        }

        debug!("{}/{} moved to {}/{}", self.owner, self.repo, owner, name);
        let mut moved = GitHubRepo::new(owner, name, self.branch());
        moved.token = self.token.clone();
        Ok(Some(SourceRepo::GitHub(moved)))
    }

    /// Hash the tree at `commit`; the tarball is enough without submodules
    pub async fn prefetch(&self, ctx: &FetchContext, commit: &str) -> PlugupResult<String> {
        if self.has_submodules(ctx).await? {
            prefetch_git(ctx, &self.url(""), commit).await
        } else {
            let archive = self.url(&format!("archive/{commit}.tar.gz"));
            debug!("Prefetching archive {}", archive);
            ctx.retry
                .run(|| ctx.prefetcher.prefetch_archive(&archive))
                .await
        }
    }

    /// `fetchFromGitHub` expression
    pub fn as_build_expression(&self, plugin: &Plugin) -> String {
        let submodule_attr = if plugin.has_submodules {
            "\n      fetchSubmodules = true;"
        } else {
            ""
        };

        format!(
            r#"fetchFromGitHub {{
      owner = "{}";
      repo = "{}";
      rev = "{}";
      sha256 = "{}";{}
    }}"#,
            self.owner, self.repo, plugin.commit, plugin.content_hash, submodule_attr
        )
    }
}

/// Last path segment of a commit link such as `.../commit/<sha>`
fn revision_from_link(link: &str) -> Option<String> {
    let path = match Url::parse(link) {
        Ok(url) => url.path().to_string(),
        Err(_) => link.to_string(),
    };
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
