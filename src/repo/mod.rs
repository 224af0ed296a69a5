//! Upstream source repositories
//!
//! A plugin's source is either a generic git URI or a repository on the
//! hosting service (GitHub). Both expose the same operations; the hosted
//! variant has cheaper ways to answer them and can detect renames.

mod feed;
mod generic;
mod github;

pub use generic::GenericRepo;
pub use github::GitHubRepo;

use crate::error::{PlugupError, PlugupResult};
use crate::plugin::{AccessToken, Plugin};
use crate::upstream::FetchContext;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use std::fmt;
use url::Url;

/// Symbolic reference used when no branch is declared
pub const DEFAULT_BRANCH: &str = "HEAD";

/// Host whose repositories are addressed as `owner/name`
pub const GITHUB_HOST: &str = "github.com";

/// Newest revision of a repository branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestCommit {
    /// Revision identifier
    pub commit: String,
    /// Commit timestamp
    pub date: DateTime<FixedOffset>,
    /// Where the repository lives now, if the host reported a move
    pub redirect: Option<SourceRepo>,
}

/// Handle to an upstream repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceRepo {
    Generic(GenericRepo),
    GitHub(GitHubRepo),
}

impl SourceRepo {
    /// Classify a URI and build the matching repository.
    ///
    /// Bare `owner/name` paths, URLs without a host (`file:///owner/name`)
    /// and `https://github.com/owner/name` URLs become [`GitHubRepo`];
    /// anything else is kept verbatim as a [`GenericRepo`]. Never fails.
    pub fn from_uri(uri: &str, branch: &str) -> Self {
        let uri = uri.trim();
        let path = match Url::parse(uri) {
            Ok(url) if matches!(url.host_str(), None | Some("") | Some(GITHUB_HOST)) => {
                Some(url.path().to_string())
            }
            Ok(_) => None,
            Err(_) => Some(uri.to_string()),
        };

        match path.as_deref().and_then(owner_and_name) {
            Some((owner, name)) => Self::GitHub(GitHubRepo::new(owner, name, branch)),
            None => Self::Generic(GenericRepo::new(uri, branch)),
        }
    }

    /// Short name: the last path component of the repository
    pub fn name(&self) -> &str {
        match self {
            Self::Generic(repo) => repo.name(),
            Self::GitHub(repo) => repo.name(),
        }
    }

    /// Canonical URI, as written to the declared list
    pub fn uri(&self) -> String {
        match self {
            Self::Generic(repo) => repo.uri().to_string(),
            Self::GitHub(repo) => repo.url(""),
        }
    }

    /// Branch reference, falling back to [`DEFAULT_BRANCH`]
    pub fn branch(&self) -> &str {
        match self {
            Self::Generic(repo) => repo.branch(),
            Self::GitHub(repo) => repo.branch(),
        }
    }

    /// Credential carried for this repository
    pub fn token(&self) -> Option<&AccessToken> {
        match self {
            Self::Generic(repo) => repo.token.as_ref(),
            Self::GitHub(repo) => repo.token.as_ref(),
        }
    }

    /// Attach a credential
    pub fn with_token(mut self, token: Option<AccessToken>) -> Self {
        match &mut self {
            Self::Generic(repo) => repo.token = token,
            Self::GitHub(repo) => repo.token = token,
        }
        self
    }

    /// Whether fetching this repository needs submodules
    pub async fn has_submodules(&self, ctx: &FetchContext) -> PlugupResult<bool> {
        match self {
            Self::Generic(repo) => repo.has_submodules(ctx).await,
            Self::GitHub(repo) => repo.has_submodules(ctx).await,
        }
    }

    /// Resolve the branch to its newest commit
    pub async fn latest_commit(&self, ctx: &FetchContext) -> PlugupResult<LatestCommit> {
        match self {
            Self::Generic(repo) => repo.latest_commit(ctx).await,
            Self::GitHub(repo) => repo.latest_commit(ctx).await,
        }
    }

    /// Content hash of the tree at `commit`
    pub async fn prefetch(&self, ctx: &FetchContext, commit: &str) -> PlugupResult<String> {
        match self {
            Self::Generic(repo) => repo.prefetch(ctx, commit).await,
            Self::GitHub(repo) => repo.prefetch(ctx, commit).await,
        }
    }

    /// Nix fetcher expression for a resolved plugin of this repository
    pub fn as_build_expression(&self, plugin: &Plugin) -> String {
        match self {
            Self::Generic(repo) => repo.as_build_expression(plugin),
            Self::GitHub(repo) => repo.as_build_expression(plugin),
        }
    }
}

impl fmt::Display for SourceRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Split `owner/name[/...]` when both segments are valid GitHub identifiers
fn owner_and_name(path: &str) -> Option<(&str, &str)> {
    let mut segments = path.trim_matches('/').split('/');
    let owner = segments.next()?;
    let name = segments.next()?;
    (is_identifier(owner) && is_identifier(name)).then_some((owner, name))
}

fn is_identifier(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Parse an upstream timestamp.
///
/// Accepts `YYYY-MM-DDTHH:MM:SSZ` and `YYYY-MM-DDTHH:MM:SS±HH[:]MM`;
/// anything else is malformed upstream data.
pub fn parse_timestamp(context: &str, value: &str) -> PlugupResult<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%SZ") {
        return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
    }
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%:z"))
        .map_err(|e| PlugupError::malformed(context, format!("unexpected timestamp '{value}': {e}")))
}
