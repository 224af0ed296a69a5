//! Plugin descriptions and resolved plugins

use crate::error::{PlugupError, PlugupResult};
use crate::repo::{SourceRepo, DEFAULT_BRANCH};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque credential for the hosting service.
///
/// Carried alongside repositories and sent with requests; never logged.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a token string, ignoring empty values
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token.trim().to_string()))
        }
    }

    /// The raw token, for building request headers
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Replace `.` with `-`, giving the stable key used for merging and output
pub fn normalize_name(name: &str) -> String {
    name.replace('.', "-")
}

/// Declared intent for one plugin: which repository, branch and alias
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginDesc {
    /// Upstream repository
    pub repo: SourceRepo,
    /// Branch as written in the declared list (may be empty)
    pub branch: String,
    /// Name override
    pub alias: Option<String>,
}

impl PluginDesc {
    /// Create a plugin description
    pub fn new(repo: SourceRepo, branch: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            repo,
            branch: branch.into(),
            alias: alias.filter(|a| !a.is_empty()),
        }
    }

    /// Build a description from a declared-list record
    pub fn from_record(
        repo: &str,
        branch: &str,
        alias: &str,
        token: Option<&AccessToken>,
    ) -> Self {
        let branch = branch.trim();
        let repo = SourceRepo::from_uri(repo, branch).with_token(token.cloned());
        let alias = Some(alias.to_string()).filter(|a| !a.is_empty());
        Self::new(repo, branch, alias)
    }

    /// Parse a plugin spec of the form `uri[@branch][ as alias]`
    pub fn from_spec(spec: &str, token: Option<&AccessToken>) -> PlugupResult<Self> {
        let (uri, alias) = match spec.split_once(" as ") {
            Some((uri, alias)) => (uri, Some(alias.trim().to_string())),
            None => (spec, None),
        };

        // An `@` only separates a branch when the left side already looks
        // like a path, so `git@host:owner/repo` stays intact.
        let (uri, branch) = match uri.rsplit_once('@') {
            Some((left, branch)) if left.contains('/') => (left, branch.trim()),
            _ => (uri, DEFAULT_BRANCH),
        };

        let uri = uri.trim();
        if uri.is_empty() {
            return Err(PlugupError::InvalidSpec {
                spec: spec.to_string(),
                reason: "missing repository".to_string(),
            });
        }
        if alias.as_deref() == Some("") {
            return Err(PlugupError::InvalidSpec {
                spec: spec.to_string(),
                reason: "empty alias after 'as'".to_string(),
            });
        }

        let repo = SourceRepo::from_uri(uri, branch).with_token(token.cloned());
        Ok(Self::new(repo, branch, alias))
    }

    /// Alias if present, otherwise the repository's short name
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.repo.name())
    }

    /// Name with `.` replaced by `-`
    pub fn normalized_name(&self) -> String {
        normalize_name(self.name())
    }

    /// Same branch and alias, pointed at another repository
    pub fn redirected(&self, repo: SourceRepo) -> Self {
        Self {
            repo,
            branch: self.branch.clone(),
            alias: self.alias.clone(),
        }
    }
}

impl fmt::Display for PluginDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}@{})", self.name(), self.repo, self.repo.branch())
    }
}

/// A plugin resolved to a specific commit and content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    pub name: String,
    pub commit: String,
    pub has_submodules: bool,
    #[serde(rename = "sha256")]
    pub content_hash: String,
    /// Commit timestamp; not persisted in the cache
    #[serde(skip)]
    pub date: Option<DateTime<FixedOffset>>,
}

impl Plugin {
    /// Create a resolved plugin
    pub fn new(
        name: impl Into<String>,
        commit: impl Into<String>,
        has_submodules: bool,
        content_hash: impl Into<String>,
        date: Option<DateTime<FixedOffset>>,
    ) -> Self {
        Self {
            name: name.into(),
            commit: commit.into(),
            has_submodules,
            content_hash: content_hash.into(),
            date,
        }
    }

    /// Name with `.` replaced by `-`
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Commit date as `YYYY-MM-DD`
    pub fn version(&self) -> PlugupResult<String> {
        self.date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .ok_or_else(|| PlugupError::Internal(format!("plugin {} has no commit date", self.name)))
    }
}
