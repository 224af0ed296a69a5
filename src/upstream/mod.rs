//! External capabilities used to resolve plugins
//!
//! Provides the seams between the resolution logic and the outside world:
//! - [`HostClient`]: HTTP requests against the hosting service
//! - [`Prefetcher`]: the nix prefetch tools that download and hash sources
//!
//! [`FetchContext`] bundles them with the retry policy and the log span
//! every resolution runs under.

mod http;
mod prefetch;

pub use http::UreqHostClient;
pub use prefetch::NixPrefetcher;

use crate::config::schema::FetchSettings;
use crate::error::PlugupResult;
use crate::plugin::AccessToken;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::Span;

/// Response of a successful host request
#[derive(Debug, Clone)]
pub struct HostResponse {
    /// URL that finally answered, after following redirects
    pub final_url: String,
    /// Response body
    pub body: Vec<u8>,
}

/// Metadata reported by `nix-prefetch-git`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitPrefetch {
    pub rev: String,
    pub date: String,
    pub sha256: String,
}

/// HTTP access to the hosting service
#[async_trait]
pub trait HostClient: Send + Sync {
    /// Check that `url` exists; a 404 is reported as `NotFound`
    async fn probe(&self, url: &str, token: Option<&AccessToken>) -> PlugupResult<()>;

    /// Fetch `url`, following redirects
    async fn get(&self, url: &str, token: Option<&AccessToken>) -> PlugupResult<HostResponse>;
}

/// Source download and hashing
#[async_trait]
pub trait Prefetcher: Send + Sync {
    /// Fetch a git repository at `rev` (or its default ref) with submodules
    async fn prefetch_git(&self, uri: &str, rev: Option<&str>) -> PlugupResult<GitPrefetch>;

    /// Download and unpack an archive, returning its hash
    async fn prefetch_archive(&self, url: &str) -> PlugupResult<String>;
}

/// Everything a repository needs to talk to the outside world
#[derive(Clone)]
pub struct FetchContext {
    pub host: Arc<dyn HostClient>,
    pub prefetcher: Arc<dyn Prefetcher>,
    pub retry: RetryPolicy,
    pub span: Span,
}

impl FetchContext {
    /// Create a context with the default retry policy
    pub fn new(host: Arc<dyn HostClient>, prefetcher: Arc<dyn Prefetcher>) -> Self {
        Self {
            host,
            prefetcher,
            retry: RetryPolicy::default(),
            span: Span::current(),
        }
    }

    /// Context backed by real HTTP and the nix prefetch tools
    pub fn system(settings: &FetchSettings) -> Self {
        let host = UreqHostClient::new(Duration::from_secs(settings.http_timeout_secs));
        Self::new(Arc::new(host), Arc::new(NixPrefetcher::new()))
            .with_retry(settings.retry_policy())
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the span resolutions are logged under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}
