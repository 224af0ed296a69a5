//! Hosting-service client on top of ureq
//!
//! ureq is blocking, so each request runs on tokio's blocking pool.

use super::{HostClient, HostResponse};
use crate::error::{PlugupError, PlugupResult};
use crate::plugin::AccessToken;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use ureq::http::Response;
use ureq::{Agent, Body, ResponseExt};

/// HTTP client for GitHub web endpoints
#[derive(Clone)]
pub struct UreqHostClient {
    agent: Agent,
}

impl UreqHostClient {
    /// Create a client whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
        }
    }

    async fn call<T, F>(&self, url: &str, token: Option<&AccessToken>, read: F) -> PlugupResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Response<Body>) -> Result<T, ureq::Error> + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = url.to_string();
        let token = token.cloned();

        tokio::task::spawn_blocking(move || {
            debug!("GET {}", url);
            let mut request = agent.get(&url);
            if let Some(token) = &token {
                request = request.header("Authorization", format!("token {}", token.expose()));
            }
            request
                .call()
                .and_then(read)
                .map_err(|e| classify(&url, e))
        })
        .await
        .map_err(|e| PlugupError::Internal(format!("request task failed: {e}")))?
    }
}

/// 404 is a definite answer; everything else may succeed on a later try
fn classify(url: &str, error: ureq::Error) -> PlugupError {
    match error {
        ureq::Error::StatusCode(404) => PlugupError::NotFound {
            url: url.to_string(),
        },
        other => PlugupError::network(url, other),
    }
}

#[async_trait]
impl HostClient for UreqHostClient {
    async fn probe(&self, url: &str, token: Option<&AccessToken>) -> PlugupResult<()> {
        self.call(url, token, |_| Ok(())).await
    }

    async fn get(&self, url: &str, token: Option<&AccessToken>) -> PlugupResult<HostResponse> {
        self.call(url, token, |mut response| {
            let final_url = response.get_uri().to_string();
            let body = response.body_mut().read_to_vec()?;
            Ok(HostResponse { final_url, body })
        })
        .await
    }
}
