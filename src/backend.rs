//! Backend API client.
//!
//! Requests carry the provider's access token as a bearer credential unless
//! their path starts with one of the excluded prefixes.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::http::{self, RetryPolicy};
use crate::provider::IdentityProvider;

/// Decides which requests get an `Authorization` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BearerPolicy {
    excluded_prefixes: Vec<String>,
}

impl BearerPolicy {
    pub fn new<I, S>(excluded_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded_prefixes: excluded_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn should_attach(&self, url: &Url) -> bool {
        let path = url.path();
        !self
            .excluded_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Client for the application's backend.
pub struct BackendClient {
    http: Client,
    base_url: Url,
    policy: BearerPolicy,
    provider: Arc<dyn IdentityProvider>,
    retry: RetryPolicy,
}

impl BackendClient {
    pub fn new(
        base_url: Url,
        policy: BearerPolicy,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        Ok(Self {
            http: http::build_client()?,
            base_url,
            policy,
            provider,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, endpoint: &str) -> Result<Url> {
        self.base_url
            .join(endpoint)
            .with_context(|| format!("Failed to build URL for endpoint: {}", endpoint))
    }

    /// GET an endpoint and return the response body as text.
    pub async fn get_text(&self, endpoint: &str) -> Result<String> {
        let url = self.url(endpoint)?;
        let token = if self.policy.should_attach(&url) {
            self.provider.token().await.ok()
        } else {
            None
        };
        let request_id = Uuid::new_v4().to_string();

        debug!("=== Backend Request ===");
        debug!("URL: {}", url);
        debug!("Request ID: {}", request_id);
        debug!("Bearer: {}", token.is_some());

        let response = http::send_with_retry(self.retry, || {
            let request = self
                .http
                .get(url.clone())
                .header("X-Request-Id", &request_id);
            match &token {
                Some(token) => request.bearer_auth(token),
                None => request,
            }
        })
        .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read backend response")?;
        if !status.is_success() {
            anyhow::bail!("Backend returned {} for {}: {}", status, endpoint, body);
        }
        Ok(body)
    }

    /// Message from the backend's user-info endpoint.
    pub async fn get_user_info(&self) -> Result<String> {
        self.get_text("user-info").await
    }
}
