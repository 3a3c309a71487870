//! Core YouTube Live API client: request plumbing shared by every operation.

use crate::alerts::{self, AlertSink, FailurePolicy, LogAlerts};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::oauth::{Authorize, OAuthGate, OAuthManager};
use crate::youtube_api::types::check_response;
use http::Method;
use http::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Page size used for every list call. The API does not allow more.
pub(crate) const MAX_RESULTS: &str = "50";

/// Client for the `liveBroadcasts` and `liveStreams` resources of the YouTube Data API v3.
///
/// Every operation first passes through the client's [`Authorize`] gate, then makes exactly one
/// HTTP request, then decodes the response. Failures are returned to the caller and, depending on
/// the operation's [`FailurePolicy`], also shown through the client's [`AlertSink`].
///
/// The client is cheap to clone; clones share the gate, the alert sink and the connection pool.
pub struct LiveStreamingClient<A = OAuthGate> {
    auth: Arc<A>,
    config: Arc<Config>,
    alerts: Arc<dyn AlertSink>,
    client: reqwest::Client,
}

impl<A> Clone for LiveStreamingClient<A> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            config: Arc::clone(&self.config),
            alerts: Arc::clone(&self.alerts),
            client: self.client.clone(),
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for LiveStreamingClient<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveStreamingClient")
            .field("auth", &self.auth)
            .field("config", &self.config)
            .field("alerts", &self.alerts)
            .finish_non_exhaustive()
    }
}

impl LiveStreamingClient<OAuthGate> {
    /// Builds a client that authorizes through Google OAuth on first use.
    pub fn with_oauth(config: Config) -> Self {
        let gate = OAuthGate::new(OAuthManager::from_config(&config));
        Self::new(config, gate)
    }
}

impl<A: Authorize> LiveStreamingClient<A> {
    /// Creates a client without authorizing. The gate runs lazily before the first request.
    pub fn new(config: Config, auth: A) -> Self {
        Self {
            auth: Arc::new(auth),
            config: Arc::new(config),
            alerts: Arc::new(LogAlerts),
            client: reqwest::Client::new(),
        }
    }

    /// Creates a client and passes the authorization gate once, up front.
    ///
    /// This is where an interactive OAuth flow happens if nothing is stored yet.
    pub async fn connect(config: Config, auth: A) -> Result<Self> {
        let client = Self::new(config, auth);
        client.auth.ensure_authorized().await?;
        Ok(client)
    }

    /// Replaces where user-facing failures are shown. Defaults to [`LogAlerts`].
    pub fn with_alerts(mut self, alerts: impl AlertSink + 'static) -> Self {
        self.alerts = Arc::new(alerts);
        self
    }

    /// Uses a preconfigured HTTP client, e.g. one with custom timeouts.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn authorizer(&self) -> &A {
        &self.auth
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Makes one authorized request and returns the body once it is known not to be an error.
    ///
    /// `path` is relative to the configured base URL. The API key is always appended last.
    #[instrument(skip(self, body), level = tracing::Level::TRACE)]
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<String> {
        let access_token = self.auth.ensure_authorized().await?;

        let mut request = self
            .client
            .request(method.clone(), self.config.endpoint(path))
            .bearer_auth(access_token)
            .header(CONTENT_TYPE, "application/json")
            .query(query)
            .query(&[("key", self.config.api_key.as_str())]);

        if let Some(body) = body {
            request = request.json(body);
        }

        // The URL carries the API key, so errors must not quote it.
        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(&format!("send {method} {path}"), &e.without_url()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            Error::transport(&format!("read {method} {path} response"), &e.without_url())
        })?;

        check_response(status, &text)?;
        Ok(text)
    }

    /// [`Self::send`], then decodes the body as `T`.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<T> {
        let text = self.send(method, path, query, body).await?;
        serde_json::from_str(&text)
            .map_err(|e| Error::transport(&format!("parse {path} response as JSON"), &e))
    }

    /// Applies an operation's [`FailurePolicy`] to its outcome and passes the outcome on.
    pub(crate) fn finish<T>(
        &self,
        result: Result<T>,
        policy: FailurePolicy,
        title: &str,
    ) -> Result<T> {
        if let Err(error) = &result {
            alerts::report(&*self.alerts, policy, title, error);
        }
        result
    }
}
