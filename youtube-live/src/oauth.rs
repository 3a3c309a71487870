//! OAuth 2.0 authorization for the YouTube Live API.
//!
//! [`OAuthManager`] knows how to run Google's installed-application flow and how to refresh a
//! token. [`OAuthGate`] sits in front of every API call and decides which of the two (if either)
//! is needed before the call may proceed.

use crate::config::Config;
use crate::error::{Error, Result};
use eyre::Context;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response, body};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{ClientSecret, RevocationUrl, TokenResponse, reqwest};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, CsrfToken, PkceCodeChallenge, RedirectUrl, Scope,
    TokenUrl,
};
use std::future::Future;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Google OAuth2 token endpoint URL used for both initial authentication and token refresh
const TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v3/token";
const REVOCATION_URL: &str = "https://oauth2.googleapis.com/revoke";

/// The one scope needed to manage broadcasts and streams.
pub const YOUTUBE_SCOPE: &str = "https://www.googleapis.com/auth/youtube";

const OAUTH_DONE_HTML: &str = include_str!("../oauth_success.html");

/// Anything that can hand out a valid bearer token for the next API call.
pub trait Authorize: Send + Sync {
    /// Makes sure the caller is authorized and returns the access token to use.
    ///
    /// Never retries on failure: the caller has to invoke the guarded operation again.
    fn ensure_authorized(&self) -> impl Future<Output = Result<String>> + Send;
}

/// An access token obtained elsewhere. Always considered valid.
#[derive(Clone)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self(access_token.into())
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

impl Authorize for BearerToken {
    async fn ensure_authorized(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Manages OAuth 2.0 authentication flows for YouTube API access.
///
/// The OAuthManager encapsulates all OAuth operations, providing a consistent interface
/// for both initial user authentication and token refresh operations.
#[derive(Debug, Clone)]
pub struct OAuthManager {
    client_id: String,
    client_secret: Option<String>,
}

impl OAuthManager {
    pub fn new(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.client_id.clone(), config.client_secret.clone())
    }

    fn http_client() -> eyre::Result<reqwest::Client> {
        reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("build OAuth HTTP client")
    }

    /// Performs a complete OAuth 2.0 authorization flow to obtain a new access token.
    ///
    /// This method initiates the full OAuth flow, including:
    /// 1. Opening the user's browser for authorization
    /// 2. Setting up a local HTTP server to receive the authorization callback
    /// 3. Exchanging the authorization code for an access token
    ///
    /// # Panics
    ///
    /// Panics if hardcoded OAuth endpoint URLs are malformed.
    pub async fn authenticate(&self) -> eyre::Result<BasicTokenResponse> {
        let csrf = CsrfToken::new_random();
        let (redirect_url, eventually_authorization_code) = setup_redirect(csrf.clone())
            .await
            .context("set up redirect endpoint")?;

        let auth_url =
            AuthUrl::new(AUTH_URL.to_string()).expect("Invalid authorization endpoint URL");
        let token_url = TokenUrl::new(TOKEN_URL.to_string()).expect("Invalid token endpoint URL");
        let revocation_url = RevocationUrl::new(REVOCATION_URL.to_string())
            .expect("Invalid revocation endpoint URL");
        let mut client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url)
            .set_revocation_url(revocation_url);
        if let Some(secret) = &self.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, _csrf_token) = client
            // We never re-use the CSRF since we only go through the flow exactly once.
            .authorize_url(move || csrf.clone())
            .add_scope(Scope::new(YOUTUBE_SCOPE.to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        tracing::info!(url = %auth_url, "asking user to follow OAuth flow");
        webbrowser::open(auth_url.as_ref()).context("open user's browser")?;
        let authorization_code = eventually_authorization_code
            .await
            .context("await user authorization code")?;

        let token = client
            .exchange_code(authorization_code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&Self::http_client()?)
            .await
            .context("exchange authorization code with access token")?;

        Ok(token)
    }

    /// Attempts to refresh an existing OAuth token using its refresh token.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(new_token))` - Refresh succeeded, new token is available
    /// * `Ok(None)` - No refresh token, or Google considers it an invalid grant
    /// * `Err(_)` - Network or other error occurred during refresh attempt
    pub async fn refresh_token(
        &self,
        token: &BasicTokenResponse,
    ) -> eyre::Result<Option<BasicTokenResponse>> {
        let Some(refresh_token) = token.refresh_token() else {
            tracing::warn!("no refresh token available, cannot refresh");
            return Ok(None);
        };

        tracing::debug!("attempting to refresh OAuth token");

        let mut client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_token_uri(TokenUrl::new(TOKEN_URL.to_string()).expect("Invalid token endpoint URL"));
        if let Some(secret) = &self.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        match client
            .exchange_refresh_token(refresh_token)
            .request_async(&Self::http_client()?)
            .await
        {
            Ok(new_token) => {
                tracing::debug!("successfully refreshed OAuth token");
                Ok(Some(new_token))
            }
            Err(ref e @ oauth2::RequestTokenError::ServerResponse(ref sr))
                if matches!(
                    sr.error(),
                    oauth2::basic::BasicErrorResponseType::InvalidGrant
                ) =>
            {
                tracing::warn!("OAuth refresh token considered invalid grant: {}", e);
                Ok(None)
            }
            Err(e) => Err(e).context("exchange refresh token"),
        }
    }
}

/// Sets up a local HTTP server to receive the OAuth authorization callback.
///
/// Returns the redirect URL to use in the OAuth flow and a future that resolves to the
/// authorization code once the callback with a matching `state` arrives.
async fn setup_redirect(
    csrf: CsrfToken,
) -> eyre::Result<(
    RedirectUrl,
    impl Future<Output = eyre::Result<AuthorizationCode>>,
)> {
    let socket = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind to localhost")?;
    let addr = socket.local_addr().context("get local address")?;
    let url = RedirectUrl::new(format!("http://{}:{}", addr.ip(), addr.port()))
        .context("construct redirect url")?;
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let r = async move {
            let (conn, _) = socket.accept().await.context("accept")?;
            let conn = hyper_util::rt::TokioIo::new(conn);
            let (got, mut gotten) = tokio::sync::mpsc::channel(1);
            let service = service_fn(move |req: Request<body::Incoming>| {
                let csrf = csrf.clone();
                let got = got.clone();
                async move {
                    let mut presented_state = None;
                    let mut presented_code = None;
                    let mut presented_error = None;
                    for (k, v) in form_urlencoded::parse(req.uri().query().unwrap_or("").as_bytes())
                    {
                        match &*k {
                            "state" => presented_state = Some(v),
                            "code" => presented_code = Some(v),
                            "error" => presented_error = Some(v),
                            _ => {}
                        }
                    }
                    if presented_state.as_deref() != Some(csrf.secret().as_str()) {
                        return Err("invalid csrf token".to_string());
                    }
                    // The user said no.
                    if let Some(error) = presented_error {
                        let _ = got.send(Err(error.into_owned())).await;
                        return Ok(Response::new(Full::<Bytes>::from(
                            "Authorization was denied. You can close this window.",
                        )));
                    }
                    let Some(code) = presented_code else {
                        return Err("no authorization code found".to_string());
                    };
                    let code = AuthorizationCode::new(code.into_owned());
                    let _ = got.send(Ok(code)).await;
                    Ok(Response::new(Full::<Bytes>::from(OAUTH_DONE_HTML)))
                }
            });
            let mut serve = std::pin::pin!(
                hyper::server::conn::http1::Builder::new().serve_connection(conn, service)
            );

            tokio::select! {
                exit = &mut serve => {
                    if let Err(e) = exit {
                        Err(e).context("redirect server got bad request")
                    } else {
                        eyre::bail!("redirect server exit prematurely");
                    }
                }
                code = gotten.recv() => {
                    serve.as_mut().graceful_shutdown();
                    match code {
                        Some(Ok(code)) => Ok(code),
                        Some(Err(reason)) => eyre::bail!("user denied authorization: {reason}"),
                        None => eyre::bail!("redirect handler went away"),
                    }
                }
            }
        };
        let _ = tx.send(r.await);
    });
    Ok((url, async move {
        rx.await.context("redirect future dropped prematurely")?
    }))
}

/// An OAuth token together with the moment it stops being usable.
#[derive(Debug, Clone)]
pub struct TimeBoundAccessToken {
    token: BasicTokenResponse,
    /// When the current access token expires (with safety buffer)
    expires_at: SystemTime,
}

impl TimeBoundAccessToken {
    /// Wraps a token that is already considered expired, forcing a refresh before first use.
    ///
    /// This is what you want for tokens loaded from storage.
    pub fn expired(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: SystemTime::UNIX_EPOCH,
            token,
        }
    }

    /// Wraps a token that was just issued.
    pub fn new(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: Self::calculate_token_expiry(&token),
            token,
        }
    }

    pub fn raw_token(&self) -> &BasicTokenResponse {
        &self.token
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    pub fn access_token(&self) -> &str {
        self.token.access_token().secret()
    }

    /// Refreshes this token, preserving the refresh token if Google does not send a new one.
    ///
    /// Returns `Ok(false)` if the token could not be refreshed and the user has to authorize
    /// again.
    pub async fn refresh(&mut self, oauth_manager: &OAuthManager) -> eyre::Result<bool> {
        tracing::trace!("refreshing token");
        match oauth_manager
            .refresh_token(&self.token)
            .await
            .context("refresh OAuth token")?
        {
            Some(new_token) => {
                let old_token = std::mem::replace(&mut self.token, new_token);
                if self.token.refresh_token().is_none() {
                    tracing::trace!("new token lacks refresh token, preserving original");
                    self.token
                        .set_refresh_token(old_token.refresh_token().cloned());
                }
                self.expires_at = Self::calculate_token_expiry(&self.token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Now + `expires_in` - 5 minutes, or 55 minutes if Google did not say.
    fn calculate_token_expiry(token: &BasicTokenResponse) -> SystemTime {
        let now = SystemTime::now();
        match token.expires_in() {
            Some(expires_in) => now + expires_in.saturating_sub(Duration::from_secs(300)),
            None => now + Duration::from_secs(3300),
        }
    }
}

/// Authorization gate backed by Google's OAuth flow.
///
/// The first call with nothing stored runs the interactive flow. Later calls reuse the cached
/// token until it expires, then refresh it, falling back to the interactive flow if the refresh
/// token is no longer accepted.
#[derive(Debug)]
pub struct OAuthGate {
    manager: OAuthManager,
    token: Mutex<Option<TimeBoundAccessToken>>,
}

impl OAuthGate {
    /// A gate with no stored authorization.
    pub fn new(manager: OAuthManager) -> Self {
        Self {
            manager,
            token: Mutex::new(None),
        }
    }

    /// A gate seeded with a token from a previous run. It is refreshed before first use.
    pub fn with_stored_token(manager: OAuthManager, token: BasicTokenResponse) -> Self {
        Self {
            manager,
            token: Mutex::new(Some(TimeBoundAccessToken::expired(token))),
        }
    }

    /// A gate seeded with a token that was just issued.
    pub fn with_fresh_token(manager: OAuthManager, token: BasicTokenResponse) -> Self {
        Self {
            manager,
            token: Mutex::new(Some(TimeBoundAccessToken::new(token))),
        }
    }

    /// The current token, for persisting across runs.
    pub async fn token(&self) -> Option<BasicTokenResponse> {
        self.token.lock().await.as_ref().map(|t| t.raw_token().clone())
    }

    /// Whether the next call can proceed without touching the network.
    pub async fn is_authorized(&self) -> bool {
        self.token
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.is_expired())
    }
}

impl Authorize for OAuthGate {
    #[tracing::instrument(skip(self), level = tracing::Level::TRACE)]
    async fn ensure_authorized(&self) -> Result<String> {
        // Held across the whole flow so concurrent calls don't each open a browser.
        let mut slot = self.token.lock().await;

        if let Some(token) = slot.as_mut() {
            if !token.is_expired() {
                return Ok(token.access_token().to_string());
            }

            tracing::debug!("access token expired, attempting refresh");
            if token
                .refresh(&self.manager)
                .await
                .map_err(|e| Error::auth(&e))?
            {
                tracing::debug!("access token successfully refreshed");
                return Ok(token.access_token().to_string());
            }
            tracing::warn!("token refresh failed, falling back to full OAuth flow");
        }

        let token = self
            .manager
            .authenticate()
            .await
            .context("authorize user to YouTube")
            .map_err(|e| Error::auth(&e))?;
        let token = TimeBoundAccessToken::new(token);
        let access_token = token.access_token().to_string();
        *slot = Some(token);
        Ok(access_token)
    }
}
