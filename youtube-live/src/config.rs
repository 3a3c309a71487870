//! Process-level configuration for talking to the YouTube Live API.
//!
//! Nothing here is compiled in: the OAuth client id, the optional client secret and the API key
//! are injected when the process starts, usually from the environment.

use eyre::Context;
use reqwest::Url;

/// Default base for every `liveBroadcasts` / `liveStreams` call.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";

pub const CLIENT_ID_VAR: &str = "YOUTUBE_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "YOUTUBE_CLIENT_SECRET";
pub const API_KEY_VAR: &str = "YOUTUBE_API_KEY";
pub const BASE_URL_VAR: &str = "YOUTUBE_API_BASE_URL";

#[derive(Clone)]
pub struct Config {
    /// OAuth client id of the installed application.
    pub client_id: String,
    /// OAuth client secret.
    ///
    /// Google issues one even for installed (PKCE) applications, where it is not considered
    /// secret. Leave unset for clients that do not have one.
    pub client_secret: Option<String>,
    /// Static API key appended as `key=` to every request.
    pub api_key: String,
    /// Where the YouTube Data API lives. Always ends in `/`.
    pub base_url: Url,
}

// Hand-written so credentials never end up in logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl Config {
    /// Configuration pointing at the production API.
    pub fn new(client_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            api_key: api_key.into(),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
        }
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Points the client somewhere other than Google, e.g. at a local stub.
    pub fn with_base_url(mut self, base_url: &str) -> eyre::Result<Self> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    /// Reads the configuration from `YOUTUBE_*` environment variables.
    pub fn from_env() -> eyre::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let client_id = non_empty(CLIENT_ID_VAR)
            .ok_or_else(|| eyre::eyre!("{CLIENT_ID_VAR} must be set"))?;
        let api_key =
            non_empty(API_KEY_VAR).ok_or_else(|| eyre::eyre!("{API_KEY_VAR} must be set"))?;

        let mut config = Self::new(client_id, api_key);
        config.client_secret = non_empty(CLIENT_SECRET_VAR);
        if let Some(base_url) = non_empty(BASE_URL_VAR) {
            config = config
                .with_base_url(&base_url)
                .with_context(|| format!("parse {BASE_URL_VAR}"))?;
        }
        Ok(config)
    }

    /// Resolves an API path (e.g. `liveBroadcasts/bind`) against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Url {
        self.base_url
            .join(path)
            .expect("relative API paths always join onto a base URL")
    }
}

fn parse_base_url(raw: &str) -> eyre::Result<Url> {
    let mut raw = raw.trim().to_string();
    // Url::join replaces the last segment unless the base is a "directory".
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw).with_context(|| format!("invalid base URL {raw:?}"))?;
    if url.cannot_be_a_base() {
        eyre::bail!("{raw:?} cannot be used as a base URL");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn from_env_requires_client_id_and_key() {
        let err = Config::from_lookup(lookup(&[(API_KEY_VAR, "k")])).unwrap_err();
        assert!(err.to_string().contains(CLIENT_ID_VAR));

        let err = Config::from_lookup(lookup(&[(CLIENT_ID_VAR, "id"), (API_KEY_VAR, " ")]))
            .unwrap_err();
        assert!(err.to_string().contains(API_KEY_VAR));
    }

    #[test]
    fn from_env_defaults() {
        let config =
            Config::from_lookup(lookup(&[(CLIENT_ID_VAR, "id"), (API_KEY_VAR, "k")])).unwrap();
        assert_eq!(config.client_id, "id");
        assert_eq!(config.api_key, "k");
        assert_eq!(config.client_secret, None);
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let config = Config::from_lookup(lookup(&[
            (CLIENT_ID_VAR, "id"),
            (API_KEY_VAR, "k"),
            (CLIENT_SECRET_VAR, "s"),
            (BASE_URL_VAR, "http://127.0.0.1:8080/youtube/v3"),
        ]))
        .unwrap();
        assert_eq!(config.client_secret.as_deref(), Some("s"));
        assert_eq!(
            config.endpoint("liveBroadcasts/transition").as_str(),
            "http://127.0.0.1:8080/youtube/v3/liveBroadcasts/transition"
        );
    }

    #[test]
    fn debug_redacts_credentials() {
        let config = Config::new("id", "super-secret-key").with_client_secret("hush");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-key"));
        assert!(!debug.contains("hush"));
    }
}
