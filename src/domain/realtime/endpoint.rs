//! Connection endpoint value object.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::domain::foundation::ValidationError;

use super::RealtimeError;

/// Address of a real-time endpoint plus the bearer credential used to open it.
///
/// Immutable for the lifetime of one transport connection. The token is
/// attached as a `token` query parameter at connect time because the browser
/// WebSocket transport cannot carry custom headers; the backend expects the
/// same convention from every client.
#[derive(Clone)]
pub struct Endpoint {
    base: Url,
    path: String,
    token: Option<SecretString>,
}

impl Endpoint {
    /// Builds an endpoint from a base URL and a path.
    ///
    /// `http`/`https` base URLs are mapped to `ws`/`wss`. Any path already
    /// present on the base URL is kept as a prefix.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the base URL does not parse, has no host,
    /// uses an unsupported scheme, or the path is not absolute.
    pub fn new(
        base_url: &str,
        path: &str,
        token: Option<SecretString>,
    ) -> Result<Self, ValidationError> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(ValidationError::empty_field("base_url"));
        }
        if !path.starts_with('/') {
            return Err(ValidationError::invalid_format(
                "path",
                format!("'{}' must start with '/'", path),
            ));
        }

        let normalized = if let Some(rest) = base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base_url.to_string()
        };

        let base = Url::parse(&normalized)
            .map_err(|e| ValidationError::invalid_format("base_url", e.to_string()))?;
        if !matches!(base.scheme(), "ws" | "wss") {
            return Err(ValidationError::invalid_format(
                "base_url",
                format!("unsupported scheme '{}'", base.scheme()),
            ));
        }
        if base.host_str().is_none() {
            return Err(ValidationError::invalid_format("base_url", "missing host"));
        }

        let prefix = base.path().trim_end_matches('/').to_string();
        Ok(Self {
            base,
            path: format!("{}{}", prefix, path),
            token: token.filter(|t| !t.expose_secret().trim().is_empty()),
        })
    }

    /// Full path component of the endpoint (base prefix included).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether a bearer credential is attached.
    pub fn has_credential(&self) -> bool {
        self.token.is_some()
    }

    /// URL without the credential, safe for logs.
    pub fn display_url(&self) -> String {
        let mut url = self.base.clone();
        url.set_path(&self.path);
        url.set_query(None);
        url.to_string()
    }

    /// URL to open, with the bearer token appended as `?token=`.
    ///
    /// # Errors
    ///
    /// Fails closed with `RealtimeError::MissingCredential` when no token is
    /// attached: the backend rejects anonymous sockets, so no attempt is made.
    pub fn connect_url(&self) -> Result<Url, RealtimeError> {
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| RealtimeError::MissingCredential {
                path: self.path.clone(),
            })?;

        let mut url = self.base.clone();
        url.set_path(&self.path);
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("token", token.expose_secret());
        Ok(url)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", &self.display_url())
            .field("has_credential", &self.has_credential())
            .finish()
    }
}
