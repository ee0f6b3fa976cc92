//! Configuration types for the search engine connection.

/// Default upload size limit in bytes.
pub const DEFAULT_UPLOAD_LIMIT: usize = 8_000_000;

/// Default keep-alive for scroll contexts.
pub const DEFAULT_SCROLL_KEEP_ALIVE: &str = "5m";

/// Connection and sizing settings for the search engine.
///
/// A config without a URL describes a deployment where search is switched
/// off; indexers built from it report themselves as disabled.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// The OpenSearch server URL (e.g., "http://localhost:9200").
    pub url: Option<String>,
    /// Basic-auth user name.
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
    /// Largest request body the deployment accepts, in bytes.
    pub upload_limit: usize,
    /// Keep-alive passed with every scroll request.
    pub scroll_keep_alive: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            upload_limit: DEFAULT_UPLOAD_LIMIT,
            scroll_keep_alive: DEFAULT_SCROLL_KEEP_ALIVE.to_string(),
        }
    }
}

impl SearchConfig {
    /// Create a config pointing at the given server.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Set the upload limit.
    pub fn upload_limit(mut self, bytes: usize) -> Self {
        self.upload_limit = bytes;
        self
    }

    /// Set basic-auth credentials.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Whether a search engine connection is configured.
    pub fn is_enabled(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}
