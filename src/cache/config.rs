//! Revalidation configuration.
//!
//! Resolved from the `[revalidation]` section of `larder.toml` (see
//! `crate::config`).

use std::time::Duration;

use larder_api_types::REVALIDATE_PATH;
use url::Url;

/// Local-development fallback for the revalidation boundary.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct RevalidationConfig {
    /// Skip all invalidation work when false.
    pub enabled: bool,
    /// Full URL of the revalidation endpoint.
    pub endpoint: Url,
    /// Shared secret presented to the executor.
    pub secret: Option<String>,
    /// Hard deadline for one dispatch.
    pub timeout: Duration,
}

impl Default for RevalidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: endpoint_for(&fallback_base_url()),
            secret: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl From<&crate::config::RevalidationSettings> for RevalidationConfig {
    fn from(settings: &crate::config::RevalidationSettings) -> Self {
        Self {
            enabled: settings.enabled,
            endpoint: endpoint_for(&settings.base_url),
            secret: settings.secret.clone(),
            timeout: settings.timeout,
        }
    }
}

impl RevalidationConfig {
    pub fn with_endpoint(mut self, base_url: &Url) -> Self {
        self.endpoint = endpoint_for(base_url);
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub(crate) fn fallback_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("fallback base URL is a valid URL")
}

/// Append the endpoint path to a base URL, keeping any base path prefix.
pub fn endpoint_for(base_url: &Url) -> Url {
    let mut endpoint = base_url.clone();
    let prefix = endpoint.path().trim_end_matches('/').to_string();
    endpoint.set_path(&format!("{prefix}{REVALIDATE_PATH}"));
    endpoint.set_query(None);
    endpoint
}
