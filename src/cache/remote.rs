//! HTTP purge API backend.
//!
//! Forwards tag and path invalidations to the CDN/ISR layer:
//!
//! - `POST {purge_url}/tags`  with `{"tag": "..."}`
//! - `POST {purge_url}/paths` with `{"path": "..."}`
//!
//! A `404` means the layer has nothing cached under that key and counts as
//! success.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::keys::CacheTag;
use super::store::{CacheStore, CacheStoreError};

#[derive(Serialize)]
struct TagPurge<'a> {
    tag: &'a str,
}

#[derive(Serialize)]
struct PathPurge<'a> {
    path: &'a str,
}

/// `CacheStore` backed by a remote purge endpoint.
#[derive(Clone, Debug)]
pub struct RemotePurgeStore {
    client: Client,
    tags_url: Url,
    paths_url: Url,
    token: Option<String>,
}

impl RemotePurgeStore {
    pub fn new(
        purge_url: &Url,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CacheStoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("larder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| CacheStoreError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            tags_url: join(purge_url, "tags")?,
            paths_url: join(purge_url, "paths")?,
            token,
        })
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        url: &Url,
        target: &str,
        body: &T,
    ) -> Result<(), CacheStoreError> {
        let mut request = self.client.post(url.clone()).json(body);
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| CacheStoreError::Transport(err.to_string()))?;
        let status = response.status();

        if status.is_success() || status == StatusCode::NOT_FOUND {
            debug!(target_key = target, status = status.as_u16(), "purge accepted");
            return Ok(());
        }

        Err(CacheStoreError::Status {
            target: target.to_string(),
            status: status.as_u16(),
        })
    }
}

fn join(base: &Url, segment: &str) -> Result<Url, CacheStoreError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(segment)
        .map_err(|err| CacheStoreError::unavailable(format!("invalid purge url: {err}")))
}

#[async_trait]
impl CacheStore for RemotePurgeStore {
    async fn invalidate_tag(&self, tag: &CacheTag) -> Result<(), CacheStoreError> {
        self.post(&self.tags_url, tag.as_str(), &TagPurge { tag: tag.as_str() })
            .await
    }

    async fn invalidate_path(&self, path: &str) -> Result<(), CacheStoreError> {
        self.post(&self.paths_url, path, &PathPurge { path }).await
    }

    fn backend(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_joined_below_base_path() {
        let base = Url::parse("https://cdn.example.com/purge").expect("valid url");
        let store = RemotePurgeStore::new(&base, None, Duration::from_secs(1))
            .expect("store should build");

        assert_eq!(store.tags_url.as_str(), "https://cdn.example.com/purge/tags");
        assert_eq!(store.paths_url.as_str(), "https://cdn.example.com/purge/paths");
    }

    #[test]
    fn trailing_slash_base_is_preserved() {
        let base = Url::parse("https://cdn.example.com/").expect("valid url");
        let store = RemotePurgeStore::new(&base, Some("token".into()), Duration::from_secs(1))
            .expect("store should build");

        assert_eq!(store.tags_url.as_str(), "https://cdn.example.com/tags");
        assert_eq!(store.backend(), "remote");
    }
}
