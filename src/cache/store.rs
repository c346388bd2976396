//! Cache store abstraction.
//!
//! `CacheStore` is the seam to whatever caching/rendering layer hosts the
//! site. The engine only ever asks it to drop renderings, by tag or by exact
//! path. `MemoryCacheStore` is the in-process implementation used by local
//! development and tests; `RemotePurgeStore` talks to a purge API.

use std::collections::HashSet;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::{DashMap, mapref::entry::Entry};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use super::keys::CacheTag;
use super::registry::CacheRegistry;

/// Invalidation primitives provided by the hosting layer.
///
/// Implementations must tolerate concurrent calls from many in-flight
/// mutations. Invalidating a tag that maps to nothing is a successful no-op.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Drop every cached rendering associated with `tag`.
    async fn invalidate_tag(&self, tag: &CacheTag) -> Result<(), CacheStoreError>;

    /// Drop the cached rendering for an exact route.
    async fn invalidate_path(&self, path: &str) -> Result<(), CacheStoreError>;

    /// Short backend label for logs and metrics.
    fn backend(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheStoreError {
    #[error("cache backend unavailable: {message}")]
    Unavailable { message: String },
    #[error("purge of `{target}` rejected with status {status}")]
    Status { target: String, status: u16 },
    #[error("purge transport error: {0}")]
    Transport(String),
}

impl CacheStoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// A cached rendering of one route.
#[derive(Debug, Clone)]
pub struct Rendering {
    pub body: Bytes,
    pub tags: HashSet<CacheTag>,
    pub stored_at: OffsetDateTime,
}

/// In-memory rendering cache with a tag index.
///
/// Renderings and the tag index are both sharded maps; invalidations of
/// distinct tags proceed independently. Writers touching one path hold its
/// rendering entry while updating the index, so a rendering is never left
/// cached without the tags that reach it.
#[derive(Default)]
pub struct MemoryCacheStore {
    renderings: DashMap<String, Rendering>,
    registry: CacheRegistry,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache a rendering for `path` under `tags`, replacing any previous one.
    pub fn insert<I, T>(&self, path: &str, tags: I, body: impl Into<Bytes>)
    where
        I: IntoIterator<Item = T>,
        T: Into<CacheTag>,
    {
        let tags: HashSet<CacheTag> = tags.into_iter().map(Into::into).collect();
        let entry = self.renderings.entry(path.to_string());
        self.registry.register(path, tags.clone());
        entry.insert(Rendering {
            body: body.into(),
            tags,
            stored_at: OffsetDateTime::now_utc(),
        });
    }

    pub fn get(&self, path: &str) -> Option<Rendering> {
        self.renderings.get(path).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.renderings.contains_key(path)
    }

    pub fn paths_for_tag(&self, tag: &CacheTag) -> HashSet<String> {
        self.registry.paths_for_tag(tag)
    }

    pub fn len(&self) -> usize {
        self.renderings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderings.is_empty()
    }

    fn evict(&self, path: &str) -> bool {
        match self.renderings.entry(path.to_string()) {
            Entry::Occupied(occupied) => {
                self.registry.unregister_path(path);
                occupied.remove();
                true
            }
            Entry::Vacant(_) => {
                self.registry.unregister_path(path);
                false
            }
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn invalidate_tag(&self, tag: &CacheTag) -> Result<(), CacheStoreError> {
        let paths = self.registry.take_tag(tag);
        let mut evicted = 0usize;
        for path in &paths {
            if self.evict(path) {
                evicted += 1;
            }
        }
        debug!(tag = %tag, evicted, "memory store: tag invalidated");
        Ok(())
    }

    async fn invalidate_path(&self, path: &str) -> Result<(), CacheStoreError> {
        let evicted = self.evict(path);
        debug!(path, evicted, "memory store: path invalidated");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
