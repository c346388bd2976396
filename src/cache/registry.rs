//! Bidirectional tag registry.
//!
//! Tracks which cached paths carry which tags, so a tag invalidation can find
//! every rendering it covers and a path eviction can clean up its tags.

use std::collections::HashSet;

use dashmap::DashMap;

use super::keys::CacheTag;

/// Tracks tag → paths and path → tags mappings.
///
/// Both maps are sharded (`DashMap`), so operations on distinct tags contend
/// only when they hash to the same shard. No method holds a guard on one map
/// while touching the other.
#[derive(Default)]
pub struct CacheRegistry {
    tag_to_paths: DashMap<CacheTag, HashSet<String>>,
    path_to_tags: DashMap<String, HashSet<CacheTag>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` under `tags`, replacing any previous tag set for it.
    pub fn register(&self, path: &str, tags: HashSet<CacheTag>) {
        let previous = self.path_to_tags.insert(path.to_string(), tags.clone());

        if let Some(previous) = previous {
            for stale in previous.difference(&tags) {
                self.detach(stale, path);
            }
        }

        for tag in tags {
            self.tag_to_paths
                .entry(tag)
                .or_default()
                .insert(path.to_string());
        }
    }

    pub fn paths_for_tag(&self, tag: &CacheTag) -> HashSet<String> {
        self.tag_to_paths
            .get(tag)
            .map(|paths| paths.clone())
            .unwrap_or_default()
    }

    /// Remove a tag and return the paths it covered.
    ///
    /// The returned paths stay registered under their other tags; callers
    /// evicting those paths follow up with [`CacheRegistry::unregister_path`].
    pub fn take_tag(&self, tag: &CacheTag) -> HashSet<String> {
        let Some((_, paths)) = self.tag_to_paths.remove(tag) else {
            return HashSet::new();
        };

        for path in &paths {
            if let Some(mut tags) = self.path_to_tags.get_mut(path) {
                tags.remove(tag);
            }
        }

        paths
    }

    /// Remove a path and detach it from every tag.
    pub fn unregister_path(&self, path: &str) -> HashSet<CacheTag> {
        let Some((_, tags)) = self.path_to_tags.remove(path) else {
            return HashSet::new();
        };

        for tag in &tags {
            self.detach(tag, path);
        }

        tags
    }

    fn detach(&self, tag: &CacheTag, path: &str) {
        if let Some(mut paths) = self.tag_to_paths.get_mut(tag) {
            paths.remove(path);
        }
        self.tag_to_paths.remove_if(tag, |_, paths| paths.is_empty());
    }
}
