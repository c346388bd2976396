//! Cache tag definitions.
//!
//! A `CacheTag` is an opaque label the rendering layer attaches to every
//! rendering it caches. Tags fall into three informal namespaces: global
//! collection tags, category-scoped tags and entity-scoped tags.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Every recipe listing.
pub const TAG_ALL_RECIPES: &str = "recipes";
/// The "latest recipes" collection.
pub const TAG_LATEST: &str = "latest";
/// The "trending recipes" collection.
pub const TAG_TRENDING: &str = "trending";
/// The categories index page.
pub const TAG_CATEGORIES: &str = "categories";

/// Root route of the site.
pub const ROOT_PATH: &str = "/";

const ENTITY_PREFIX: &str = "entity-";
const CATEGORY_PREFIX: &str = "category-";

/// Immutable label identifying a group of cached renderings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheTag(String);

impl CacheTag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Global collection tags, invalidated on every mutation.
    pub fn global() -> [CacheTag; 4] {
        [
            Self::new(TAG_ALL_RECIPES),
            Self::new(TAG_LATEST),
            Self::new(TAG_TRENDING),
            Self::new(TAG_CATEGORIES),
        ]
    }

    /// `entity-{slug}`
    pub fn entity(slug: &str) -> Self {
        Self(format!("{ENTITY_PREFIX}{slug}"))
    }

    /// `category-{slug}`
    pub fn category(slug: &str) -> Self {
        Self(format!("{CATEGORY_PREFIX}{slug}"))
    }

    /// The bare-slug alias shared by entity and category namespaces.
    pub fn bare(slug: &str) -> Self {
        Self(slug.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CacheTag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for CacheTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
