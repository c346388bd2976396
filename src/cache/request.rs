//! Invalidation requests.
//!
//! An `InvalidationRequest` is built by a mutation handler, consumed once by
//! the dispatcher/executor pair and discarded. It is never persisted.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;
use uuid::Uuid;

pub use larder_api_types::MutationAction;
use larder_api_types::RevalidatePayload;

use super::keys::CacheTag;
use super::planner::InvalidationPlan;

/// Identifying fields of a recipe as committed to the system of record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeSnapshot {
    pub id: Uuid,
    pub slug: Option<String>,
    pub category_slug: Option<String>,
}

impl RecipeSnapshot {
    pub fn new(id: Uuid, slug: impl Into<String>, category_slug: Option<String>) -> Self {
        Self {
            id,
            slug: Some(slug.into()),
            category_slug,
        }
    }

    /// Derive the invalidation plan for `action` applied to this recipe.
    pub fn plan(&self, action: MutationAction) -> InvalidationPlan {
        InvalidationPlan::derive(action, self.slug.as_deref(), self.category_slug.as_deref())
    }
}

/// A validated request to revalidate a set of tags and paths.
#[derive(Clone, PartialEq, Eq)]
pub struct InvalidationRequest {
    pub action: MutationAction,
    pub entity_id: Option<Uuid>,
    pub entity_slug: Option<String>,
    pub entity_category_slug: Option<String>,
    pub tags: Vec<CacheTag>,
    pub paths: Vec<String>,
    pub shared_secret: String,
}

impl fmt::Debug for InvalidationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationRequest")
            .field("action", &self.action)
            .field("entity_id", &self.entity_id)
            .field("entity_slug", &self.entity_slug)
            .field("entity_category_slug", &self.entity_category_slug)
            .field("tags", &self.tags)
            .field("paths", &self.paths)
            .field("shared_secret", &"<redacted>")
            .finish()
    }
}

/// A required field was missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid revalidation request: {message}")]
pub struct RequestValidationError {
    pub message: String,
}

impl RequestValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl InvalidationRequest {
    /// Build a request carrying the full plan for `recipe`.
    pub fn from_plan(
        recipe: &RecipeSnapshot,
        plan: &InvalidationPlan,
        shared_secret: impl Into<String>,
    ) -> Self {
        Self {
            action: plan.action,
            entity_id: Some(recipe.id),
            entity_slug: recipe.slug.clone(),
            entity_category_slug: recipe.category_slug.clone(),
            tags: plan.tags.clone(),
            paths: plan.paths.clone(),
            shared_secret: shared_secret.into(),
        }
    }

    pub fn to_payload(&self) -> RevalidatePayload {
        RevalidatePayload {
            shared_secret: Some(self.shared_secret.clone()),
            action: Some(self.action),
            entity_id: self.entity_id,
            entity_slug: self.entity_slug.clone(),
            entity_category_slug: self.entity_category_slug.clone(),
            tags: Some(
                self.tags
                    .iter()
                    .map(|tag| tag.as_str().to_string())
                    .collect(),
            ),
            paths: self.paths.clone(),
        }
    }
}

impl TryFrom<RevalidatePayload> for InvalidationRequest {
    type Error = RequestValidationError;

    /// Validate a wire payload once, at the boundary.
    fn try_from(payload: RevalidatePayload) -> Result<Self, Self::Error> {
        let shared_secret = payload
            .shared_secret
            .ok_or_else(|| RequestValidationError::new("`sharedSecret` is required"))?;
        let action = payload
            .action
            .ok_or_else(|| RequestValidationError::new("`action` is required"))?;
        let raw_tags = payload
            .tags
            .ok_or_else(|| RequestValidationError::new("`tags` is required"))?;

        let tags: Vec<CacheTag> = dedupe(raw_tags).into_iter().map(CacheTag::new).collect();
        if tags.iter().any(CacheTag::is_blank) {
            return Err(RequestValidationError::new("`tags` must not contain blank entries"));
        }
        if let Some(path) = payload.paths.iter().find(|path| !path.starts_with('/')) {
            return Err(RequestValidationError::new(format!(
                "path `{path}` must start with `/`"
            )));
        }

        let paths = dedupe(payload.paths);

        Ok(Self {
            action,
            entity_id: payload.entity_id,
            entity_slug: payload.entity_slug.filter(|slug| !slug.trim().is_empty()),
            entity_category_slug: payload
                .entity_category_slug
                .filter(|slug| !slug.trim().is_empty()),
            tags,
            paths,
            shared_secret,
        })
    }
}

/// Drop repeats, keeping the first occurrence of each value.
fn dedupe(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(values.len());
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}
