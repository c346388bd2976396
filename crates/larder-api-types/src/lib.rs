//! Wire types for the larder revalidation endpoint.
//!
//! Mutation handlers living in other services depend on this crate to build
//! the `POST /api/revalidate` body and to decode its response without pulling
//! in the engine itself.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Path of the revalidation endpoint relative to the configured base URL.
pub const REVALIDATE_PATH: &str = "/api/revalidate";

/// The administrative write that made cached renderings stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationAction {
    #[serde(rename = "new-entity")]
    Created,
    #[serde(rename = "update-entity")]
    Updated,
    #[serde(rename = "delete-entity")]
    Deleted,
}

impl MutationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "new-entity",
            Self::Updated => "update-entity",
            Self::Deleted => "delete-entity",
        }
    }
}

impl fmt::Display for MutationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown action `{}` (expected new-entity, update-entity or delete-entity)",
            self.0
        )
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for MutationAction {
    type Err = UnknownAction;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "new-entity" => Ok(Self::Created),
            "update-entity" => Ok(Self::Updated),
            "delete-entity" => Ok(Self::Deleted),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// Body accepted by `POST /api/revalidate`.
///
/// Every field is optional on the wire so that a missing field surfaces as a
/// validation error from the endpoint instead of an opaque decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevalidatePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<MutationAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_category_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

/// Body returned by `POST /api/revalidate` once the request was processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevalidateResponse {
    pub success: bool,
    pub invalidated: Vec<String>,
    #[serde(default)]
    pub invalidated_paths: Vec<String>,
    /// Failed tags, keyed by tag.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
    /// Failed paths, keyed by path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub path_errors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}
