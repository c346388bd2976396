//! Larder cache invalidation engine.
//!
//! Keeps cached recipe pages consistent with the system of record after a
//! mutation commits:
//!
//! - **Derivation**: a mutation maps to a deterministic set of cache tags
//!   (`InvalidationPlan`).
//! - **Immediate tier**: deletes clear the global listings inside the
//!   mutation request (`ImmediateInvalidator`).
//! - **Dispatch**: the full plan is sent to the revalidation endpoint on a
//!   detached task (`RevalidationDispatcher`).
//! - **Execution**: the endpoint authenticates the payload and invalidates
//!   every tag and path against a `CacheStore` (`RevalidationExecutor`).
//!
//! ## Configuration
//!
//! Controlled via `larder.toml`:
//!
//! ```toml
//! [revalidation]
//! enabled = true
//! base_url = "http://localhost:3000"
//! secret = "change-me"
//! timeout_ms = 5000
//!
//! [cache]
//! backend = "memory"
//! ```

mod config;
mod dispatch;
mod executor;
mod immediate;
mod keys;
mod outcome;
mod planner;
mod registry;
mod remote;
mod request;
mod store;
mod trigger;

pub use config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS, RevalidationConfig, endpoint_for};
pub use dispatch::{DispatchError, DispatchHandle, RevalidationDispatcher};
pub use executor::{ExecutorError, RevalidationExecutor};
pub use immediate::ImmediateInvalidator;
pub use keys::{CacheTag, ROOT_PATH, TAG_ALL_RECIPES, TAG_CATEGORIES, TAG_LATEST, TAG_TRENDING};
pub use outcome::InvalidationOutcome;
pub use planner::InvalidationPlan;
pub use registry::CacheRegistry;
pub use remote::RemotePurgeStore;
pub use request::{InvalidationRequest, MutationAction, RecipeSnapshot, RequestValidationError};
pub use store::{CacheStore, CacheStoreError, MemoryCacheStore, Rendering};
pub use trigger::{CacheTrigger, TriggerReport};

pub(crate) mod metric_names {
    pub(crate) use super::dispatch::{METRIC_DISPATCH_MS, METRIC_DISPATCH_TOTAL};
    pub(crate) use super::executor::{METRIC_EXECUTOR_REJECTED_TOTAL, METRIC_REVALIDATE_MS};
    pub(crate) use super::outcome::METRIC_INVALIDATIONS_TOTAL;
}
