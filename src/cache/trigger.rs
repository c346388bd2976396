//! Cache trigger service.
//!
//! The entry point mutation handlers call after a recipe write commits. It
//! derives the invalidation plan, runs the immediate tier when the mutation
//! needs one, and hands the full plan to the dispatcher.

use futures::future::join_all;
use tracing::{debug, warn};

use super::config::RevalidationConfig;
use super::dispatch::{DispatchError, DispatchHandle, RevalidationDispatcher};
use super::immediate::ImmediateInvalidator;
use super::outcome::InvalidationOutcome;
use super::planner::InvalidationPlan;
use super::request::{MutationAction, RecipeSnapshot};

/// What a trigger call did.
#[derive(Debug)]
pub struct TriggerReport {
    pub plan: InvalidationPlan,
    /// Present when the immediate tier ran.
    pub immediate: Option<InvalidationOutcome>,
    pub dispatch: DispatchHandle,
}

/// Cache trigger for recipe mutations.
///
/// # Usage
///
/// ```ignore
/// // After a recipe delete commits:
/// trigger.recipe_deleted(&snapshot).await;
/// ```
pub struct CacheTrigger {
    immediate: ImmediateInvalidator,
    dispatcher: RevalidationDispatcher,
}

impl CacheTrigger {
    pub fn new(immediate: ImmediateInvalidator, dispatcher: RevalidationDispatcher) -> Self {
        Self {
            immediate,
            dispatcher,
        }
    }

    pub fn config(&self) -> &RevalidationConfig {
        self.dispatcher.config()
    }

    /// Run the invalidation for `action` on `recipe`.
    ///
    /// Never fails: immediate-tier failures are itemized in the report and
    /// dispatch failures are logged by the detached task.
    pub async fn trigger(&self, action: MutationAction, recipe: &RecipeSnapshot) -> TriggerReport {
        let plan = recipe.plan(action);

        if !self.config().enabled {
            debug!(%plan, "Cache trigger skipped: revalidation disabled");
            return TriggerReport {
                plan,
                immediate: None,
                dispatch: DispatchHandle::skipped(DispatchError::Disabled),
            };
        }

        let immediate = if plan.has_immediate_tier() {
            let (tags, paths) = plan.immediate();
            Some(self.immediate.invalidate_now(&tags, &paths).await)
        } else {
            None
        };

        let dispatch = match self.dispatcher.request_for(recipe, &plan) {
            Ok(request) => self.dispatcher.dispatch(request),
            Err(err) => {
                warn!(
                    action = %action,
                    recipe_id = %recipe.id,
                    error = %err,
                    "Revalidation dispatch skipped"
                );
                DispatchHandle::skipped(err)
            }
        };

        TriggerReport {
            plan,
            immediate,
            dispatch,
        }
    }

    pub async fn recipe_created(&self, recipe: &RecipeSnapshot) -> TriggerReport {
        self.trigger(MutationAction::Created, recipe).await
    }

    pub async fn recipe_updated(&self, recipe: &RecipeSnapshot) -> TriggerReport {
        self.trigger(MutationAction::Updated, recipe).await
    }

    pub async fn recipe_deleted(&self, recipe: &RecipeSnapshot) -> TriggerReport {
        self.trigger(MutationAction::Deleted, recipe).await
    }

    /// Bulk delete: every recipe gets its own plan and dispatch.
    pub async fn recipes_deleted(&self, recipes: &[RecipeSnapshot]) -> Vec<TriggerReport> {
        join_all(recipes.iter().map(|recipe| self.recipe_deleted(recipe))).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::cache::store::MemoryCacheStore;

    fn trigger_with(config: RevalidationConfig) -> (CacheTrigger, Arc<MemoryCacheStore>) {
        let store = Arc::new(MemoryCacheStore::new());
        store.insert("/", ["recipes", "latest"], "home");
        store.insert("/trending", ["trending"], "trending");
        store.insert("/recipes/lemon-cake", ["entity-lemon-cake"], "cake");

        let trigger = CacheTrigger::new(
            ImmediateInvalidator::new(store.clone()),
            RevalidationDispatcher::new(config).expect("client builds"),
        );
        (trigger, store)
    }

    fn lemon_cake() -> RecipeSnapshot {
        RecipeSnapshot::new(Uuid::new_v4(), "lemon-cake", Some("desserts".to_string()))
    }

    #[tokio::test]
    async fn delete_runs_immediate_tier_before_returning() {
        let (trigger, store) = trigger_with(RevalidationConfig::default());

        let report = trigger.recipe_deleted(&lemon_cake()).await;

        let immediate = report.immediate.expect("delete has an immediate tier");
        assert!(immediate.is_success());
        assert!(!store.contains("/"));
        assert!(!store.contains("/trending"));
        // entity tags are left to the dispatcher
        assert!(store.contains("/recipes/lemon-cake"));

        assert!(report.dispatch.is_skipped());
        assert!(matches!(
            report.dispatch.outcome().await,
            Err(DispatchError::MissingSecret)
        ));
    }

    #[tokio::test]
    async fn update_has_no_immediate_tier() {
        let (trigger, store) = trigger_with(RevalidationConfig::default());

        let report = trigger.recipe_updated(&lemon_cake()).await;

        assert!(report.immediate.is_none());
        assert_eq!(report.plan.tags.len(), 8);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn disabled_trigger_touches_nothing() {
        let config = RevalidationConfig {
            enabled: false,
            ..RevalidationConfig::default()
        };
        let (trigger, store) = trigger_with(config);

        let report = trigger.recipe_deleted(&lemon_cake()).await;

        assert!(report.immediate.is_none());
        assert_eq!(store.len(), 3);
        assert!(matches!(
            report.dispatch.outcome().await,
            Err(DispatchError::Disabled)
        ));
    }

    #[tokio::test]
    async fn bulk_delete_plans_each_recipe() {
        let (trigger, _store) = trigger_with(RevalidationConfig::default());
        let recipes = vec![
            lemon_cake(),
            RecipeSnapshot::new(Uuid::new_v4(), "honey-chicken", Some("dinner".to_string())),
        ];

        let reports = trigger.recipes_deleted(&recipes).await;

        assert_eq!(reports.len(), 2);
        assert!(
            reports[1]
                .plan
                .tags
                .iter()
                .any(|tag| tag.as_str() == "entity-honey-chicken")
        );
    }
}
