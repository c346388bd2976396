//! Invalidation plan derivation.
//!
//! Maps a mutation and the identifying fields of the mutated recipe to the
//! tags and paths whose cached renderings became stale. Derivation is pure:
//! no I/O, no clock, no failure mode.

use std::fmt;

use super::keys::{CacheTag, ROOT_PATH};
use super::request::MutationAction;

/// Tags and paths to invalidate for one mutation.
///
/// Both lists keep derivation order (global, entity, category) and never
/// contain duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub action: MutationAction,
    pub tags: Vec<CacheTag>,
    pub paths: Vec<String>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ action: {}, tags: {}, paths: {} }}",
            self.action,
            self.tags.len(),
            self.paths.len(),
        )
    }
}

impl InvalidationPlan {
    /// Derive the full tag set for a mutation.
    ///
    /// - Global tags and the root path are always present.
    /// - Entity tags (`entity-{slug}` and `{slug}`) only for updates and
    ///   deletes; a created recipe has no cached detail page yet.
    /// - Category tags whenever a category is known: only `category-{slug}`
    ///   on create, both aliases on update and delete.
    ///
    /// Missing or empty slugs silently drop their namespace.
    pub fn derive(
        action: MutationAction,
        entity_slug: Option<&str>,
        category_slug: Option<&str>,
    ) -> Self {
        let mut plan = Self {
            action,
            tags: Vec::new(),
            paths: Vec::new(),
        };

        for tag in CacheTag::global() {
            plan.push_tag(tag);
        }
        plan.push_path(ROOT_PATH);

        let entity_slug = non_empty(entity_slug);
        let category_slug = non_empty(category_slug);

        match action {
            MutationAction::Created => {
                if let Some(category) = category_slug {
                    plan.push_tag(CacheTag::category(category));
                }
            }
            MutationAction::Updated | MutationAction::Deleted => {
                if let Some(slug) = entity_slug {
                    plan.push_tag(CacheTag::entity(slug));
                    plan.push_tag(CacheTag::bare(slug));
                }
                if let Some(category) = category_slug {
                    plan.push_tag(CacheTag::category(category));
                    plan.push_tag(CacheTag::bare(category));
                }
            }
        }

        plan
    }

    /// The subset that must be cleared before the mutation response returns.
    ///
    /// Only deletes have an immediate tier: the global collection tags and the
    /// root path, so listings never link to a recipe that no longer exists.
    pub fn immediate(&self) -> (Vec<CacheTag>, Vec<String>) {
        match self.action {
            MutationAction::Deleted => (
                CacheTag::global().into_iter().collect(),
                vec![ROOT_PATH.to_string()],
            ),
            MutationAction::Created | MutationAction::Updated => (Vec::new(), Vec::new()),
        }
    }

    pub fn has_immediate_tier(&self) -> bool {
        matches!(self.action, MutationAction::Deleted)
    }

    pub fn tag_strings(&self) -> Vec<String> {
        self.tags.iter().map(|tag| tag.as_str().to_string()).collect()
    }

    fn push_tag(&mut self, tag: CacheTag) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    fn push_path(&mut self, path: &str) {
        if !self.paths.iter().any(|existing| existing == path) {
            self.paths.push(path.to_string());
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::cache::keys::{TAG_ALL_RECIPES, TAG_CATEGORIES, TAG_LATEST, TAG_TRENDING};

    fn tag_set(plan: &InvalidationPlan) -> HashSet<&str> {
        plan.tags.iter().map(CacheTag::as_str).collect()
    }

    const GLOBAL: [&str; 4] = [TAG_ALL_RECIPES, TAG_LATEST, TAG_TRENDING, TAG_CATEGORIES];

    #[test]
    fn derivation_is_idempotent() {
        for action in [
            MutationAction::Created,
            MutationAction::Updated,
            MutationAction::Deleted,
        ] {
            let first = InvalidationPlan::derive(action, Some("x"), Some("dinner"));
            let second = InvalidationPlan::derive(action, Some("x"), Some("dinner"));
            assert_eq!(tag_set(&first), tag_set(&second));
            assert_eq!(first.paths, second.paths);
        }
    }

    #[test]
    fn create_omits_entity_tags_and_bare_category() {
        let plan = InvalidationPlan::derive(MutationAction::Created, Some("x"), Some("dinner"));
        let tags = tag_set(&plan);

        assert!(!tags.contains("entity-x"));
        assert!(!tags.contains("x"));
        assert!(tags.contains("category-dinner"));
        assert!(!tags.contains("dinner"));
        for global in GLOBAL {
            assert!(tags.contains(global), "missing {global}");
        }
        assert_eq!(plan.paths, vec!["/".to_string()]);
    }

    #[test]
    fn update_includes_entity_and_both_category_aliases() {
        let plan = InvalidationPlan::derive(
            MutationAction::Updated,
            Some("honey-chicken"),
            Some("dinner"),
        );
        let tags = tag_set(&plan);

        for expected in [
            "entity-honey-chicken",
            "honey-chicken",
            "category-dinner",
            "dinner",
        ] {
            assert!(tags.contains(expected), "missing {expected}");
        }
        for global in GLOBAL {
            assert!(tags.contains(global), "missing {global}");
        }
        assert_eq!(plan.tags.len(), 8);
        assert!(plan.paths.contains(&"/".to_string()));
    }

    #[test]
    fn missing_category_yields_no_category_tags() {
        for action in [
            MutationAction::Created,
            MutationAction::Updated,
            MutationAction::Deleted,
        ] {
            let plan = InvalidationPlan::derive(action, Some("lemon-cake"), None);
            assert!(
                plan.tags
                    .iter()
                    .all(|tag| !tag.as_str().starts_with("category-")),
                "{action} produced a category tag"
            );
        }
    }

    #[test]
    fn empty_fields_degrade_to_base_set() {
        let plan = InvalidationPlan::derive(MutationAction::Deleted, Some(""), Some("  "));
        assert_eq!(tag_set(&plan), GLOBAL.into_iter().collect());
        assert_eq!(plan.paths, vec!["/".to_string()]);

        let plan = InvalidationPlan::derive(MutationAction::Updated, None, None);
        assert_eq!(plan.tags.len(), 4);
    }

    #[test]
    fn colliding_bare_aliases_are_deduplicated() {
        let plan = InvalidationPlan::derive(MutationAction::Updated, Some("soup"), Some("soup"));
        let bare = plan.tags.iter().filter(|tag| tag.as_str() == "soup").count();
        assert_eq!(bare, 1);
    }

    #[test]
    fn delete_tag_order_is_stable() {
        let plan = InvalidationPlan::derive(
            MutationAction::Deleted,
            Some("lemon-cake"),
            Some("desserts"),
        );
        insta::assert_debug_snapshot!(plan.tag_strings(), @r###"
        [
            "recipes",
            "latest",
            "trending",
            "categories",
            "entity-lemon-cake",
            "lemon-cake",
            "category-desserts",
            "desserts",
        ]
        "###);
    }

    #[test]
    fn immediate_tier_only_for_deletes() {
        let delete = InvalidationPlan::derive(MutationAction::Deleted, Some("a"), Some("b"));
        let (tags, paths) = delete.immediate();
        assert_eq!(tags, CacheTag::global().to_vec());
        assert_eq!(paths, vec!["/".to_string()]);
        assert!(delete.has_immediate_tier());

        let update = InvalidationPlan::derive(MutationAction::Updated, Some("a"), Some("b"));
        let (tags, paths) = update.immediate();
        assert!(tags.is_empty());
        assert!(paths.is_empty());
        assert!(!update.has_immediate_tier());
    }

    #[test]
    fn display_format() {
        let plan = InvalidationPlan::derive(MutationAction::Created, None, None);
        let display = plan.to_string();
        assert!(display.contains("new-entity"));
        assert!(display.contains("tags: 4"));
    }
}
