// src/invalidation.rs - Static fan-out from mutations to stale views
use crate::cache::{view_key, TtlCache};
use tracing::debug;

/// Every write endpoint reports exactly one mutation kind. The mapping to
/// evicted views below is the coherency contract of the whole read side:
/// missing an entry here serves stale data until TTL expiry, while an extra
/// entry only costs a recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    ClassChanged,
    BudgetChanged,
    PlannerChanged,
    StudySessionRecorded,
    WellnessRecorded,
    StudyGoalCreated,
    QuizResultChanged,
}

impl Mutation {
    /// Views that can go stale when this mutation lands. "summary" is the
    /// legacy name of the budget overview view; some deployed clients still
    /// read it, so budget writes keep evicting it.
    pub fn stale_views(self) -> &'static [&'static str] {
        match self {
            Mutation::ClassChanged => &["classes", "dashboard-summary"],
            Mutation::BudgetChanged => &["budget", "dashboard-summary", "summary"],
            Mutation::PlannerChanged => &["planner", "dashboard-summary"],
            Mutation::StudySessionRecorded => &["dashboard-summary"],
            Mutation::WellnessRecorded => &["dashboard-summary"],
            Mutation::StudyGoalCreated => &["study-goals", "dashboard-summary"],
            Mutation::QuizResultChanged => {
                &["quiz-stats", "dashboard-summary", "quiz-performance"]
            }
        }
    }
}

/// Evicts every dependent view for one user. Fire-and-forget: runs inline on
/// the write's response path, touches no I/O and never retries.
pub fn invalidate(cache: &TtlCache, mutation: Mutation, user_id: &str) {
    for view in mutation.stale_views() {
        cache.delete(&view_key(view, user_id));
    }
    debug!(?mutation, user_id, "evicted dependent views");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    const ALL_VIEWS: &[&str] = &[
        "classes",
        "budget",
        "planner",
        "summary",
        "study-goals",
        "quiz-stats",
        "quiz-performance",
        "dashboard-summary",
    ];

    fn seeded_cache(users: &[&str]) -> TtlCache {
        let cache = TtlCache::new(Duration::from_secs(60));
        for user in users {
            for view in ALL_VIEWS {
                cache.set(view_key(view, user), json!(view), None);
            }
        }
        cache
    }

    fn surviving_views(cache: &TtlCache, user: &str) -> Vec<&'static str> {
        ALL_VIEWS
            .iter()
            .copied()
            .filter(|view| cache.has(&view_key(view, user)))
            .collect()
    }

    #[test]
    fn quiz_mutation_evicts_exactly_its_view_set() {
        let cache = seeded_cache(&["u1"]);
        invalidate(&cache, Mutation::QuizResultChanged, "u1");
        assert_eq!(
            surviving_views(&cache, "u1"),
            vec!["classes", "budget", "planner", "summary", "study-goals"]
        );
    }

    #[test]
    fn budget_mutation_evicts_legacy_summary_view_too() {
        let cache = seeded_cache(&["u1"]);
        invalidate(&cache, Mutation::BudgetChanged, "u1");
        assert!(!cache.has(&view_key("budget", "u1")));
        assert!(!cache.has(&view_key("summary", "u1")));
        assert!(!cache.has(&view_key("dashboard-summary", "u1")));
        assert!(cache.has(&view_key("quiz-stats", "u1")));
    }

    #[test]
    fn other_users_keys_are_untouched() {
        let cache = seeded_cache(&["u1", "u2"]);
        invalidate(&cache, Mutation::ClassChanged, "u1");
        assert!(!cache.has(&view_key("classes", "u1")));
        assert_eq!(surviving_views(&cache, "u2"), ALL_VIEWS.to_vec());
    }

    #[test]
    fn every_mutation_evicts_the_dashboard() {
        for mutation in [
            Mutation::ClassChanged,
            Mutation::BudgetChanged,
            Mutation::PlannerChanged,
            Mutation::StudySessionRecorded,
            Mutation::WellnessRecorded,
            Mutation::StudyGoalCreated,
            Mutation::QuizResultChanged,
        ] {
            assert!(
                mutation.stale_views().contains(&"dashboard-summary"),
                "{mutation:?} must evict the dashboard"
            );
        }
    }

    #[test]
    fn invalidating_an_empty_cache_is_harmless() {
        let cache = TtlCache::new(Duration::from_secs(60));
        invalidate(&cache, Mutation::WellnessRecorded, "ghost");
        assert!(cache.is_empty());
    }
}
