//! Per-category token bucket limits and window sizing (spec.md §3, §6
//! "canonical rate-limit category names").

use logoforge_domain::RateCategory;
use std::time::Duration;

/// `(limit, window)` for one category's token bucket.
#[derive(Debug, Clone, Copy)]
pub struct CategoryLimit {
    pub limit: u32,
    pub window: Duration,
}

/// Default limits, one day windows for the generation-heavy categories and
/// shorter windows for cheap read endpoints. Overridable per deployment via
/// `RateLimits::with_override`.
#[derive(Debug, Clone)]
pub struct RateLimits {
    generate_concept: CategoryLimit,
    refine_concept: CategoryLimit,
    store_concept: CategoryLimit,
    get_concepts: CategoryLimit,
    export_action: CategoryLimit,
    auth_sessions: CategoryLimit,
}

impl Default for RateLimits {
    fn default() -> Self {
        let day = Duration::from_secs(24 * 3600);
        let hour = Duration::from_secs(3600);
        Self {
            generate_concept: CategoryLimit { limit: 10, window: day },
            refine_concept: CategoryLimit { limit: 10, window: day },
            store_concept: CategoryLimit { limit: 20, window: day },
            get_concepts: CategoryLimit { limit: 60, window: hour },
            export_action: CategoryLimit { limit: 30, window: hour },
            auth_sessions: CategoryLimit { limit: 10, window: hour },
        }
    }
}

impl RateLimits {
    pub fn for_category(&self, category: RateCategory) -> CategoryLimit {
        match category {
            RateCategory::GenerateConcept => self.generate_concept,
            RateCategory::RefineConcept => self.refine_concept,
            RateCategory::StoreConcept => self.store_concept,
            RateCategory::GetConcepts => self.get_concepts,
            RateCategory::ExportAction => self.export_action,
            RateCategory::AuthSessions => self.auth_sessions,
        }
    }

    pub fn with_override(mut self, category: RateCategory, limit: CategoryLimit) -> Self {
        match category {
            RateCategory::GenerateConcept => self.generate_concept = limit,
            RateCategory::RefineConcept => self.refine_concept = limit,
            RateCategory::StoreConcept => self.store_concept = limit,
            RateCategory::GetConcepts => self.get_concepts = limit,
            RateCategory::ExportAction => self.export_action = limit,
            RateCategory::AuthSessions => self.auth_sessions = limit,
        }
        self
    }

    pub fn all_categories() -> [RateCategory; 6] {
        [
            RateCategory::GenerateConcept,
            RateCategory::RefineConcept,
            RateCategory::StoreConcept,
            RateCategory::GetConcepts,
            RateCategory::ExportAction,
            RateCategory::AuthSessions,
        ]
    }
}
