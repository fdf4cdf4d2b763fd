//! Customer selection: trigger-specific targeting, lifecycle cohorts,
//! disjoint campaign grouping and holiday prioritisation.

pub mod engine;
pub mod grouping;
pub mod holidays;
pub mod lifecycle;
pub mod predicates;

pub use engine::{SegmentationEngine, TargetingOutcome};
pub use grouping::GroupingEngine;
pub use holidays::{holiday_score, select_primary_holiday};
pub use lifecycle::{CampaignCandidate, CohortIndex, CohortKind, LifecycleAnalyzer};
pub use predicates::{ServicePriority, VehiclePredicate};

#[cfg(test)]
pub(crate) mod fixtures;
