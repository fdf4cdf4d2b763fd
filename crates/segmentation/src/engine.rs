//! Targeting engine: turns a location and trigger into the customers eligible
//! for a run.

use std::sync::Arc;

use campaign_core::config::TargetingConfig;
use campaign_core::error::CampaignError;
use campaign_core::providers::{bounded, CampaignStore};
use campaign_core::types::{Customer, TriggerKind};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::predicates::{is_service_candidate, ServicePriority};

/// Result of a targeting pass. A lookup failure yields an empty customer
/// list and the error that caused it; it never propagates further.
#[derive(Debug, Default)]
pub struct TargetingOutcome {
    pub customers: Vec<Customer>,
    pub error: Option<CampaignError>,
}

pub struct SegmentationEngine {
    store: Arc<dyn CampaignStore>,
    config: TargetingConfig,
    lookup_timeout_ms: u64,
}

impl SegmentationEngine {
    pub fn new(store: Arc<dyn CampaignStore>, config: TargetingConfig, lookup_timeout_ms: u64) -> Self {
        Self {
            store,
            config,
            lookup_timeout_ms,
        }
    }

    /// Weather and holiday runs select every customer whose preferred
    /// location equals `location`. Lifecycle and scheduled runs ignore the
    /// location and select customers with at least one vehicle matching a
    /// service-need predicate, ordered by service priority.
    pub async fn select(
        &self,
        location: &str,
        trigger: TriggerKind,
        today: NaiveDate,
    ) -> TargetingOutcome {
        let result = if trigger.is_location_based() {
            self.by_location(location).await
        } else {
            self.by_service_need(today).await
        };

        match result {
            Ok(customers) => {
                info!(
                    location = %location,
                    trigger = %trigger,
                    targeted = customers.len(),
                    "Targeting complete"
                );
                TargetingOutcome {
                    customers,
                    error: None,
                }
            }
            Err(err) => {
                warn!(location = %location, trigger = %trigger, error = %err, "Targeting lookup failed");
                TargetingOutcome {
                    customers: Vec::new(),
                    error: Some(lookup_failure(err)),
                }
            }
        }
    }

    async fn by_location(&self, location: &str) -> Result<Vec<Customer>, CampaignError> {
        if location.trim().is_empty() {
            warn!("No location given for a location-based run");
            return Ok(Vec::new());
        }

        let customers = bounded(
            "customer lookup by location",
            self.lookup_timeout_ms,
            self.store.customers_by_location(location),
        )
        .await?;

        Ok(customers
            .into_iter()
            .filter(|c| c.preferred_location.as_deref() == Some(location))
            .filter(has_contact_address)
            .collect())
    }

    async fn by_service_need(&self, today: NaiveDate) -> Result<Vec<Customer>, CampaignError> {
        let customers = bounded(
            "customer lookup by vehicle",
            self.lookup_timeout_ms,
            self.store.customers_with_vehicles(),
        )
        .await?;
        debug!(candidates = customers.len(), "Evaluating service-need predicates");
        Ok(rank_service_candidates(customers, today, &self.config))
    }
}

/// Keeps customers with a matching vehicle, retaining only the matching
/// vehicles, and orders them by best vehicle priority then customer id.
pub fn rank_service_candidates(
    customers: Vec<Customer>,
    today: NaiveDate,
    cfg: &TargetingConfig,
) -> Vec<Customer> {
    let mut ranked: Vec<(ServicePriority, Customer)> = customers
        .into_iter()
        .filter(has_contact_address)
        .filter_map(|mut customer| {
            customer
                .vehicles
                .retain(|v| is_service_candidate(v, today, cfg));
            let priority = customer
                .vehicles
                .iter()
                .map(|v| ServicePriority::of(v, today, cfg))
                .min()?;
            Some((priority, customer))
        })
        .collect();

    ranked.sort_by(|(pa, a), (pb, b)| pa.cmp(pb).then(a.id.cmp(&b.id)));
    ranked.into_iter().map(|(_, customer)| customer).collect()
}

fn has_contact_address(customer: &Customer) -> bool {
    customer.email.contains('@')
}

fn lookup_failure(err: CampaignError) -> CampaignError {
    match err {
        CampaignError::Lookup(_) | CampaignError::Timeout { .. } => err,
        other => CampaignError::Lookup(other.to_string()),
    }
}
