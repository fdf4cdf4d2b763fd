//! Lifecycle analyzer: buckets targeted customers into ownership, mileage,
//! warranty and service-due cohorts.
//!
//! Cohorts overlap. A customer with an old, high-mileage, overdue vehicle
//! sits in several cohorts at once; the cohort index is a multi-membership
//! map and is never used as a dispatch unit.

use std::collections::BTreeMap;
use std::fmt;

use campaign_core::config::LifecycleConfig;
use campaign_core::types::{Customer, CustomerId, ServiceNeed, Vehicle};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CohortKind {
    NewOwners,
    EarlyOwners,
    MidOwners,
    VeteranOwners,
    HighMileage,
    UltraHighMileage,
    WarrantyExpiring,
    ServiceDue,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    OwnershipMilestone,
    MileageBased,
    WarrantyExpiring,
    ServiceOverdue,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Medium,
    High,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Medium => "medium",
            Level::High => "high",
            Level::Critical => "critical",
        }
    }
}

/// Static messaging metadata attached to every cohort.
#[derive(Debug, Serialize)]
pub struct CohortProfile {
    pub campaign_type: CampaignType,
    pub title: &'static str,
    pub priority: Level,
    pub urgency: Level,
    pub benefits: [&'static str; 4],
    pub cta: &'static str,
}

static NEW_OWNERS: CohortProfile = CohortProfile {
    campaign_type: CampaignType::OwnershipMilestone,
    title: "Welcome to the Family - Free First Service",
    priority: Level::High,
    urgency: Level::Medium,
    benefits: [
        "Complimentary first service check",
        "Welcome to loyalty program",
        "Vehicle health assessment",
        "Maintenance schedule planning",
    ],
    cta: "Book Your Free First Service",
};

static EARLY_OWNERS: CohortProfile = CohortProfile {
    campaign_type: CampaignType::OwnershipMilestone,
    title: "Keep Your Vehicle Running Like New",
    priority: Level::Medium,
    urgency: Level::Medium,
    benefits: [
        "20% off minor service packages",
        "Brake and battery health check",
        "Tire rotation and alignment",
        "Loyalty points bonus",
    ],
    cta: "Maintain Peak Performance",
};

static MID_OWNERS: CohortProfile = CohortProfile {
    campaign_type: CampaignType::OwnershipMilestone,
    title: "Mid-Life Vehicle Care Package",
    priority: Level::High,
    urgency: Level::Medium,
    benefits: [
        "Comprehensive brake system check",
        "Battery replacement service",
        "Fluid system maintenance",
        "AC system cleaning",
    ],
    cta: "Extend Vehicle Life",
};

static VETERAN_OWNERS: CohortProfile = CohortProfile {
    campaign_type: CampaignType::OwnershipMilestone,
    title: "Veteran Vehicle Major Service Package",
    priority: Level::High,
    urgency: Level::High,
    benefits: [
        "Major service inspection",
        "Timing belt replacement",
        "Suspension system check",
        "Engine performance optimization",
    ],
    cta: "Schedule Major Service",
};

static HIGH_MILEAGE: CohortProfile = CohortProfile {
    campaign_type: CampaignType::MileageBased,
    title: "High-Mileage Vehicle Care",
    priority: Level::High,
    urgency: Level::High,
    benefits: [
        "Tire replacement packages",
        "Brake pad and disc service",
        "Battery replacement options",
        "Extended warranty plans",
    ],
    cta: "Protect Your Investment",
};

static ULTRA_HIGH_MILEAGE: CohortProfile = CohortProfile {
    campaign_type: CampaignType::MileageBased,
    title: "Ultra High-Mileage Specialist Care",
    priority: Level::Critical,
    urgency: Level::High,
    benefits: [
        "Complete engine overhaul packages",
        "Transmission service specials",
        "Cooling system replacement",
        "Major component warranties",
    ],
    cta: "Comprehensive Care Package",
};

static WARRANTY_EXPIRING: CohortProfile = CohortProfile {
    campaign_type: CampaignType::WarrantyExpiring,
    title: "Warranty Expiring - Extended Protection Available",
    priority: Level::Critical,
    urgency: Level::High,
    benefits: [
        "Extended warranty options",
        "Pre-expiry comprehensive inspection",
        "Priority service booking",
        "Special extended coverage rates",
    ],
    cta: "Secure Your Coverage",
};

static SERVICE_DUE: CohortProfile = CohortProfile {
    campaign_type: CampaignType::ServiceOverdue,
    title: "Important: Service Overdue - Book Now",
    priority: Level::Critical,
    urgency: Level::High,
    benefits: [
        "Emergency service booking",
        "Health and safety inspection",
        "Preventive maintenance package",
        "Same-day service options",
    ],
    cta: "Book Emergency Service",
};

impl CohortKind {
    pub const ALL: [CohortKind; 8] = [
        CohortKind::NewOwners,
        CohortKind::EarlyOwners,
        CohortKind::MidOwners,
        CohortKind::VeteranOwners,
        CohortKind::HighMileage,
        CohortKind::UltraHighMileage,
        CohortKind::WarrantyExpiring,
        CohortKind::ServiceDue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CohortKind::NewOwners => "new_owners",
            CohortKind::EarlyOwners => "early_owners",
            CohortKind::MidOwners => "mid_owners",
            CohortKind::VeteranOwners => "veteran_owners",
            CohortKind::HighMileage => "high_mileage",
            CohortKind::UltraHighMileage => "ultra_high_mileage",
            CohortKind::WarrantyExpiring => "warranty_expiring",
            CohortKind::ServiceDue => "service_due",
        }
    }

    pub fn profile(&self) -> &'static CohortProfile {
        match self {
            CohortKind::NewOwners => &NEW_OWNERS,
            CohortKind::EarlyOwners => &EARLY_OWNERS,
            CohortKind::MidOwners => &MID_OWNERS,
            CohortKind::VeteranOwners => &VETERAN_OWNERS,
            CohortKind::HighMileage => &HIGH_MILEAGE,
            CohortKind::UltraHighMileage => &ULTRA_HIGH_MILEAGE,
            CohortKind::WarrantyExpiring => &WARRANTY_EXPIRING,
            CohortKind::ServiceDue => &SERVICE_DUE,
        }
    }

    /// The messaging angle implied by a service-need group. General service
    /// has no dedicated cohort. Mileage is read from each member's primary
    /// vehicle, the same vehicle the cohort index buckets on.
    pub fn angle_for(need: ServiceNeed, members: &[Customer], cfg: &LifecycleConfig) -> Option<Self> {
        match need {
            ServiceNeed::WarrantyExpiring => Some(CohortKind::WarrantyExpiring),
            ServiceNeed::ServiceOverdue => Some(CohortKind::ServiceDue),
            ServiceNeed::HighMileage => {
                let ultra = members.iter().any(|c| {
                    c.primary_vehicle()
                        .is_some_and(|v| v.mileage.unwrap_or(0) >= cfg.ultra_high_mileage_km)
                });
                Some(if ultra {
                    CohortKind::UltraHighMileage
                } else {
                    CohortKind::HighMileage
                })
            }
            ServiceNeed::GeneralService => None,
        }
    }
}

impl fmt::Display for CohortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived lifecycle quantities for one vehicle at a given date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecycleMetrics {
    pub vehicle_age_years: f64,
    pub mileage: u32,
    pub days_since_service: i64,
    pub days_until_warranty_expiry: Option<i64>,
}

/// Customer ids per cohort. One id may appear under several cohorts.
#[derive(Debug, Clone, Default)]
pub struct CohortIndex {
    members: BTreeMap<CohortKind, Vec<CustomerId>>,
}

impl CohortIndex {
    pub fn insert(&mut self, cohort: CohortKind, customer_id: CustomerId) {
        self.members.entry(cohort).or_default().push(customer_id);
    }

    pub fn members(&self, cohort: CohortKind) -> &[CustomerId] {
        self.members.get(&cohort).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cohorts_of(&self, customer_id: CustomerId) -> Vec<CohortKind> {
        self.members
            .iter()
            .filter(|(_, ids)| ids.contains(&customer_id))
            .map(|(cohort, _)| *cohort)
            .collect()
    }

    /// The cohort holding the most of `ids`. Ties go to the higher-priority
    /// profile, then to declaration order. `None` when none of `ids` is
    /// indexed.
    pub fn dominant_among(&self, ids: &[CustomerId]) -> Option<CohortKind> {
        let mut best: Option<(CohortKind, usize)> = None;
        for (cohort, members) in self.non_empty() {
            let count = members.iter().filter(|id| ids.contains(id)).count();
            if count == 0 {
                continue;
            }
            let better = match best {
                None => true,
                Some((current, best_count)) => {
                    count > best_count
                        || (count == best_count
                            && cohort.profile().priority > current.profile().priority)
                }
            };
            if better {
                best = Some((cohort, count));
            }
        }
        best.map(|(cohort, _)| cohort)
    }

    /// Non-empty cohorts in declaration order.
    pub fn non_empty(&self) -> impl Iterator<Item = (CohortKind, &[CustomerId])> {
        self.members
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(cohort, ids)| (*cohort, ids.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.non_empty().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One campaign angle per non-empty cohort.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignCandidate {
    pub cohort: CohortKind,
    pub profile: &'static CohortProfile,
    pub location: String,
    pub members: Vec<Customer>,
}

pub struct LifecycleAnalyzer {
    config: LifecycleConfig,
}

impl LifecycleAnalyzer {
    pub fn new(config: LifecycleConfig) -> Self {
        Self { config }
    }

    pub fn metrics(&self, vehicle: &Vehicle, today: NaiveDate) -> LifecycleMetrics {
        LifecycleMetrics {
            vehicle_age_years: vehicle.age_years(today),
            mileage: vehicle.mileage.unwrap_or(0),
            days_since_service: vehicle
                .days_since_service(today)
                .unwrap_or(self.config.never_serviced_days),
            days_until_warranty_expiry: vehicle.days_until_warranty_expiry(today),
        }
    }

    pub fn cohorts_for(&self, m: &LifecycleMetrics) -> Vec<CohortKind> {
        let cfg = &self.config;
        let mut cohorts = Vec::with_capacity(4);

        cohorts.push(if m.vehicle_age_years <= cfg.new_owner_years {
            CohortKind::NewOwners
        } else if m.vehicle_age_years <= cfg.early_owner_years {
            CohortKind::EarlyOwners
        } else if m.vehicle_age_years <= cfg.mid_owner_years {
            CohortKind::MidOwners
        } else {
            CohortKind::VeteranOwners
        });

        if m.mileage >= cfg.high_mileage_km {
            cohorts.push(CohortKind::HighMileage);
        }
        if m.mileage >= cfg.ultra_high_mileage_km {
            cohorts.push(CohortKind::UltraHighMileage);
        }
        // Expired warranties are excluded.
        if m
            .days_until_warranty_expiry
            .is_some_and(|days| (0..=cfg.warranty_expiring_days).contains(&days))
        {
            cohorts.push(CohortKind::WarrantyExpiring);
        }
        if m.days_since_service > cfg.service_due_days {
            cohorts.push(CohortKind::ServiceDue);
        }
        cohorts
    }

    /// Buckets each customer by their primary vehicle. Customers without a
    /// vehicle are skipped.
    pub fn index(&self, customers: &[Customer], today: NaiveDate) -> CohortIndex {
        let mut index = CohortIndex::default();
        for customer in customers {
            let Some(vehicle) = customer.primary_vehicle() else {
                continue;
            };
            let metrics = self.metrics(vehicle, today);
            for cohort in self.cohorts_for(&metrics) {
                index.insert(cohort, customer.id);
            }
        }
        index
    }

    pub fn analyze(
        &self,
        customers: &[Customer],
        location: &str,
        today: NaiveDate,
    ) -> (CohortIndex, Vec<CampaignCandidate>) {
        let index = self.index(customers, today);
        let candidates: Vec<CampaignCandidate> = index
            .non_empty()
            .map(|(cohort, ids)| CampaignCandidate {
                cohort,
                profile: cohort.profile(),
                location: location.to_string(),
                members: customers
                    .iter()
                    .filter(|c| ids.contains(&c.id))
                    .cloned()
                    .collect(),
            })
            .collect();

        debug!(
            customers = customers.len(),
            cohorts = candidates.len(),
            "Lifecycle analysis complete"
        );
        (index, candidates)
    }
}
