//! Vehicle-level predicates for service-need targeting and the ordering
//! priority used to rank matches.

use campaign_core::config::TargetingConfig;
use campaign_core::types::Vehicle;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VehiclePredicate {
    /// Last service older than the overdue window.
    ServiceOverdue,
    /// Next service due on or before today + due-soon window.
    ServiceDueSoon,
    /// Warranty ends between today and today + warranty window.
    WarrantyExpiring,
    HighMileage,
    AgedVehicle,
    NeverServiced,
}

impl VehiclePredicate {
    pub const ALL: [VehiclePredicate; 6] = [
        VehiclePredicate::ServiceOverdue,
        VehiclePredicate::ServiceDueSoon,
        VehiclePredicate::WarrantyExpiring,
        VehiclePredicate::HighMileage,
        VehiclePredicate::AgedVehicle,
        VehiclePredicate::NeverServiced,
    ];

    pub fn matches(&self, vehicle: &Vehicle, today: NaiveDate, cfg: &TargetingConfig) -> bool {
        match self {
            VehiclePredicate::ServiceOverdue => vehicle
                .days_since_service(today)
                .is_some_and(|days| days > cfg.service_overdue_days),
            VehiclePredicate::ServiceDueSoon => vehicle
                .days_until_service_due(today)
                .is_some_and(|days| days <= cfg.service_due_soon_days),
            VehiclePredicate::WarrantyExpiring => vehicle
                .days_until_warranty_expiry(today)
                .is_some_and(|days| (0..=cfg.warranty_window_days).contains(&days)),
            VehiclePredicate::HighMileage => vehicle
                .mileage
                .is_some_and(|km| km > cfg.high_mileage_km),
            VehiclePredicate::AgedVehicle => {
                vehicle.age_years(today) >= cfg.min_vehicle_age_years
            }
            VehiclePredicate::NeverServiced => vehicle.last_service_date.is_none(),
        }
    }
}

/// True when any predicate holds for the vehicle (logical OR).
pub fn is_service_candidate(vehicle: &Vehicle, today: NaiveDate, cfg: &TargetingConfig) -> bool {
    VehiclePredicate::ALL
        .iter()
        .any(|p| p.matches(vehicle, today, cfg))
}

/// Ordering rank for targeted customers; lower sorts first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServicePriority {
    Overdue = 1,
    StaleService = 2,
    WarrantyEnding = 3,
    None = 4,
}

impl ServicePriority {
    /// Next-due date already passed ranks first, then a stale last service,
    /// then a warranty ending within the due-soon window.
    pub fn of(vehicle: &Vehicle, today: NaiveDate, cfg: &TargetingConfig) -> Self {
        if vehicle.next_service_due.is_some_and(|due| due <= today) {
            ServicePriority::Overdue
        } else if vehicle
            .days_since_service(today)
            .is_some_and(|days| days > cfg.service_overdue_days)
        {
            ServicePriority::StaleService
        } else if vehicle
            .days_until_warranty_expiry(today)
            .is_some_and(|days| days <= cfg.service_due_soon_days)
        {
            ServicePriority::WarrantyEnding
        } else {
            ServicePriority::None
        }
    }
}
