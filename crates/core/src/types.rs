//! Shared domain types for the after-sales campaign pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{CampaignError, CampaignResult};

pub type CustomerId = i64;
pub type VehicleId = i64;

// ─── Trigger ────────────────────────────────────────────────────────────────

/// The reason a campaign run was started.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Weather,
    Holiday,
    Lifecycle,
    Scheduled,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Weather => "weather",
            TriggerKind::Holiday => "holiday",
            TriggerKind::Lifecycle => "lifecycle",
            TriggerKind::Scheduled => "scheduled",
        }
    }

    /// Weather and holiday runs target a single location; the others
    /// target by vehicle service need.
    pub fn is_location_based(&self) -> bool {
        matches!(self, TriggerKind::Weather | TriggerKind::Holiday)
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = CampaignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weather" => Ok(TriggerKind::Weather),
            "holiday" => Ok(TriggerKind::Holiday),
            "lifecycle" => Ok(TriggerKind::Lifecycle),
            "scheduled" => Ok(TriggerKind::Scheduled),
            other => Err(CampaignError::Config(format!(
                "unknown trigger kind '{other}'"
            ))),
        }
    }
}

// ─── Customers & Vehicles ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub preferred_location: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
}

impl Customer {
    /// The vehicle used for personalization and lifecycle bucketing:
    /// newest model year first, ties broken by most recent service.
    pub fn primary_vehicle(&self) -> Option<&Vehicle> {
        self.vehicles
            .iter()
            .max_by_key(|v| (v.year, v.last_service_date))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    pub id: VehicleId,
    pub customer_id: CustomerId,
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(default)]
    pub registration_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_service_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_service_type: Option<String>,
    #[serde(default)]
    pub next_service_due: Option<NaiveDate>,
    #[serde(default)]
    pub mileage: Option<u32>,
    #[serde(default)]
    pub warranty_start: Option<NaiveDate>,
    #[serde(default)]
    pub warranty_end: Option<NaiveDate>,
}

impl Vehicle {
    /// Fractional years since registration. Falls back to January 1st of
    /// the model year when no registration date is recorded.
    pub fn age_years(&self, today: NaiveDate) -> f64 {
        let since = self
            .registration_date
            .or_else(|| NaiveDate::from_ymd_opt(self.year, 1, 1));
        match since {
            Some(date) => ((today - date).num_days() as f64 / 365.25).max(0.0),
            None => 0.0,
        }
    }

    pub fn days_since_service(&self, today: NaiveDate) -> Option<i64> {
        self.last_service_date.map(|d| (today - d).num_days())
    }

    pub fn days_until_service_due(&self, today: NaiveDate) -> Option<i64> {
        self.next_service_due.map(|d| (d - today).num_days())
    }

    pub fn days_until_warranty_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.warranty_end.map(|d| (d - today).num_days())
    }

    /// "2021 Honda City"
    pub fn display_name(&self) -> String {
        format!("{} {} {}", self.year, self.make, self.model)
            .trim()
            .to_string()
    }
}

// ─── Context facts ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherFact {
    pub location: String,
    pub temperature: f64,
    pub condition: String,
    pub description: String,
    pub humidity: u32,
}

/// An upcoming calendar event as returned by the holiday lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HolidayEvent {
    pub name: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub cultural_significance: Option<String>,
    #[serde(default)]
    pub travel_impact: Option<String>,
    pub days_until: i64,
}

/// The single holiday selected for a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HolidayFact {
    pub name: String,
    pub date: NaiveDate,
    pub kind: String,
    pub cultural_significance: Option<String>,
    pub travel_impact: Option<String>,
    pub days_until: i64,
    pub priority_score: u32,
}

// ─── Grouping ───────────────────────────────────────────────────────────────

/// Primary service need of a customer, in descending priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ServiceNeed {
    WarrantyExpiring,
    ServiceOverdue,
    HighMileage,
    GeneralService,
}

impl ServiceNeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceNeed::WarrantyExpiring => "warranty_expiring",
            ServiceNeed::ServiceOverdue => "service_overdue",
            ServiceNeed::HighMileage => "high_mileage",
            ServiceNeed::GeneralService => "general_service",
        }
    }
}

impl fmt::Display for ServiceNeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The partition key of a campaign group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum GroupKey {
    Location(String),
    ServiceNeed(ServiceNeed),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Location(loc) => f.write_str(loc),
            GroupKey::ServiceNeed(need) => f.write_str(need.as_str()),
        }
    }
}

/// Where a content template came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentTemplate {
    pub title: String,
    pub subject_line: String,
    pub content: String,
    pub cta_text: String,
    pub personalization_fields: Vec<String>,
    pub source: ContentSource,
}

impl ContentTemplate {
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.subject_line.trim().is_empty()
            && !self.content.trim().is_empty()
            && !self.cta_text.trim().is_empty()
    }
}

/// Unit of content generation: one template per group, many members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignGroup {
    pub key: GroupKey,
    pub members: Vec<Customer>,
    pub template: Option<ContentTemplate>,
}

impl CampaignGroup {
    pub fn new(key: GroupKey) -> Self {
        Self {
            key,
            members: Vec::new(),
            template: None,
        }
    }

    pub fn label(&self, trigger: TriggerKind) -> String {
        match &self.key {
            GroupKey::Location(loc) => format!("{trigger}_{loc}"),
            GroupKey::ServiceNeed(need) => format!("service_{need}"),
        }
    }
}

// ─── Persistence records ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupCampaignStatus {
    Created,
    Sent,
}

/// One campaign record per group (not per customer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCampaignRecord {
    pub id: Uuid,
    pub run_id: Uuid,
    pub trigger: TriggerKind,
    pub group_label: String,
    pub title: String,
    pub subject_line: String,
    pub content: String,
    pub target_location: Option<String>,
    pub target_count: usize,
    pub status: GroupCampaignStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupMetrics {
    pub customers_targeted: usize,
    pub messages_sent: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Created,
    Sent,
    Failed,
}

impl DispatchStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DispatchStatus::Created)
    }
}

/// One personalized message for one (group, customer) pair.
///
/// Status only moves `created -> sent` or `created -> failed`, exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchRecord {
    pub id: Uuid,
    pub run_id: Uuid,
    pub campaign_id: Uuid,
    pub group_label: String,
    pub customer_id: CustomerId,
    pub to_address: String,
    pub to_name: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub correlation_id: Uuid,
    pub status: DispatchStatus,
    pub message_id: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl DispatchRecord {
    pub fn mark_sent(&mut self, message_id: String, at: DateTime<Utc>) -> CampaignResult<()> {
        self.ensure_pending(DispatchStatus::Sent)?;
        self.status = DispatchStatus::Sent;
        self.message_id = Some(message_id);
        self.sent_at = Some(at);
        Ok(())
    }

    pub fn mark_failed(&mut self, error: String) -> CampaignResult<()> {
        self.ensure_pending(DispatchStatus::Failed)?;
        self.status = DispatchStatus::Failed;
        self.error = Some(error);
        Ok(())
    }

    fn ensure_pending(&self, to: DispatchStatus) -> CampaignResult<()> {
        if self.status.is_terminal() {
            return Err(CampaignError::InvalidTransition(format!(
                "dispatch {} is already {:?}, cannot move to {:?}",
                self.id, self.status, to
            )));
        }
        Ok(())
    }
}

/// The envelope handed to the message delivery service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutboundEmail {
    pub to_address: String,
    pub to_name: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub tags: Vec<String>,
    pub correlation_id: Uuid,
}

/// Prompt passed to the content-generation service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationPrompt {
    pub system: String,
    pub user: String,
}

// ─── Run results ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialSuccess,
    Failed,
}

/// Immutable outcome of one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunResult {
    pub run_id: Uuid,
    pub location: String,
    pub trigger: TriggerKind,
    pub status: RunStatus,
    pub customers_targeted: usize,
    pub campaigns_created: usize,
    pub messages_sent: usize,
    pub errors: Vec<String>,
    pub execution_time_ms: u64,
    pub summary: String,
}

/// Diagnostic view of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub result: RunResult,
    pub completed_stages: Vec<String>,
    pub weather: Option<WeatherFact>,
    pub holiday: Option<HolidayFact>,
    pub finished_at: DateTime<Utc>,
}
