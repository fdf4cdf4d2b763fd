//! End-to-end runs against the in-memory store and scripted services.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Days, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use campaign_channels::RecordingPacer;
use campaign_core::config::AppConfig;
use campaign_core::event_bus::capture_sink;
use campaign_core::providers::{
    CampaignStore, ContentGenerator, HolidayProvider, MessageDelivery, WeatherProvider,
};
use campaign_core::types::{
    Customer, DispatchRecord, DispatchStatus, GenerationPrompt, GroupCampaignRecord,
    GroupMetrics, HolidayEvent, OutboundEmail, RunStatus, RunSummary, TriggerKind, Vehicle,
    WeatherFact,
};
use campaign_core::{CampaignError, CampaignResult};
use campaign_store::InMemoryStore;
use campaign_workflow::{Collaborators, Orchestrator};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn days_ago(days: u64) -> NaiveDate {
    today().checked_sub_days(Days::new(days)).unwrap()
}

// ─── Scripted services ──────────────────────────────────────────────────────

struct FixedWeather(Option<WeatherFact>);

#[async_trait]
impl WeatherProvider for FixedWeather {
    async fn current_weather(&self, location: &str) -> CampaignResult<WeatherFact> {
        self.0
            .clone()
            .map(|mut w| {
                w.location = location.to_string();
                w
            })
            .ok_or_else(|| CampaignError::Lookup("weather service unavailable".into()))
    }
}

/// Serves its events the way a calendar would: only those inside the
/// requested look-ahead window.
struct FixedHolidays(Vec<HolidayEvent>);

#[async_trait]
impl HolidayProvider for FixedHolidays {
    async fn upcoming_holidays(&self, days_ahead: u32) -> CampaignResult<Vec<HolidayEvent>> {
        Ok(self
            .0
            .iter()
            .filter(|e| (0..=i64::from(days_ahead)).contains(&e.days_until))
            .cloned()
            .collect())
    }
}

const GENERATED: &str = r#"Here is your campaign:
{"title": "Monsoon Care",
 "subject_line": "{{customer_name}}, is your {{vehicle_make}} ready?",
 "content": "Dear {{customer_name}},\nConditions in {{location}} call for a check of your {{vehicle_info}}.\n{{urgency_message}}",
 "cta_text": "Book a Check",
 "personalization_fields": ["customer_name", "vehicle_info"]}"#;

const GENERATED_FESTIVE: &str = r#"{"title": "Festive Travel Check",
 "subject_line": "{{customer_name}}, road-ready for {{holiday_name}}?",
 "content": "Dear {{customer_name}},\n{{holiday_greeting}}\nGet your {{vehicle_info}} checked before {{holiday_name}}.",
 "cta_text": "Book Festive Check",
 "personalization_fields": ["customer_name", "holiday_name"]}"#;

/// Replies with a fixed document, or fails every call when `failing`.
struct ScriptedGenerator {
    reply: &'static str,
    failing: bool,
    prompts: Mutex<Vec<GenerationPrompt>>,
}

impl ScriptedGenerator {
    fn ok() -> Self {
        Self::replying(GENERATED)
    }

    fn replying(reply: &'static str) -> Self {
        Self {
            reply,
            failing: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            reply: "",
            failing: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<GenerationPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &GenerationPrompt) -> CampaignResult<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        if self.failing {
            return Err(CampaignError::Generation("503 Service Unavailable".into()));
        }
        Ok(self.reply.to_string())
    }
}

struct ScriptedDelivery {
    failing: HashSet<String>,
    sent: Mutex<Vec<OutboundEmail>>,
}

impl ScriptedDelivery {
    fn new(failing: &[&str]) -> Self {
        Self {
            failing: failing.iter().map(|s| s.to_string()).collect(),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageDelivery for ScriptedDelivery {
    async fn send(&self, email: &OutboundEmail) -> CampaignResult<String> {
        if self.failing.contains(&email.to_address) {
            return Err(CampaignError::Dispatch("421 mailbox busy".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(format!("<msg-{}@relay>", Uuid::new_v4()))
    }
}

/// Delegates to the in-memory store but fails group-campaign writes with a
/// fatal error.
struct BrokenStore(InMemoryStore);

#[async_trait]
impl CampaignStore for BrokenStore {
    async fn customers_by_location(&self, location: &str) -> CampaignResult<Vec<Customer>> {
        self.0.customers_by_location(location).await
    }
    async fn customers_with_vehicles(&self) -> CampaignResult<Vec<Customer>> {
        self.0.customers_with_vehicles().await
    }
    async fn create_group_campaign(&self, _: &GroupCampaignRecord) -> CampaignResult<()> {
        Err(CampaignError::Internal(anyhow::anyhow!("campaign table missing")))
    }
    async fn insert_dispatch(&self, record: &DispatchRecord) -> CampaignResult<()> {
        self.0.insert_dispatch(record).await
    }
    async fn update_dispatch_status(&self, record: &DispatchRecord) -> CampaignResult<()> {
        self.0.update_dispatch_status(record).await
    }
    async fn update_group_metrics(&self, id: Uuid, metrics: &GroupMetrics) -> CampaignResult<()> {
        self.0.update_group_metrics(id, metrics).await
    }
    async fn dispatches_for_run(&self, run_id: Uuid) -> CampaignResult<Vec<DispatchRecord>> {
        self.0.dispatches_for_run(run_id).await
    }
    async fn save_run_summary(&self, summary: &RunSummary) -> CampaignResult<()> {
        self.0.save_run_summary(summary).await
    }
    async fn run_summary(&self, run_id: Uuid) -> CampaignResult<Option<RunSummary>> {
        self.0.run_summary(run_id).await
    }
}

// ─── Fixtures ───────────────────────────────────────────────────────────────

fn vehicle(
    customer_id: i64,
    registered: NaiveDate,
    serviced_days_ago: Option<u64>,
    mileage: u32,
) -> Vehicle {
    Vehicle {
        id: customer_id * 100,
        customer_id,
        make: "Maruti".into(),
        model: "Swift".into(),
        year: chrono::Datelike::year(&registered),
        registration_date: Some(registered),
        last_service_date: serviced_days_ago.map(days_ago),
        last_service_type: serviced_days_ago.map(|_| "Periodic Maintenance".to_string()),
        next_service_due: None,
        mileage: Some(mileage),
        warranty_start: Some(registered),
        warranty_end: None,
    }
}

fn customer(id: i64, location: &str, vehicles: Vec<Vehicle>) -> Customer {
    Customer {
        id,
        name: format!("Customer {id}"),
        email: format!("customer{id}@example.com"),
        phone: None,
        preferred_location: Some(location.to_string()),
        created_at: Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap(),
        vehicles,
    }
}

fn mumbai_and_pune() -> Vec<Customer> {
    let registered = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
    let mut customers: Vec<Customer> = (1..=12)
        .map(|id| customer(id, "Mumbai", vec![vehicle(id, registered, Some(60), 30_000)]))
        .collect();
    customers.push(customer(13, "Pune", vec![vehicle(13, registered, Some(60), 30_000)]));
    customers.push(customer(14, "Pune", Vec::new()));
    customers
}

/// Five single-vehicle customers with mixed mileage and service history.
fn lifecycle_customers() -> Vec<Customer> {
    let rows: [(i64, u32, Option<u64>, u64); 5] = [
        (1, 45_000, Some(90), 200),
        (2, 85_000, Some(400), 4 * 365),
        (3, 8_000, None, 300),
        (4, 62_000, Some(150), 6 * 365),
        (5, 125_000, Some(200), 8 * 365),
    ];
    rows.into_iter()
        .map(|(id, mileage, serviced, registered_days_ago)| {
            let mut v = vehicle(id, days_ago(registered_days_ago), serviced, mileage);
            if id == 1 {
                v.next_service_due = today().checked_add_days(Days::new(10));
            }
            customer(id, "Mumbai", vec![v])
        })
        .collect()
}

/// Recently registered, recently serviced, low mileage, next service due
/// within the due-soon window.
fn new_owners(ids: &[i64]) -> Vec<Customer> {
    ids.iter()
        .map(|&id| {
            let mut v = vehicle(id, days_ago(100), Some(30), 5_000);
            v.next_service_due = today().checked_add_days(Days::new(10));
            customer(id, "Mumbai", vec![v])
        })
        .collect()
}

fn holiday(name: &str, kind: &str, travel: &str, days_until: u64) -> HolidayEvent {
    HolidayEvent {
        name: name.into(),
        date: today().checked_add_days(Days::new(days_until)).unwrap(),
        kind: kind.into(),
        cultural_significance: Some(format!("{name} celebrations")),
        travel_impact: Some(travel.into()),
        days_until: days_until as i64,
    }
}

fn festive_calendar() -> Vec<HolidayEvent> {
    vec![
        holiday("Dussehra", "Religious Festival", "Medium", 5),
        holiday("Diwali", "Major Festival", "High", 10),
        holiday("Christmas", "Major Festival", "High", 40),
    ]
}

fn rain() -> WeatherFact {
    WeatherFact {
        location: String::new(),
        temperature: 26.0,
        condition: "Rain".into(),
        description: "moderate rain".into(),
        humidity: 88,
    }
}

struct Harness {
    store: Arc<InMemoryStore>,
    generator: Arc<ScriptedGenerator>,
    delivery: Arc<ScriptedDelivery>,
    pacer: Arc<RecordingPacer>,
    orchestrator: Orchestrator,
}

fn harness(
    customers: Vec<Customer>,
    weather: Option<WeatherFact>,
    generator: ScriptedGenerator,
    delivery: ScriptedDelivery,
) -> Harness {
    harness_with_calendar(customers, weather, Vec::new(), generator, delivery)
}

fn harness_with_calendar(
    customers: Vec<Customer>,
    weather: Option<WeatherFact>,
    calendar: Vec<HolidayEvent>,
    generator: ScriptedGenerator,
    delivery: ScriptedDelivery,
) -> Harness {
    let store = Arc::new(InMemoryStore::with_customers(customers));
    let generator = Arc::new(generator);
    let delivery = Arc::new(delivery);
    let pacer = Arc::new(RecordingPacer::new());
    let orchestrator = Orchestrator::new(
        AppConfig::default(),
        Collaborators {
            store: store.clone(),
            weather: Arc::new(FixedWeather(weather)),
            holidays: Arc::new(FixedHolidays(calendar)),
            generator: generator.clone(),
            delivery: delivery.clone(),
            pacer: pacer.clone(),
        },
    )
    .with_fixed_date(today());
    Harness {
        store,
        generator,
        delivery,
        pacer,
        orchestrator,
    }
}

// ─── Runs ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn weather_run_targets_one_location_group() {
    let h = harness(
        mumbai_and_pune(),
        Some(rain()),
        ScriptedGenerator::ok(),
        ScriptedDelivery::new(&[]),
    );
    let sink = capture_sink();
    let orchestrator = h.orchestrator.with_event_sink(sink.clone());

    let result = orchestrator.run_campaign("Mumbai", TriggerKind::Weather).await;

    assert_eq!(result.status, RunStatus::Success, "errors: {:?}", result.errors);
    assert_eq!(result.customers_targeted, 12);
    assert_eq!(result.campaigns_created, 1);
    assert_eq!(result.messages_sent, 12);
    assert!(result.summary.contains("Weather context: Rain at 26°C"));

    assert_eq!(h.generator.prompts().len(), 1);
    assert!(h.generator.prompts()[0].user.contains("Rain"));

    let sent = h.delivery.sent();
    assert_eq!(sent.len(), 12);
    assert!(sent.iter().all(|e| e.tags.contains(&"weather_Mumbai".to_string())));
    assert_eq!(sent[0].subject, "Customer 1, is your Maruti ready?");
    assert!(sent.iter().all(|e| !e.text_body.contains("{{")));
    assert!(sent[0].text_body.contains("Conditions in Mumbai"));

    assert_eq!(h.pacer.pauses().len(), 12);
    assert_eq!(sink.count_kind("stage_completed"), 5);
    assert_eq!(sink.count_kind("message_sent"), 12);
    assert_eq!(sink.count_kind("run_finished"), 1);

    let summary = orchestrator.run_summary(result.run_id).await.unwrap().unwrap();
    assert_eq!(
        summary.completed_stages,
        vec!["targeting", "weather", "content_generation", "dispatch", "finalize"]
    );
    assert_eq!(summary.weather.map(|w| w.condition), Some("Rain".to_string()));

    let campaigns = h.store.group_campaigns_for_run(result.run_id);
    assert_eq!(campaigns.len(), 1);
    let metrics = h.store.group_metrics(campaigns[0].id).unwrap();
    assert_eq!(metrics.customers_targeted, 12);
    assert_eq!(metrics.messages_sent, 12);
}

#[tokio::test]
async fn lifecycle_run_groups_by_primary_service_need() {
    let h = harness(
        lifecycle_customers(),
        None,
        ScriptedGenerator::ok(),
        ScriptedDelivery::new(&[]),
    );

    let result = h
        .orchestrator
        .run_campaign("Mumbai", TriggerKind::Lifecycle)
        .await;

    assert_eq!(result.status, RunStatus::Success, "errors: {:?}", result.errors);
    assert_eq!(result.customers_targeted, 5);
    assert!(result.campaigns_created <= 4);
    assert_eq!(result.messages_sent, 5);

    let labels: Vec<String> = h
        .store
        .group_campaigns_for_run(result.run_id)
        .into_iter()
        .map(|c| c.group_label)
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    assert_eq!(
        labels,
        vec![
            "service_general_service",
            "service_high_mileage",
            "service_service_overdue"
        ]
    );

    // One prompt per group, the overdue group carrying its cohort angle.
    let prompts = h.generator.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts.iter().any(|p| p.user.contains("Segment: service_due")));
    assert!(prompts.iter().any(|p| p.user.contains("Segment: high_mileage")));
    // Customer 1 is the only general-service member and a first-year owner.
    let general = prompts
        .iter()
        .find(|p| p.user.contains("group: service_general_service"))
        .unwrap();
    assert!(general.user.contains("Segment: new_owners"));

    // No weather or holiday lookups on lifecycle runs.
    let summary = h
        .orchestrator
        .run_summary(result.run_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.completed_stages[1], "lifecycle");
    assert!(summary.weather.is_none());

    let recipients: HashSet<String> = h.delivery.sent().into_iter().map(|e| e.to_address).collect();
    assert_eq!(recipients.len(), 5);
}

#[tokio::test]
async fn general_service_group_of_new_owners_gets_the_new_owner_angle() {
    let h = harness(
        new_owners(&[21, 22, 23]),
        None,
        ScriptedGenerator::ok(),
        ScriptedDelivery::new(&[]),
    );

    let result = h
        .orchestrator
        .run_campaign("Mumbai", TriggerKind::Lifecycle)
        .await;

    assert_eq!(result.status, RunStatus::Success, "errors: {:?}", result.errors);
    assert_eq!(result.customers_targeted, 3);
    assert_eq!(result.campaigns_created, 1);

    let campaigns = h.store.group_campaigns_for_run(result.run_id);
    assert_eq!(campaigns[0].group_label, "service_general_service");

    let prompts = h.generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].user.contains("Primary service need of the group: general_service"));
    assert!(prompts[0].user.contains("Segment: new_owners (high priority)"));
    assert!(prompts[0].user.contains("Complimentary first service check"));
    assert!(prompts[0].user.contains("Book Your Free First Service"));
}

#[tokio::test]
async fn holiday_run_campaigns_around_the_highest_scored_holiday() {
    let h = harness_with_calendar(
        mumbai_and_pune(),
        None,
        festive_calendar(),
        ScriptedGenerator::replying(GENERATED_FESTIVE),
        ScriptedDelivery::new(&[]),
    );

    let result = h.orchestrator.run_campaign("Mumbai", TriggerKind::Holiday).await;

    assert_eq!(result.status, RunStatus::Success, "errors: {:?}", result.errors);
    assert_eq!(result.customers_targeted, 12);
    assert_eq!(result.campaigns_created, 1);
    assert_eq!(result.messages_sent, 12);
    // Diwali outscores the earlier Dussehra; Christmas is outside the window.
    assert!(result.summary.contains("Holiday context: Diwali on 2024-06-25"));

    let prompts = h.generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].user.contains("Holiday: Diwali on 2024-06-25 (Major Festival), 10 days away"));
    assert!(!prompts[0].user.contains("Dussehra"));
    assert!(!prompts[0].user.contains("Christmas"));
    assert!(!prompts[0].user.contains("Weather:"));

    let sent = h.delivery.sent();
    assert_eq!(sent.len(), 12);
    assert!(sent.iter().all(|e| e.tags.contains(&"holiday_Mumbai".to_string())));
    assert_eq!(sent[0].subject, "Customer 1, road-ready for Diwali?");
    assert!(sent[0]
        .text_body
        .contains("May this Festival of Lights bring joy and prosperity to your journey!"));
    assert!(sent.iter().all(|e| !e.text_body.contains("{{")));

    let summary = h
        .orchestrator
        .run_summary(result.run_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        summary.completed_stages,
        vec!["targeting", "holiday", "content_generation", "dispatch", "finalize"]
    );
    let primary = summary.holiday.unwrap();
    assert_eq!(primary.name, "Diwali");
    assert_eq!(primary.priority_score, 23);
    assert!(summary.weather.is_none());
}

#[tokio::test]
async fn generation_outage_still_completes_with_fallback_content() {
    let h = harness(
        lifecycle_customers(),
        None,
        ScriptedGenerator::failing(),
        ScriptedDelivery::new(&[]),
    );

    let result = h
        .orchestrator
        .run_campaign("Mumbai", TriggerKind::Scheduled)
        .await;

    assert_ne!(result.status, RunStatus::Failed);
    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.messages_sent, 5);
    assert_eq!(result.errors.len(), result.campaigns_created);
    assert!(result.errors.iter().all(|e| e.starts_with("Generation failure")));

    for campaign in h.store.group_campaigns_for_run(result.run_id) {
        assert!(!campaign.title.trim().is_empty());
        assert!(!campaign.subject_line.trim().is_empty());
        assert!(!campaign.content.trim().is_empty());
    }
    assert!(h.delivery.sent().iter().all(|e| !e.text_body.contains("{{")));
}

#[tokio::test]
async fn one_failed_send_does_not_stop_the_batch() {
    let h = harness(
        mumbai_and_pune(),
        Some(rain()),
        ScriptedGenerator::ok(),
        ScriptedDelivery::new(&["customer4@example.com"]),
    );

    let result = h.orchestrator.run_campaign("Mumbai", TriggerKind::Weather).await;

    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.messages_sent, 11);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("customer 4"));

    let records = h.store.dispatches_for_run(result.run_id).await.unwrap();
    assert_eq!(records.len(), 12);
    let failed: Vec<_> = records
        .iter()
        .filter(|r| r.status == DispatchStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].customer_id, 4);
    assert!(records
        .iter()
        .filter(|r| r.customer_id != 4)
        .all(|r| r.status == DispatchStatus::Sent && r.message_id.is_some()));
}

#[tokio::test]
async fn rerun_leaves_previous_dispatches_untouched() {
    let h = harness(
        mumbai_and_pune(),
        Some(rain()),
        ScriptedGenerator::ok(),
        ScriptedDelivery::new(&[]),
    );

    let first = h.orchestrator.run_campaign("Mumbai", TriggerKind::Weather).await;
    let before = h.store.dispatches_for_run(first.run_id).await.unwrap();

    let second = h.orchestrator.run_campaign("Mumbai", TriggerKind::Weather).await;
    let after = h.store.dispatches_for_run(first.run_id).await.unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(before, after);
    assert_eq!(second.messages_sent, 12);
    assert_eq!(h.store.all_dispatches().len(), 24);
    let second_ids: HashSet<Uuid> = h
        .store
        .dispatches_for_run(second.run_id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert!(before.iter().all(|r| !second_ids.contains(&r.id)));
}

#[tokio::test]
async fn weather_outage_is_a_soft_failure() {
    let h = harness(
        mumbai_and_pune(),
        None,
        ScriptedGenerator::ok(),
        ScriptedDelivery::new(&[]),
    );

    let result = h.orchestrator.run_campaign("Mumbai", TriggerKind::Weather).await;

    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.messages_sent, 12);
    assert!(result.errors[0].starts_with("Lookup failure"));
}

#[tokio::test]
async fn unknown_location_yields_an_empty_run() {
    let h = harness(
        mumbai_and_pune(),
        Some(rain()),
        ScriptedGenerator::ok(),
        ScriptedDelivery::new(&[]),
    );

    let result = h.orchestrator.run_campaign("Chennai", TriggerKind::Holiday).await;

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.customers_targeted, 0);
    assert_eq!(result.campaigns_created, 0);
    assert_eq!(result.messages_sent, 0);
    assert!(h.generator.prompts().is_empty());
}

#[tokio::test]
async fn fatal_store_error_fails_the_run_with_zero_counts() {
    let store = Arc::new(BrokenStore(InMemoryStore::with_customers(mumbai_and_pune())));
    let delivery = Arc::new(ScriptedDelivery::new(&[]));
    let orchestrator = Orchestrator::new(
        AppConfig::default(),
        Collaborators {
            store: store.clone(),
            weather: Arc::new(FixedWeather(Some(rain()))),
            holidays: Arc::new(FixedHolidays(Vec::new())),
            generator: Arc::new(ScriptedGenerator::ok()),
            delivery: delivery.clone(),
            pacer: Arc::new(RecordingPacer::new()),
        },
    )
    .with_fixed_date(today());

    let result = orchestrator.run_campaign("Mumbai", TriggerKind::Weather).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.customers_targeted, 0);
    assert_eq!(result.campaigns_created, 0);
    assert_eq!(result.messages_sent, 0);
    assert!(result.summary.starts_with("Workflow failed"));
    assert!(delivery.sent().is_empty());

    let summary = orchestrator.run_summary(result.run_id).await.unwrap().unwrap();
    assert_eq!(summary.result.status, RunStatus::Failed);
    assert!(!summary.completed_stages.contains(&"dispatch".to_string()));
}

#[tokio::test]
async fn run_all_locations_keeps_runs_independent() {
    let h = harness(
        mumbai_and_pune(),
        Some(rain()),
        ScriptedGenerator::ok(),
        ScriptedDelivery::new(&[]),
    );
    let locations = h.store.locations();
    assert_eq!(locations, vec!["Mumbai".to_string(), "Pune".to_string()]);

    let results = h
        .orchestrator
        .run_all_locations(&locations, TriggerKind::Weather)
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].customers_targeted, 12);
    // Customer 14 has no vehicle but still belongs to Pune.
    assert_eq!(results[1].customers_targeted, 2);
    assert_ne!(results[0].run_id, results[1].run_id);
    assert_eq!(h.delivery.sent().len(), 14);
}
