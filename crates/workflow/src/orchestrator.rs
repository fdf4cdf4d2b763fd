//! Drives one campaign run from targeting to finalize.
//!
//! Every stage reads and writes the run's `RunContext`. Soft failures are
//! absorbed into the context and the run continues with best-effort
//! defaults; only a fatal error aborts, producing a `failed` result with
//! zero counts.

use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use metrics::counter;
use tracing::{debug, info, warn};
use uuid::Uuid;

use campaign_channels::email::html_body;
use campaign_channels::DispatchEngine;
use campaign_core::config::AppConfig;
use campaign_core::event_bus::{make_event, noop_sink, EventSink, PipelineEventKind};
use campaign_core::providers::{
    bounded, CampaignStore, ContentGenerator, HolidayProvider, MessageDelivery, Pacer,
    WeatherProvider,
};
use campaign_core::types::{
    CampaignGroup, DispatchRecord, DispatchStatus, GroupCampaignRecord, GroupCampaignStatus,
    GroupKey, RunResult, RunSummary, TriggerKind,
};
use campaign_core::{CampaignError, CampaignResult};
use campaign_personalization::{
    ContentAdapter, GenerationContext, MessagingAngle, Personalizer, RunFacts,
};
use campaign_segmentation::{
    select_primary_holiday, CohortKind, GroupingEngine, LifecycleAnalyzer, SegmentationEngine,
};

use crate::context::RunContext;
use crate::state_machine::{PipelineStateMachine, Stage};

/// External services a run talks to.
pub struct Collaborators {
    pub store: Arc<dyn CampaignStore>,
    pub weather: Arc<dyn WeatherProvider>,
    pub holidays: Arc<dyn HolidayProvider>,
    pub generator: Arc<dyn ContentGenerator>,
    pub delivery: Arc<dyn MessageDelivery>,
    pub pacer: Arc<dyn Pacer>,
}

pub struct Orchestrator {
    config: AppConfig,
    store: Arc<dyn CampaignStore>,
    weather: Arc<dyn WeatherProvider>,
    holidays: Arc<dyn HolidayProvider>,
    segmentation: SegmentationEngine,
    grouping: GroupingEngine,
    lifecycle: LifecycleAnalyzer,
    content: ContentAdapter,
    personalizer: Personalizer,
    dispatch: DispatchEngine,
    delivery: Arc<dyn MessageDelivery>,
    pacer: Arc<dyn Pacer>,
    events: Arc<dyn EventSink>,
    fixed_date: Option<NaiveDate>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("default_location", &self.config.default_location)
            .field("fixed_date", &self.fixed_date)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(config: AppConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            store,
            weather,
            holidays,
            generator,
            delivery,
            pacer,
        } = collaborators;
        let events = noop_sink();

        Self {
            segmentation: SegmentationEngine::new(
                store.clone(),
                config.targeting.clone(),
                config.store.timeout_ms,
            ),
            grouping: GroupingEngine::new(config.targeting.clone()),
            lifecycle: LifecycleAnalyzer::new(config.lifecycle.clone()),
            content: ContentAdapter::new(generator, config.content.timeout_ms),
            personalizer: Personalizer::new(),
            dispatch: DispatchEngine::new(
                delivery.clone(),
                store.clone(),
                pacer.clone(),
                events.clone(),
                &config.dispatch,
            ),
            config,
            store,
            weather,
            holidays,
            delivery,
            pacer,
            events,
            fixed_date: None,
        }
    }

    /// Attach an event sink for pipeline events.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.dispatch = DispatchEngine::new(
            self.delivery.clone(),
            self.store.clone(),
            self.pacer.clone(),
            sink.clone(),
            &self.config.dispatch,
        );
        self.events = sink;
        self
    }

    /// Evaluate every date-relative rule against `date` instead of today.
    pub fn with_fixed_date(mut self, date: NaiveDate) -> Self {
        self.fixed_date = Some(date);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn today(&self) -> NaiveDate {
        self.fixed_date.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Runs the full pipeline once. Always returns a result; a fatal error
    /// is reported as `status = failed`.
    pub async fn run_campaign(&self, location: &str, trigger: TriggerKind) -> RunResult {
        let started = Instant::now();
        let mut ctx = RunContext::new(location, trigger, self.today());
        counter!("campaign.runs", "trigger" => trigger.as_str()).increment(1);
        info!(run_id = %ctx.run_id, %location, %trigger, "Starting campaign run");

        let outcome = self.execute(&mut ctx).await;
        let elapsed = started.elapsed().as_millis() as u64;
        let result = match outcome {
            Ok(()) => ctx.completed_result(elapsed),
            Err(fatal) => {
                warn!(run_id = %ctx.run_id, error = %fatal, "Campaign run aborted");
                ctx.failed_result(&fatal, elapsed)
            }
        };

        self.events.emit(make_event(
            ctx.run_id,
            PipelineEventKind::RunFinished {
                status: result.status,
                messages_sent: result.messages_sent,
            },
        ));
        info!(
            run_id = %ctx.run_id,
            status = ?result.status,
            targeted = result.customers_targeted,
            campaigns = result.campaigns_created,
            sent = result.messages_sent,
            errors = result.errors.len(),
            execution_time_ms = result.execution_time_ms,
            "Campaign run finished"
        );

        let summary = ctx.summary(result.clone());
        if let Err(e) = bounded(
            "run summary write",
            self.config.store.timeout_ms,
            self.store.save_run_summary(&summary),
        )
        .await
        {
            warn!(run_id = %ctx.run_id, error = %e, "Failed to persist run summary");
        }

        result
    }

    /// Independent runs, one per location, executed one after another.
    pub async fn run_all_locations(
        &self,
        locations: &[String],
        trigger: TriggerKind,
    ) -> Vec<RunResult> {
        let mut results = Vec::with_capacity(locations.len());
        for location in locations {
            results.push(self.run_campaign(location, trigger).await);
        }
        results
    }

    pub async fn run_summary(&self, run_id: Uuid) -> CampaignResult<Option<RunSummary>> {
        bounded(
            "run summary read",
            self.config.store.timeout_ms,
            self.store.run_summary(run_id),
        )
        .await
    }

    async fn execute(&self, ctx: &mut RunContext) -> CampaignResult<()> {
        let mut machine = PipelineStateMachine::new();

        self.targeting(ctx).await?;
        self.finish_stage(ctx, Stage::Targeting);

        let context_stage = Stage::after_targeting(ctx.trigger);
        machine.transition(context_stage)?;
        match context_stage {
            Stage::Weather => self.weather_context(ctx).await?,
            Stage::Holiday => self.holiday_context(ctx).await?,
            _ => self.lifecycle_analysis(ctx),
        }
        self.finish_stage(ctx, context_stage);

        machine.transition(Stage::ContentGeneration)?;
        self.content_generation(ctx).await?;
        self.finish_stage(ctx, Stage::ContentGeneration);

        machine.transition(Stage::Dispatch)?;
        self.dispatch_messages(ctx).await?;
        self.finish_stage(ctx, Stage::Dispatch);

        machine.transition(Stage::Finalize)?;
        self.finish_stage(ctx, Stage::Finalize);
        Ok(())
    }

    fn finish_stage(&self, ctx: &mut RunContext, stage: Stage) {
        ctx.complete(stage);
        debug!(run_id = %ctx.run_id, stage = stage.as_str(), "Stage completed");
        self.events.emit(make_event(
            ctx.run_id,
            PipelineEventKind::StageCompleted {
                stage: stage.as_str().to_string(),
            },
        ));
    }

    async fn targeting(&self, ctx: &mut RunContext) -> CampaignResult<()> {
        let outcome = self
            .segmentation
            .select(&ctx.location, ctx.trigger, ctx.today)
            .await;
        ctx.customers = outcome.customers;
        if let Some(err) = outcome.error {
            ctx.absorb(Stage::Targeting, err)?;
        }
        Ok(())
    }

    async fn weather_context(&self, ctx: &mut RunContext) -> CampaignResult<()> {
        match bounded(
            "weather lookup",
            self.config.weather.timeout_ms,
            self.weather.current_weather(&ctx.location),
        )
        .await
        {
            Ok(fact) => {
                info!(run_id = %ctx.run_id, condition = %fact.condition, temperature = fact.temperature, "Weather context loaded");
                ctx.weather = Some(fact);
                Ok(())
            }
            Err(err) => ctx.absorb(Stage::Weather, as_lookup("weather", err)),
        }
    }

    async fn holiday_context(&self, ctx: &mut RunContext) -> CampaignResult<()> {
        match bounded(
            "holiday lookup",
            self.config.holidays.timeout_ms,
            self.holidays.upcoming_holidays(self.config.holidays.days_ahead),
        )
        .await
        {
            Ok(events) => {
                ctx.holiday = select_primary_holiday(&events);
                match &ctx.holiday {
                    Some(h) => info!(run_id = %ctx.run_id, holiday = %h.name, score = h.priority_score, "Primary holiday selected"),
                    None => info!(run_id = %ctx.run_id, "No upcoming holidays in window"),
                }
                Ok(())
            }
            Err(err) => ctx.absorb(Stage::Holiday, as_lookup("holiday", err)),
        }
    }

    fn lifecycle_analysis(&self, ctx: &mut RunContext) {
        let (index, candidates) = self
            .lifecycle
            .analyze(&ctx.customers, &ctx.location, ctx.today);
        for candidate in &candidates {
            debug!(
                run_id = %ctx.run_id,
                cohort = candidate.cohort.as_str(),
                members = candidate.members.len(),
                "Lifecycle cohort"
            );
        }
        info!(run_id = %ctx.run_id, cohorts = candidates.len(), "Lifecycle analysis complete");
        ctx.cohorts = Some(index);
    }

    async fn content_generation(&self, ctx: &mut RunContext) -> CampaignResult<()> {
        let mut groups = self
            .grouping
            .partition(ctx.customers.clone(), ctx.trigger, ctx.today);
        info!(run_id = %ctx.run_id, groups = groups.len(), "Generating group content");

        for group in &mut groups {
            let generation = self.generation_context(ctx, group);
            let generated = self.content.generate(&generation).await;
            if let Some(err) = generated.error {
                ctx.absorb(Stage::ContentGeneration, err)?;
            }
            group.template = Some(generated.template);
        }

        ctx.groups = groups;
        Ok(())
    }

    /// The group's angle comes from its service need when that need has a
    /// cohort of its own, otherwise from the lifecycle cohort most of its
    /// members fall into.
    fn group_angle(&self, ctx: &RunContext, group: &CampaignGroup) -> Option<CohortKind> {
        let GroupKey::ServiceNeed(need) = &group.key else {
            return None;
        };
        CohortKind::angle_for(*need, &group.members, &self.config.lifecycle).or_else(|| {
            let ids: Vec<_> = group.members.iter().map(|c| c.id).collect();
            ctx.cohorts.as_ref()?.dominant_among(&ids)
        })
    }

    fn generation_context(&self, ctx: &RunContext, group: &CampaignGroup) -> GenerationContext {
        let angle = self.group_angle(ctx, group);
        if let Some(cohort) = angle {
            debug!(run_id = %ctx.run_id, group = %group.label(ctx.trigger), %cohort, "Messaging angle");
        }
        let angle = angle.map(angle_of);
        GenerationContext {
            trigger: ctx.trigger,
            location: ctx.location.clone(),
            group_label: group.label(ctx.trigger),
            group_key: group.key.clone(),
            member_count: group.members.len(),
            weather: ctx.weather.clone(),
            holiday: ctx.holiday.clone(),
            angle,
        }
    }

    async fn dispatch_messages(&self, ctx: &mut RunContext) -> CampaignResult<()> {
        let facts = RunFacts {
            location: ctx.location.clone(),
            weather: ctx.weather.clone(),
            holiday: ctx.holiday.clone(),
            today: ctx.today,
        };
        let mut records = Vec::new();
        let groups = std::mem::take(&mut ctx.groups);

        for group in &groups {
            let Some(template) = &group.template else {
                continue;
            };
            let label = group.label(ctx.trigger);
            let campaign = GroupCampaignRecord {
                id: Uuid::new_v4(),
                run_id: ctx.run_id,
                trigger: ctx.trigger,
                group_label: label.clone(),
                title: template.title.clone(),
                subject_line: template.subject_line.clone(),
                content: template.content.clone(),
                target_location: match &group.key {
                    GroupKey::Location(loc) => Some(loc.clone()),
                    GroupKey::ServiceNeed(_) => None,
                },
                target_count: group.members.len(),
                status: GroupCampaignStatus::Created,
                created_at: Utc::now(),
            };
            match bounded(
                "group campaign write",
                self.config.store.timeout_ms,
                self.store.create_group_campaign(&campaign),
            )
            .await
            {
                Ok(()) => ctx.campaigns_created += 1,
                Err(err) => ctx.absorb(Stage::Dispatch, as_store("group campaign", err))?,
            }

            for member in &group.members {
                let message = self.personalizer.render(template, member, None, &facts);
                let record = DispatchRecord {
                    id: Uuid::new_v4(),
                    run_id: ctx.run_id,
                    campaign_id: campaign.id,
                    group_label: label.clone(),
                    customer_id: member.id,
                    to_address: member.email.clone(),
                    to_name: member.name.clone(),
                    subject: message.subject,
                    html_body: html_body(&message.body, &template.cta_text),
                    text_body: message.body,
                    correlation_id: Uuid::new_v4(),
                    status: DispatchStatus::Created,
                    message_id: None,
                    error: None,
                    created_at: Utc::now(),
                    sent_at: None,
                };
                if let Err(err) = bounded(
                    "dispatch record write",
                    self.config.store.timeout_ms,
                    self.store.insert_dispatch(&record),
                )
                .await
                {
                    ctx.absorb(Stage::Dispatch, as_store("dispatch record", err))?;
                }
                records.push(record);
            }
        }
        ctx.groups = groups;

        let report = self.dispatch.dispatch(&mut records).await?;
        ctx.messages_sent = report.sent;
        for err in report.errors {
            ctx.absorb(Stage::Dispatch, err)?;
        }
        Ok(())
    }
}

fn angle_of(cohort: CohortKind) -> MessagingAngle {
    let profile = cohort.profile();
    MessagingAngle {
        name: cohort.as_str().to_string(),
        title: profile.title.to_string(),
        priority: profile.priority.as_str().to_string(),
        benefits: profile.benefits.iter().map(|b| b.to_string()).collect(),
        cta: profile.cta.to_string(),
    }
}

/// Timeouts and transport errors of a context lookup are lookup failures.
fn as_lookup(what: &str, err: CampaignError) -> CampaignError {
    match err {
        CampaignError::Lookup(_) => err,
        e if e.is_fatal() => e,
        e => CampaignError::Lookup(format!("{what}: {e}")),
    }
}

fn as_store(what: &str, err: CampaignError) -> CampaignError {
    match err {
        CampaignError::Store(_) => err,
        e if e.is_fatal() => e,
        e => CampaignError::Store(format!("{what}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::types::ServiceNeed;

    #[test]
    fn test_lookup_classification_keeps_fatal() {
        let wrapped = as_lookup("weather", CampaignError::timeout("weather lookup", 10));
        assert!(matches!(wrapped, CampaignError::Lookup(_)));
        assert!(wrapped.to_string().contains("weather"));

        let fatal = as_store("group campaign", CampaignError::InvalidTransition("x".into()));
        assert!(fatal.is_fatal());
    }

    #[test]
    fn test_angle_carries_cohort_profile() {
        let angle = angle_of(CohortKind::ServiceDue);
        assert_eq!(angle.name, "service_due");
        assert_eq!(angle.benefits.len(), 4);
        assert!(!angle.cta.is_empty());
        assert!(
            CohortKind::angle_for(ServiceNeed::GeneralService, &[], &Default::default()).is_none()
        );
    }
}
