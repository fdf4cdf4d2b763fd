//! Mutable state owned by one run.

use chrono::{NaiveDate, Utc};
use metrics::counter;
use tracing::warn;
use uuid::Uuid;

use campaign_core::types::{
    CampaignGroup, Customer, HolidayFact, RunResult, RunStatus, RunSummary, TriggerKind,
    WeatherFact,
};
use campaign_core::{CampaignError, CampaignResult};
use campaign_segmentation::CohortIndex;

use crate::state_machine::Stage;

#[derive(Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    pub location: String,
    pub trigger: TriggerKind,
    pub today: NaiveDate,
    pub weather: Option<WeatherFact>,
    pub holiday: Option<HolidayFact>,
    pub errors: Vec<String>,
    pub completed_stages: Vec<String>,
    pub customers: Vec<Customer>,
    pub cohorts: Option<CohortIndex>,
    pub groups: Vec<CampaignGroup>,
    pub campaigns_created: usize,
    pub messages_sent: usize,
}

impl RunContext {
    pub fn new(location: &str, trigger: TriggerKind, today: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            location: location.to_string(),
            trigger,
            today,
            weather: None,
            holiday: None,
            errors: Vec::new(),
            completed_stages: Vec::new(),
            customers: Vec::new(),
            cohorts: None,
            groups: Vec::new(),
            campaigns_created: 0,
            messages_sent: 0,
        }
    }

    /// Records a soft failure and lets the run continue. Fatal errors are
    /// handed back so the caller can abort with `?`.
    pub fn absorb(&mut self, stage: Stage, err: CampaignError) -> CampaignResult<()> {
        if err.is_fatal() {
            return Err(err);
        }
        warn!(run_id = %self.run_id, stage = stage.as_str(), error = %err, "Stage error");
        counter!("campaign.stage_errors", "stage" => stage.as_str()).increment(1);
        self.errors.push(err.to_string());
        Ok(())
    }

    pub fn complete(&mut self, stage: Stage) {
        self.completed_stages.push(stage.as_str().to_string());
    }

    pub fn customers_targeted(&self) -> usize {
        self.customers.len()
    }

    pub fn summary_line(&self) -> String {
        let mut parts = vec![
            format!("Campaign executed for {}", self.location),
            format!("Targeted {} customers", self.customers_targeted()),
            format!("Created {} campaigns", self.campaigns_created),
            format!("Sent {} emails", self.messages_sent),
        ];
        if let Some(weather) = &self.weather {
            parts.push(format!(
                "Weather context: {} at {}°C",
                weather.condition, weather.temperature
            ));
        }
        if let Some(holiday) = &self.holiday {
            parts.push(format!("Holiday context: {} on {}", holiday.name, holiday.date));
        }
        if !self.errors.is_empty() {
            parts.push(format!(
                "Encountered {} errors during execution",
                self.errors.len()
            ));
        }
        parts.join(" | ")
    }

    /// The result of a run that reached `Finalize`.
    pub fn completed_result(&self, execution_time_ms: u64) -> RunResult {
        RunResult {
            run_id: self.run_id,
            location: self.location.clone(),
            trigger: self.trigger,
            status: if self.errors.is_empty() {
                RunStatus::Success
            } else {
                RunStatus::PartialSuccess
            },
            customers_targeted: self.customers_targeted(),
            campaigns_created: self.campaigns_created,
            messages_sent: self.messages_sent,
            errors: self.errors.clone(),
            execution_time_ms,
            summary: self.summary_line(),
        }
    }

    /// The result of a run aborted by a fatal error: zero counts, the soft
    /// errors seen so far plus the fatal one.
    pub fn failed_result(&self, fatal: &CampaignError, execution_time_ms: u64) -> RunResult {
        let mut errors = self.errors.clone();
        errors.push(fatal.to_string());
        RunResult {
            run_id: self.run_id,
            location: self.location.clone(),
            trigger: self.trigger,
            status: RunStatus::Failed,
            customers_targeted: 0,
            campaigns_created: 0,
            messages_sent: 0,
            errors,
            execution_time_ms,
            summary: format!("Workflow failed: {fatal}"),
        }
    }

    pub fn summary(&self, result: RunResult) -> RunSummary {
        RunSummary {
            result,
            completed_stages: self.completed_stages.clone(),
            weather: self.weather.clone(),
            holiday: self.holiday.clone(),
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RunContext {
        RunContext::new(
            "Mumbai",
            TriggerKind::Weather,
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        )
    }

    #[test]
    fn test_soft_errors_give_partial_success() {
        let mut ctx = ctx();
        assert_eq!(ctx.completed_result(5).status, RunStatus::Success);

        ctx.absorb(Stage::Weather, CampaignError::Lookup("weather down".into()))
            .unwrap();
        let result = ctx.completed_result(5);
        assert_eq!(result.status, RunStatus::PartialSuccess);
        assert_eq!(result.errors, vec!["Lookup failure: weather down".to_string()]);
        assert!(result
            .summary
            .ends_with("Encountered 1 errors during execution"));
    }

    #[test]
    fn test_fatal_errors_are_handed_back() {
        let mut ctx = ctx();
        let err = ctx
            .absorb(Stage::Dispatch, CampaignError::InvalidTransition("x".into()))
            .unwrap_err();
        assert!(ctx.errors.is_empty());

        ctx.campaigns_created = 2;
        ctx.messages_sent = 7;
        let result = ctx.failed_result(&err, 9);
        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.messages_sent, 0);
        assert_eq!(result.campaigns_created, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.summary.starts_with("Workflow failed:"));
    }

    #[test]
    fn test_summary_line_includes_context() {
        let mut ctx = ctx();
        ctx.weather = Some(WeatherFact {
            location: "Mumbai".into(),
            temperature: 26.0,
            condition: "Rain".into(),
            description: "light rain".into(),
            humidity: 80,
        });
        ctx.campaigns_created = 1;
        assert_eq!(
            ctx.summary_line(),
            "Campaign executed for Mumbai | Targeted 0 customers | Created 1 campaigns | \
             Sent 0 emails | Weather context: Rain at 26°C"
        );
    }
}
