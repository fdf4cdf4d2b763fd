//! Sequential, paced email dispatch.
//!
//! Records are sent one at a time in the order given. A failure on one
//! record is recorded against that record only; the loop always moves on.
//! Group metrics are flushed whenever the campaign changes and once at the
//! end, so every group touched gets exactly one metrics write.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tracing::{debug, info, warn};
use uuid::Uuid;

use campaign_core::config::DispatchConfig;
use campaign_core::event_bus::{make_event, EventSink, PipelineEventKind};
use campaign_core::providers::{bounded, CampaignStore, MessageDelivery, Pacer};
use campaign_core::types::{DispatchRecord, GroupMetrics};
use campaign_core::{CampaignError, CampaignResult};

use crate::email::EmailComposer;
use crate::pacing::RatePlan;

#[derive(Debug, Default)]
pub struct DispatchReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    /// Per-record delivery failures and lost store writes, in order.
    pub errors: Vec<CampaignError>,
}

pub struct DispatchEngine {
    delivery: Arc<dyn MessageDelivery>,
    store: Arc<dyn CampaignStore>,
    pacer: Arc<dyn Pacer>,
    events: Arc<dyn EventSink>,
    plan: RatePlan,
    send_timeout_ms: u64,
    composer: EmailComposer,
}

struct GroupTally {
    campaign_id: Uuid,
    metrics: GroupMetrics,
}

impl DispatchEngine {
    pub fn new(
        delivery: Arc<dyn MessageDelivery>,
        store: Arc<dyn CampaignStore>,
        pacer: Arc<dyn Pacer>,
        events: Arc<dyn EventSink>,
        cfg: &DispatchConfig,
    ) -> Self {
        Self {
            delivery,
            store,
            pacer,
            events,
            plan: RatePlan::from_config(cfg),
            send_timeout_ms: cfg.send_timeout_ms,
            composer: EmailComposer::new(cfg.tags.clone()),
        }
    }

    pub fn plan(&self) -> RatePlan {
        self.plan
    }

    /// Sends every record. Only an illegal status transition escapes as an
    /// error; delivery and store failures land in the report.
    pub async fn dispatch(&self, records: &mut [DispatchRecord]) -> CampaignResult<DispatchReport> {
        let total = records.len();
        let mut report = DispatchReport::default();
        let mut tally: Option<GroupTally> = None;

        info!(
            records = total,
            batches = self.plan.batch_count(total),
            "Starting dispatch"
        );

        for (position, record) in records.iter_mut().enumerate() {
            if tally.as_ref().map(|t| t.campaign_id) != Some(record.campaign_id) {
                if let Some(done) = tally.take() {
                    self.flush_metrics(done, &mut report).await;
                }
                tally = Some(GroupTally {
                    campaign_id: record.campaign_id,
                    metrics: GroupMetrics::default(),
                });
            }

            let delivered = self.send_one(record, &mut report).await?;
            report.attempted += 1;
            if let Some(t) = tally.as_mut() {
                t.metrics.customers_targeted += 1;
                if delivered {
                    t.metrics.messages_sent += 1;
                }
            }

            for pause in self.plan.pauses_after(position, total) {
                self.pacer.pause(pause).await;
            }
        }

        if let Some(done) = tally.take() {
            self.flush_metrics(done, &mut report).await;
        }

        info!(
            sent = report.sent,
            failed = report.failed,
            "Dispatch complete"
        );
        Ok(report)
    }

    async fn send_one(
        &self,
        record: &mut DispatchRecord,
        report: &mut DispatchReport,
    ) -> CampaignResult<bool> {
        let email = self.composer.compose(record);
        let outcome = bounded(
            "message delivery",
            self.send_timeout_ms,
            self.delivery.send(&email),
        )
        .await;

        match outcome {
            Ok(message_id) => {
                record.mark_sent(message_id.clone(), Utc::now())?;
                if let Err(e) = self
                    .store
                    .update_dispatch_status(record)
                    .await
                {
                    warn!(dispatch_id = %record.id, error = %e, "Failed to persist sent status");
                    report.errors.push(CampaignError::Store(format!(
                        "dispatch {}: {e}",
                        record.id
                    )));
                }
                self.events.emit(make_event(
                    record.run_id,
                    PipelineEventKind::MessageSent {
                        group_label: record.group_label.clone(),
                        customer_id: record.customer_id,
                        message_id: message_id.clone(),
                    },
                ));
                counter!("dispatch.sent", "group" => record.group_label.clone()).increment(1);
                debug!(customer_id = record.customer_id, %message_id, "Message sent");
                report.sent += 1;
                Ok(true)
            }
            Err(e) => {
                let reason = e.to_string();
                record.mark_failed(reason.clone())?;
                if let Err(store_err) = self
                    .store
                    .update_dispatch_status(record)
                    .await
                {
                    warn!(dispatch_id = %record.id, error = %store_err, "Failed to persist failed status");
                    report.errors.push(CampaignError::Store(format!(
                        "dispatch {}: {store_err}",
                        record.id
                    )));
                }
                self.events.emit(make_event(
                    record.run_id,
                    PipelineEventKind::MessageFailed {
                        group_label: record.group_label.clone(),
                        customer_id: record.customer_id,
                        error: reason.clone(),
                    },
                ));
                counter!("dispatch.failed", "group" => record.group_label.clone()).increment(1);
                warn!(customer_id = record.customer_id, error = %reason, "Message failed");
                report.failed += 1;
                report.errors.push(CampaignError::Dispatch(format!(
                    "customer {}: {reason}",
                    record.customer_id
                )));
                Ok(false)
            }
        }
    }

    async fn flush_metrics(&self, tally: GroupTally, report: &mut DispatchReport) {
        if let Err(e) = self
            .store
            .update_group_metrics(tally.campaign_id, &tally.metrics)
            .await
        {
            warn!(campaign_id = %tally.campaign_id, error = %e, "Failed to update group metrics");
            report.errors.push(CampaignError::Store(format!(
                "group metrics {}: {e}",
                tally.campaign_id
            )));
        }
    }
}
