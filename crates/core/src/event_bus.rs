//! Pipeline event bus: a trait for emitting run progress events from any stage.
//!
//! Stages accept an `Arc<dyn EventSink>`; the binary wires a no-op sink and
//! tests wire a capture sink to assert on what the pipeline did.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::types::{CustomerId, RunStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEventKind {
    StageCompleted {
        stage: String,
    },
    MessageSent {
        group_label: String,
        customer_id: CustomerId,
        message_id: String,
    },
    MessageFailed {
        group_label: String,
        customer_id: CustomerId,
        error: String,
    },
    RunFinished {
        status: RunStatus,
        messages_sent: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineEvent {
    pub event_id: Uuid,
    pub run_id: Uuid,
    pub kind: PipelineEventKind,
    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            PipelineEventKind::StageCompleted { .. } => "stage_completed",
            PipelineEventKind::MessageSent { .. } => "message_sent",
            PipelineEventKind::MessageFailed { .. } => "message_failed",
            PipelineEventKind::RunFinished { .. } => "run_finished",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// No-op sink for runs that don't need event emission.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: PipelineEvent) {}
}

/// In-memory sink that captures events for testing.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn count_kind(&self, kind_name: &str) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| e.kind_name() == kind_name).count())
            .unwrap_or(0)
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

pub fn make_event(run_id: Uuid, kind: PipelineEventKind) -> PipelineEvent {
    PipelineEvent {
        event_id: Uuid::new_v4(),
        run_id,
        kind,
        timestamp: Utc::now(),
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}
