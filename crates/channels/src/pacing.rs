//! Fixed-interval pacing for sequential dispatch.
//!
//! The plan decides how long to wait after each record; the `Pacer` decides
//! how to wait. Production uses the tokio timer, tests record the requested
//! pauses without sleeping.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use campaign_core::config::DispatchConfig;
use campaign_core::providers::Pacer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePlan {
    pub batch_size: usize,
    pub record_delay: Duration,
    pub batch_delay: Duration,
}

impl RatePlan {
    pub fn from_config(cfg: &DispatchConfig) -> Self {
        Self {
            batch_size: cfg.batch_size.max(1),
            record_delay: Duration::from_millis(cfg.record_delay_ms),
            batch_delay: Duration::from_millis(cfg.batch_delay_ms),
        }
    }

    /// Pauses owed after the record at zero-based `position` out of `total`:
    /// the record delay always, plus the batch delay when a full batch just
    /// completed and more records remain.
    pub fn pauses_after(&self, position: usize, total: usize) -> Vec<Duration> {
        let mut pauses = vec![self.record_delay];
        let done = position + 1;
        if done % self.batch_size == 0 && done < total {
            pauses.push(self.batch_delay);
        }
        pauses
    }

    pub fn batch_count(&self, total: usize) -> usize {
        total.div_ceil(self.batch_size)
    }
}

pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Records every requested pause and returns immediately.
#[derive(Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn total(&self) -> Duration {
        self.pauses().iter().sum()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration) {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push(duration);
        }
    }
}
