use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Weather, holiday or data-store read failure.
    #[error("Lookup failure: {0}")]
    Lookup(String),

    /// Content-generation transport or parse failure.
    #[error("Generation failure: {0}")]
    Generation(String),

    /// Per-record delivery failure.
    #[error("Dispatch failure: {0}")]
    Dispatch(String),

    #[error("Timed out after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Store write failure; the write is lost but the run continues.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CampaignError {
    /// Fatal errors abort the run; everything else is recorded and the
    /// pipeline continues with best-effort defaults.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CampaignError::InvalidTransition(_) | CampaignError::Internal(_)
        )
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        CampaignError::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(!CampaignError::Lookup("weather down".into()).is_fatal());
        assert!(!CampaignError::Generation("bad json".into()).is_fatal());
        assert!(!CampaignError::Dispatch("smtp 500".into()).is_fatal());
        assert!(!CampaignError::Store("insert failed".into()).is_fatal());
        assert!(!CampaignError::timeout("weather lookup", 10).is_fatal());
        assert!(CampaignError::InvalidTransition("sent -> created".into()).is_fatal());
        assert!(CampaignError::Internal(anyhow::anyhow!("bug")).is_fatal());
    }

    #[test]
    fn test_timeout_message() {
        let err = CampaignError::timeout("content generation", 2500);
        assert_eq!(
            err.to_string(),
            "Timed out after 2500ms: content generation"
        );
    }
}
