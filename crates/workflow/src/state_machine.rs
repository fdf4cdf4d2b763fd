use serde::{Deserialize, Serialize};

use campaign_core::types::TriggerKind;
use campaign_core::{CampaignError, CampaignResult};

/// Stages of a campaign run, in pipeline order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Targeting,
    Weather,
    Holiday,
    Lifecycle,
    ContentGeneration,
    Dispatch,
    Finalize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Targeting => "targeting",
            Stage::Weather => "weather",
            Stage::Holiday => "holiday",
            Stage::Lifecycle => "lifecycle",
            Stage::ContentGeneration => "content_generation",
            Stage::Dispatch => "dispatch",
            Stage::Finalize => "finalize",
        }
    }

    /// The context stage that follows targeting. Weather and holiday runs
    /// get their lookup; every other trigger goes straight to lifecycle
    /// analysis.
    pub fn after_targeting(trigger: TriggerKind) -> Stage {
        match trigger {
            TriggerKind::Weather => Stage::Weather,
            TriggerKind::Holiday => Stage::Holiday,
            TriggerKind::Lifecycle | TriggerKind::Scheduled => Stage::Lifecycle,
        }
    }
}

/// Describes a single valid stage transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTransition {
    pub from: Stage,
    pub to: Stage,
}

/// Guards a run by enforcing the pipeline's stage order. Entry is always
/// `Targeting`; `Finalize` is terminal.
#[derive(Debug, Clone)]
pub struct PipelineStateMachine {
    pub state: Stage,
    pub transitions: Vec<StageTransition>,
}

impl PipelineStateMachine {
    pub fn new() -> Self {
        let edge = |from, to| StageTransition { from, to };
        let transitions = vec![
            edge(Stage::Targeting, Stage::Weather),
            edge(Stage::Targeting, Stage::Holiday),
            edge(Stage::Targeting, Stage::Lifecycle),
            edge(Stage::Weather, Stage::ContentGeneration),
            edge(Stage::Holiday, Stage::ContentGeneration),
            edge(Stage::Lifecycle, Stage::ContentGeneration),
            edge(Stage::ContentGeneration, Stage::Dispatch),
            edge(Stage::Dispatch, Stage::Finalize),
        ];

        Self {
            state: Stage::Targeting,
            transitions,
        }
    }

    pub fn can_transition(&self, from: Stage, to: Stage) -> bool {
        self.transitions.iter().any(|t| t.from == from && t.to == to)
    }

    pub fn transition(&mut self, to: Stage) -> CampaignResult<()> {
        if self.can_transition(self.state, to) {
            self.state = to;
            Ok(())
        } else {
            Err(CampaignError::InvalidTransition(format!(
                "stage {} cannot follow {}",
                to.as_str(),
                self.state.as_str()
            )))
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == Stage::Finalize
    }
}

impl Default for PipelineStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
