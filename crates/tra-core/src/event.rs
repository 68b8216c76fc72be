//! Typed progress events emitted by the workflow broadcaster.

use crate::decision::model::WarningSeverity;
use crate::gap::model::TechCategory;
use serde::{Deserialize, Serialize};

/// Events fanned out to real-time listeners attached to a session.
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(tag = "type", content = "data")]
pub enum WorkflowEvent {
    /// The workflow began executing.
    WorkflowStarted { session_id: String },
    /// A node finished; carries the node name and new progress percentage.
    ProgressUpdate { node: String, percentage: u8 },
    /// Free-form agent output for the conversation transcript.
    AgentMessage {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    /// The session suspended waiting for a technology decision.
    WaitingUserDecision {
        category: TechCategory,
        options: Vec<String>,
    },
    /// A decision conflict or degraded-path warning.
    Warning {
        severity: WarningSeverity,
        detail: String,
    },
    /// All artifacts were persisted; carries the written version.
    WorkflowCompleted { session_id: String, version: i64 },
    /// The session transitioned to `failed`.
    WorkflowFailed { reason: String },
}

impl WorkflowEvent {
    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::WorkflowStarted { .. } => "workflow_started",
            Self::ProgressUpdate { .. } => "progress_update",
            Self::AgentMessage { .. } => "agent_message",
            Self::WaitingUserDecision { .. } => "waiting_user_decision",
            Self::Warning { .. } => "warning",
            Self::WorkflowCompleted { .. } => "workflow_completed",
            Self::WorkflowFailed { .. } => "workflow_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = WorkflowEvent::ProgressUpdate {
            node: "generate_trd".to_string(),
            percentage: 70,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ProgressUpdate");
        assert_eq!(json["data"]["node"], "generate_trd");
        assert_eq!(json["data"]["percentage"], 70);
    }

    #[test]
    fn test_agent_message_omits_empty_data() {
        let event = WorkflowEvent::AgentMessage {
            text: "hello".to_string(),
            data: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json["data"].get("data").is_none());
    }
}
