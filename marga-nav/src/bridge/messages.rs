//! Message types carried over the bridge.
//!
//! Inbound (source → node): path replacement and traversal commands.
//! Outbound (node → observers): next-goal announcements and goal status.

use crate::events::StatusEvent;
use crate::types::PoseStamped;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Replace the stored path (cursor rewinds to the first pose)
    Path { poses: Vec<PoseStamped> },
    /// `"next"`, `"auto"`, `"loop"`, or `"cancel"`
    Command { data: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Waypoint about to be dispatched
    NextGoal { pose: PoseStamped },
    /// `data` is the legacy tag, `kind` distinguishes goal vs path success
    GoalStatus { data: String, kind: String },
}

impl From<StatusEvent> for OutboundMessage {
    fn from(event: StatusEvent) -> Self {
        OutboundMessage::GoalStatus {
            data: event.tag().to_string(),
            kind: event.kind().to_string(),
        }
    }
}
