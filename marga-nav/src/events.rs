//! Outbound notifications for observers tracking traversal progress.

use crate::types::PoseStamped;
use serde::{Deserialize, Serialize};

/// Status published on the goal-status channel.
///
/// Both variants share the wire tag `"success"`; [`StatusEvent::kind`]
/// tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEvent {
    /// A dispatched goal reported `Succeeded`
    GoalSucceeded,
    /// The cursor reached the end of the path
    PathCompleted,
}

impl StatusEvent {
    /// Legacy status tag.
    pub fn tag(&self) -> &'static str {
        "success"
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StatusEvent::GoalSucceeded => "goal_succeeded",
            StatusEvent::PathCompleted => "path_completed",
        }
    }
}

/// Receiver of sequencer notifications.
pub trait EventSink: Send {
    /// Emitted once per waypoint, right before its goal is dispatched.
    fn next_goal(&mut self, pose: &PoseStamped);

    fn goal_status(&mut self, event: StatusEvent);
}

/// Notification captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    NextGoal(PoseStamped),
    Status(StatusEvent),
}

/// In-memory sink that keeps every notification in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    notifications: Vec<Notification>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn next_goals(&self) -> Vec<&PoseStamped> {
        self.notifications
            .iter()
            .filter_map(|n| match n {
                Notification::NextGoal(pose) => Some(pose),
                Notification::Status(_) => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<StatusEvent> {
        self.notifications
            .iter()
            .filter_map(|n| match n {
                Notification::Status(event) => Some(*event),
                Notification::NextGoal(_) => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.notifications.clear();
    }
}

impl EventSink for RecordingSink {
    fn next_goal(&mut self, pose: &PoseStamped) {
        self.notifications.push(Notification::NextGoal(pose.clone()));
    }

    fn goal_status(&mut self, event: StatusEvent) {
        self.notifications.push(Notification::Status(event));
    }
}
