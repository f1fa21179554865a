//! Navigation backend seam.
//!
//! The sequencer hands one [`NavGoal`] at a time to a [`NavigationClient`]
//! and blocks until the backend reports how the goal ended. Planning,
//! localization and actuation all live behind this trait.
//!
//! # Implementations
//!
//! - [`TcpNavigationClient`]: goal server reached over length-prefixed JSON
//! - [`MockNavigationClient`]: scripted outcomes for tests and dry runs

mod mock;
mod tcp;

pub use mock::MockNavigationClient;
pub use tcp::TcpNavigationClient;

use crate::types::PoseStamped;
use serde::{Deserialize, Serialize};

/// A single-waypoint request for the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavGoal {
    /// Monotonically increasing per sequencer
    pub id: u32,
    /// Pose to reach, stamped at dispatch time in the goal frame
    pub target_pose: PoseStamped,
}

/// Terminal (or semi-terminal) state reported by the backend for a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalOutcome {
    Succeeded,
    Pending,
    Active,
    Recalled,
    Rejected,
    Preempted,
    Aborted,
}

impl GoalOutcome {
    /// Outcomes that count toward the consecutive-failure limit.
    pub fn is_failure(&self) -> bool {
        matches!(self, GoalOutcome::Rejected | GoalOutcome::Aborted)
    }

    /// Log line for this outcome.
    pub fn description(&self) -> &'static str {
        match self {
            GoalOutcome::Succeeded => "Goal succeeded",
            GoalOutcome::Pending => "Goal pending",
            GoalOutcome::Active => "Goal active",
            GoalOutcome::Recalled => "Goal recalled",
            GoalOutcome::Rejected => "Goal rejected",
            GoalOutcome::Preempted => "Goal preempted",
            GoalOutcome::Aborted => "Goal aborted",
        }
    }
}

/// Frames sent to a goal server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavRequest {
    Goal(NavGoal),
}

/// Frames received from a goal server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavReply {
    /// Progress update; the goal is still in flight
    Feedback { id: u32, state: GoalOutcome },
    /// How the goal ended
    Result { id: u32, outcome: GoalOutcome },
}

/// Goal-based navigation backend.
///
/// `submit_goal` blocks until the backend reports an outcome. There is no
/// timeout and no cancellation; at most one goal is in flight at a time.
/// Transport problems must be reported as an outcome, never as a panic.
pub trait NavigationClient: Send {
    fn submit_goal(&mut self, goal: &NavGoal) -> GoalOutcome;
}

impl<T: NavigationClient + ?Sized> NavigationClient for Box<T> {
    fn submit_goal(&mut self, goal: &NavGoal) -> GoalOutcome {
        (**self).submit_goal(goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classification() {
        assert!(GoalOutcome::Rejected.is_failure());
        assert!(GoalOutcome::Aborted.is_failure());
        for outcome in [
            GoalOutcome::Succeeded,
            GoalOutcome::Pending,
            GoalOutcome::Active,
            GoalOutcome::Recalled,
            GoalOutcome::Preempted,
        ] {
            assert!(!outcome.is_failure(), "{outcome:?}");
        }
    }

    #[test]
    fn test_reply_wire_shape() {
        let reply: NavReply =
            serde_json::from_str(r#"{"type":"result","id":4,"outcome":"ABORTED"}"#).unwrap();
        assert!(matches!(
            reply,
            NavReply::Result {
                id: 4,
                outcome: GoalOutcome::Aborted
            }
        ));

        let request = NavRequest::Goal(NavGoal {
            id: 1,
            target_pose: PoseStamped::planar("map", 0.0, 0.0, 0.0),
        });
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "goal");
        assert_eq!(json["id"], 1);
        assert_eq!(json["target_pose"]["header"]["frame_id"], "map");
    }
}
