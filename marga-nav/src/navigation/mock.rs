//! Simulated navigation backend.
//!
//! Replays a script of outcomes (then succeeds every further goal) and
//! records each submitted goal. Used by tests and by `backend = "mock"`
//! dry runs where no planner is available.

use super::{GoalOutcome, NavGoal, NavigationClient};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MockNavigationClient {
    script: VecDeque<GoalOutcome>,
    goal_duration: Duration,
    goals: Vec<NavGoal>,
}

impl MockNavigationClient {
    /// Backend that succeeds every goal immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that reports `outcomes` in order, then `Succeeded`.
    pub fn with_script(outcomes: impl IntoIterator<Item = GoalOutcome>) -> Self {
        Self {
            script: outcomes.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Simulated travel time per goal.
    pub fn with_goal_duration(mut self, duration: Duration) -> Self {
        self.goal_duration = duration;
        self
    }

    /// Every goal submitted so far, in order.
    pub fn goals(&self) -> &[NavGoal] {
        &self.goals
    }
}

impl NavigationClient for MockNavigationClient {
    fn submit_goal(&mut self, goal: &NavGoal) -> GoalOutcome {
        self.goals.push(goal.clone());
        if !self.goal_duration.is_zero() {
            std::thread::sleep(self.goal_duration);
        }
        let outcome = self.script.pop_front().unwrap_or(GoalOutcome::Succeeded);
        tracing::debug!("Mock backend: goal {} -> {:?}", goal.id, outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PoseStamped;

    fn goal(id: u32) -> NavGoal {
        NavGoal {
            id,
            target_pose: PoseStamped::planar("map", id as f64, 0.0, 0.0),
        }
    }

    #[test]
    fn test_script_then_success() {
        let mut client =
            MockNavigationClient::with_script([GoalOutcome::Rejected, GoalOutcome::Aborted]);

        assert_eq!(client.submit_goal(&goal(1)), GoalOutcome::Rejected);
        assert_eq!(client.submit_goal(&goal(2)), GoalOutcome::Aborted);
        assert_eq!(client.submit_goal(&goal(3)), GoalOutcome::Succeeded);

        let ids: Vec<u32> = client.goals().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
