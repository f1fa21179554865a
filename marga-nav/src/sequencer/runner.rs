//! The waypoint sequencer state machine.
//!
//! ```text
//! command ──► Mode ──► run
//!                       │
//!                       ▼
//!            ┌──── move_once ◄───────────┐
//!            │  announce waypoint        │ Continuing
//!            │  dispatch goal (blocking) │ (auto / loop)
//!            │  advance cursor           │
//!            └──► exhausted? ────────────┘
//!                       │ yes
//!                       ▼
//!              PathCompleted status
//! ```
//!
//! Exhaustion is checked after every move, so calling `move_once` on an
//! exhausted path dispatches nothing and reports `PathCompleted` again.

use super::cancel::CancelToken;
use super::mode::{Mode, RunEnd, RunReport, StepResult};
use crate::config::SequencerConfig;
use crate::events::{EventSink, StatusEvent};
use crate::navigation::{GoalOutcome, NavGoal, NavigationClient};
use crate::store::WaypointStore;
use crate::types::{Header, PoseStamped, now_us};
use tracing::{debug, info, warn};

/// Per-run counters, reset when a command starts.
#[derive(Debug, Default, Clone, Copy)]
struct RunStats {
    dispatched: usize,
    succeeded: usize,
    passes_completed: u32,
    failure_streak: u32,
}

/// Drives a [`NavigationClient`] across the stored path.
///
/// Owns all traversal state; commands and path updates must be applied from
/// a single thread. Only the [`CancelToken`] is meant to be shared.
pub struct WaypointSequencer<N, S> {
    store: WaypointStore,
    client: N,
    sink: S,
    config: SequencerConfig,
    cancel: CancelToken,
    /// Gate for `move_once`; only open while a run is executing
    stepping: bool,
    /// Cancel epoch the running command was accepted at
    accepted_epoch: u64,
    next_goal_id: u32,
    stats: RunStats,
}

impl<N: NavigationClient, S: EventSink> WaypointSequencer<N, S> {
    pub fn new(client: N, sink: S, config: SequencerConfig) -> Self {
        Self {
            store: WaypointStore::new(),
            client,
            sink,
            config,
            cancel: CancelToken::new(),
            stepping: false,
            accepted_epoch: 0,
            next_goal_id: 1,
            stats: RunStats::default(),
        }
    }

    /// Replace the path and rewind to its first waypoint.
    pub fn set_path(&mut self, poses: Vec<PoseStamped>) {
        info!("Number of points received: {}", poses.len());
        self.store.set_path(poses);
    }

    /// Interpret `command` and execute the resulting traversal run.
    ///
    /// Cancels issued before this call do not apply.
    pub fn handle_command(&mut self, command: &str) -> RunReport {
        self.handle_queued_command(command, self.cancel.epoch())
    }

    /// Like [`handle_command`](Self::handle_command) for a command accepted
    /// at cancel epoch `accepted_epoch`. Any cancel since then stops the run.
    pub fn handle_queued_command(&mut self, command: &str, accepted_epoch: u64) -> RunReport {
        let mode = Mode::from_command(command, self.config.loop_passes);
        if mode == Mode::Idle {
            debug!("Ignoring unrecognized command {:?}", command);
        }
        self.run_accepted_at(mode, accepted_epoch)
    }

    /// Execute one traversal run in `mode`. Blocks until the run stops.
    pub fn run(&mut self, mode: Mode) -> RunReport {
        self.run_accepted_at(mode, self.cancel.epoch())
    }

    fn run_accepted_at(&mut self, mode: Mode, accepted_epoch: u64) -> RunReport {
        self.accepted_epoch = accepted_epoch;
        self.stats = RunStats::default();

        let end = match mode {
            Mode::Idle => RunEnd::Ignored,
            Mode::StepOnce if self.cancel_requested() => RunEnd::Cancelled,
            Mode::StepOnce => {
                self.stepping = true;
                let step = self.move_once();
                info!("Moving once");
                match step {
                    StepResult::Exhausted => RunEnd::Completed,
                    StepResult::Continuing if self.failure_limit_reached() => RunEnd::Halted,
                    StepResult::Continuing => RunEnd::Continuing,
                }
            }
            Mode::AutoRun => {
                self.stepping = true;
                self.run_to_exhaustion()
            }
            Mode::LoopRun(passes) => {
                self.stepping = true;
                let mut end = RunEnd::Completed;
                for pass in 0..passes {
                    info!("Loop {}", pass);
                    end = self.run_to_exhaustion();
                    if end != RunEnd::Completed {
                        break;
                    }
                    self.store.rewind();
                }
                end
            }
        };
        self.stepping = false;

        let report = RunReport {
            mode,
            end,
            dispatched: self.stats.dispatched,
            succeeded: self.stats.succeeded,
            passes_completed: self.stats.passes_completed,
        };
        if mode != Mode::Idle {
            info!(
                "Run {} ended {:?}: {} goals dispatched, {} succeeded, cursor {}/{}",
                mode,
                end,
                report.dispatched,
                report.succeeded,
                self.store.cursor(),
                self.store.len()
            );
        }
        report
    }

    /// Visit at most one waypoint and report whether any remain.
    ///
    /// Outside a run (stepping disabled) this has no side effects.
    pub fn move_once(&mut self) -> StepResult {
        if !self.stepping {
            return if self.store.is_exhausted() {
                StepResult::Exhausted
            } else {
                StepResult::Continuing
            };
        }

        if let Some(waypoint) = self.store.current().cloned() {
            self.sink.next_goal(&waypoint);
            self.dispatch_goal(&waypoint);
            self.store.advance();
        }

        if self.store.is_exhausted() {
            info!("End of path reached");
            self.sink.goal_status(StatusEvent::PathCompleted);
            self.stats.passes_completed += 1;
            StepResult::Exhausted
        } else {
            StepResult::Continuing
        }
    }

    /// Send `waypoint` to the backend as a goal and wait for its outcome.
    pub fn dispatch_goal(&mut self, waypoint: &PoseStamped) -> GoalOutcome {
        let goal = self.build_goal(waypoint);
        let position = goal.target_pose.pose.position;
        debug!(
            "Dispatching goal {} to ({:.2}, {:.2}, {:.2}) heading {:.1}°",
            goal.id,
            position.x,
            position.y,
            position.z,
            goal.target_pose.pose.orientation.yaw().to_degrees()
        );

        let outcome = self.client.submit_goal(&goal);
        self.stats.dispatched += 1;

        match outcome {
            GoalOutcome::Succeeded => {
                info!("{} (goal {})", outcome.description(), goal.id);
                self.stats.succeeded += 1;
                self.sink.goal_status(StatusEvent::GoalSucceeded);
            }
            GoalOutcome::Pending | GoalOutcome::Active => {
                info!("{} (goal {})", outcome.description(), goal.id);
            }
            GoalOutcome::Recalled
            | GoalOutcome::Rejected
            | GoalOutcome::Preempted
            | GoalOutcome::Aborted => {
                warn!("{} (goal {})", outcome.description(), goal.id);
            }
        }

        if outcome.is_failure() {
            self.stats.failure_streak += 1;
        } else {
            self.stats.failure_streak = 0;
        }

        outcome
    }

    /// Handle for stopping a run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &WaypointStore {
        &self.store
    }

    pub fn client(&self) -> &N {
        &self.client
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Step until the path is exhausted, cancelled, or halted.
    fn run_to_exhaustion(&mut self) -> RunEnd {
        loop {
            if self.cancel_requested() {
                self.stepping = false;
                info!(
                    "Run cancelled before waypoint {}/{}",
                    self.store.cursor(),
                    self.store.len()
                );
                return RunEnd::Cancelled;
            }

            match self.move_once() {
                StepResult::Exhausted => return RunEnd::Completed,
                StepResult::Continuing if self.failure_limit_reached() => {
                    warn!(
                        "Halting after {} consecutive failed goals",
                        self.stats.failure_streak
                    );
                    return RunEnd::Halted;
                }
                StepResult::Continuing => debug!("Moving auto"),
            }
        }
    }

    fn cancel_requested(&self) -> bool {
        self.cancel.is_cancelled_since(self.accepted_epoch)
    }

    fn failure_limit_reached(&self) -> bool {
        let limit = self.config.max_consecutive_failures;
        limit > 0 && self.stats.failure_streak >= limit
    }

    fn build_goal(&mut self, waypoint: &PoseStamped) -> NavGoal {
        let id = self.next_goal_id;
        self.next_goal_id = self.next_goal_id.wrapping_add(1);

        NavGoal {
            id,
            target_pose: PoseStamped {
                header: Header {
                    frame_id: self.config.goal_frame_id.clone(),
                    stamp_us: now_us(),
                },
                pose: waypoint.pose,
            },
        }
    }
}
