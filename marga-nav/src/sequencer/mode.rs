//! Traversal modes and run results.

use std::fmt;

/// How far a traversal run goes. Chosen per command, never carried over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Unrecognized command: nothing happens
    Idle,
    /// Visit exactly one waypoint
    StepOnce,
    /// Visit waypoints until the path is exhausted
    AutoRun,
    /// Run the whole path this many times, rewinding after each pass
    LoopRun(u32),
}

impl Mode {
    /// Interpret a command string.
    pub fn from_command(command: &str, loop_passes: u32) -> Self {
        match command.trim() {
            "next" => Mode::StepOnce,
            "auto" => Mode::AutoRun,
            "loop" => Mode::LoopRun(loop_passes),
            _ => Mode::Idle,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Idle => write!(f, "idle"),
            Mode::StepOnce => write!(f, "step"),
            Mode::AutoRun => write!(f, "auto"),
            Mode::LoopRun(passes) => write!(f, "loop x{}", passes),
        }
    }
}

/// Result of a single move: is there anything left to visit?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Continuing,
    Exhausted,
}

/// Why a traversal run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// Command was not recognized
    Ignored,
    /// Single step taken, waypoints remain
    Continuing,
    /// Path exhausted (every pass, for loop runs)
    Completed,
    /// Stopped by the cancel token before the next dispatch
    Cancelled,
    /// Too many consecutive rejected/aborted goals
    Halted,
}

/// Summary of one traversal run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub mode: Mode,
    pub end: RunEnd,
    /// Goals handed to the backend during this run
    pub dispatched: usize,
    /// Goals the backend reported as succeeded
    pub succeeded: usize,
    /// Times the path was walked to exhaustion
    pub passes_completed: u32,
}
