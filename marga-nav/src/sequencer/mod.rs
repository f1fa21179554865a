//! Waypoint sequencing.
//!
//! Walks the stored path one navigation goal at a time. A command selects
//! how far a traversal run goes:
//!
//! | Command | Run |
//! |---------|-----|
//! | `next`  | exactly one waypoint |
//! | `auto`  | every remaining waypoint, until the path is exhausted |
//! | `loop`  | full passes over the path, rewinding between passes |
//!
//! Anything else is ignored. Each goal blocks until the backend reports an
//! outcome; a [`CancelToken`] tripped from another thread stops `auto` and
//! `loop` runs before the next dispatch, and skips every queued command that
//! was accepted before it.

mod cancel;
mod mode;
mod runner;

pub use cancel::CancelToken;
pub use mode::{Mode, RunEnd, RunReport, StepResult};
pub use runner::WaypointSequencer;
