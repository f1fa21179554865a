//! MargaNav - Waypoint sequencer for goal-based navigation backends
//!
//! Receives a path (ordered list of stamped poses), then walks it one
//! navigation goal at a time on command:
//!
//! - `next`: visit the next waypoint only
//! - `auto`: visit every remaining waypoint
//! - `loop`: traverse the whole path several times
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  bridge/  (TCP: Path/Command in, status out) │  ← Transport
//! └──────────────────────────────────────────────┘
//!            │ NodeEvent            ▲ EventSink
//!            ▼                      │
//! ┌──────────────────────────────────────────────┐
//! │  node     (single control thread)            │
//! │  sequencer/ (modes, move_once, dispatch)     │  ← Orchestration
//! │  store    (path + cursor)                    │
//! └──────────────────────────────────────────────┘
//!            │ NavGoal              ▲ GoalOutcome
//!            ▼                      │
//! ┌──────────────────────────────────────────────┐
//! │  navigation/ (TCP goal server, mock)         │  ← Backend seam
//! └──────────────────────────────────────────────┘
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod events;
pub mod navigation;
pub mod node;
pub mod sequencer;
pub mod store;
pub mod types;
pub mod wire;

pub use config::{BackendKind, MargaConfig};
pub use error::{MargaError, Result};
pub use events::{EventSink, Notification, RecordingSink, StatusEvent};
pub use navigation::{
    GoalOutcome, MockNavigationClient, NavGoal, NavigationClient, TcpNavigationClient,
};
pub use node::{NodeEvent, SequencerNode};
pub use sequencer::{CancelToken, Mode, RunEnd, RunReport, StepResult, WaypointSequencer};
pub use store::WaypointStore;
pub use types::{Header, Point, Pose, PoseStamped, Quaternion};
