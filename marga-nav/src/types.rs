//! Geometry payloads exchanged with path sources and the navigation backend.
//!
//! The sequencer treats these as opaque: it forwards waypoints, copies
//! position and orientation into goals, and reads heading for log lines.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Position in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Orientation as a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Rotation of `yaw` radians about the z axis.
    pub fn from_yaw(yaw: f64) -> Self {
        let half = yaw * 0.5;
        Self {
            x: 0.0,
            y: 0.0,
            z: half.sin(),
            w: half.cos(),
        }
    }

    /// Heading about the z axis in radians, range [-π, π].
    pub fn yaw(&self) -> f64 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        siny_cosp.atan2(cosy_cosp)
    }
}

/// Position + orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

/// Reference frame and acquisition time of a stamped value.
///
/// Both fields may be omitted on input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Header {
    /// Coordinate frame the pose is expressed in
    pub frame_id: String,
    /// Timestamp in microseconds since epoch
    pub stamp_us: u64,
}

/// A waypoint as received from the path source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseStamped {
    #[serde(default)]
    pub header: Header,
    pub pose: Pose,
}

impl PoseStamped {
    /// Planar waypoint at (x, y) facing `yaw`.
    pub fn planar(frame_id: &str, x: f64, y: f64, yaw: f64) -> Self {
        Self {
            header: Header {
                frame_id: frame_id.to_string(),
                stamp_us: 0,
            },
            pose: Pose {
                position: Point::new(x, y, 0.0),
                orientation: Quaternion::from_yaw(yaw),
            },
        }
    }
}

/// Current wall-clock time in microseconds since epoch.
pub fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
