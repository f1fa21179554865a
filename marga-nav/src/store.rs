//! Waypoint storage.
//!
//! Holds the most recently received path and the cursor marking the next
//! waypoint to visit. `cursor == len` means the path is exhausted.

use crate::types::PoseStamped;

/// Latest path plus traversal cursor.
#[derive(Debug, Clone, Default)]
pub struct WaypointStore {
    poses: Vec<PoseStamped>,
    cursor: usize,
}

impl WaypointStore {
    /// Create an empty store (immediately exhausted).
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the path wholesale and rewind to the first waypoint.
    ///
    /// An empty path is accepted and reports as exhausted.
    pub fn set_path(&mut self, poses: Vec<PoseStamped>) {
        self.poses = poses;
        self.cursor = 0;
    }

    /// Waypoint under the cursor, or `None` once exhausted.
    pub fn current(&self) -> Option<&PoseStamped> {
        self.poses.get(self.cursor)
    }

    /// Step past the current waypoint. Saturates at the end of the path.
    pub fn advance(&mut self) {
        if self.cursor < self.poses.len() {
            self.cursor += 1;
        }
    }

    /// Move the cursor back to the first waypoint, keeping the path.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.poses.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn poses(&self) -> &[PoseStamped] {
        &self.poses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(n: usize) -> Vec<PoseStamped> {
        (0..n)
            .map(|i| PoseStamped::planar("map", i as f64, 0.0, 0.0))
            .collect()
    }

    #[test]
    fn test_new_store_is_exhausted() {
        let store = WaypointStore::new();
        assert!(store.is_exhausted());
        assert!(store.current().is_none());
        assert_eq!(store.cursor(), 0);
    }

    #[test]
    fn test_empty_path_is_exhausted() {
        let mut store = WaypointStore::new();
        store.set_path(Vec::new());
        assert!(store.is_empty());
        assert!(store.is_exhausted());
    }

    #[test]
    fn test_walk_in_order() {
        let mut store = WaypointStore::new();
        store.set_path(path(3));

        for i in 0..3 {
            assert!(!store.is_exhausted());
            assert_eq!(store.current().unwrap().pose.position.x, i as f64);
            store.advance();
        }
        assert!(store.is_exhausted());
        assert!(store.current().is_none());
    }

    #[test]
    fn test_advance_saturates() {
        let mut store = WaypointStore::new();
        store.set_path(path(1));
        store.advance();
        store.advance();
        store.advance();
        assert_eq!(store.cursor(), 1);
        assert!(store.is_exhausted());
    }

    #[test]
    fn test_set_path_resets_cursor() {
        let mut store = WaypointStore::new();
        store.set_path(path(4));
        store.advance();
        store.advance();
        assert_eq!(store.cursor(), 2);

        store.set_path(path(2));
        assert_eq!(store.cursor(), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_rewind_keeps_path() {
        let mut store = WaypointStore::new();
        store.set_path(path(2));
        store.advance();
        store.advance();
        assert!(store.is_exhausted());

        store.rewind();
        assert_eq!(store.cursor(), 0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.current().unwrap().pose.position.x, 0.0);
    }
}
