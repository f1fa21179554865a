//! Sequencer control thread.
//!
//! All path updates and commands are applied from this one thread, in the
//! order they arrived. A command that starts an `auto` or `loop` run blocks
//! the thread until the run ends; events arriving meanwhile wait in the
//! channel and are applied afterwards. Commands carry the cancel epoch they
//! were accepted at, so a cancel also skips commands still in the queue.

use crate::error::Result;
use crate::events::EventSink;
use crate::navigation::NavigationClient;
use crate::sequencer::{CancelToken, WaypointSequencer};
use crate::types::PoseStamped;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often the idle loop re-checks the shutdown flag
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Input applied to the sequencer.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    SetPath(Vec<PoseStamped>),
    Command { data: String, accepted_epoch: u64 },
}

impl NodeEvent {
    /// Command accepted now, as seen by `cancel`.
    pub fn command(data: impl Into<String>, cancel: &CancelToken) -> Self {
        NodeEvent::Command {
            data: data.into(),
            accepted_epoch: cancel.epoch(),
        }
    }
}

pub struct SequencerNode<N, S> {
    sequencer: WaypointSequencer<N, S>,
    events: Receiver<NodeEvent>,
    running: Arc<AtomicBool>,
}

impl<N, S> SequencerNode<N, S>
where
    N: NavigationClient + 'static,
    S: EventSink + 'static,
{
    pub fn new(
        sequencer: WaypointSequencer<N, S>,
        events: Receiver<NodeEvent>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            sequencer,
            events,
            running,
        }
    }

    /// Drain events until shutdown or until every sender is dropped.
    pub fn run(&mut self) {
        tracing::info!("Sequencer thread starting");

        while self.running.load(Ordering::Relaxed) {
            match self.events.recv_timeout(SHUTDOWN_POLL_INTERVAL) {
                Ok(event) => self.apply(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("Event channel closed");
                    break;
                }
            }
        }

        tracing::info!("Sequencer thread stopped");
    }

    pub fn apply(&mut self, event: NodeEvent) {
        match event {
            NodeEvent::SetPath(poses) => self.sequencer.set_path(poses),
            NodeEvent::Command {
                data,
                accepted_epoch,
            } => {
                tracing::info!("Received command: {:?}", data);
                self.sequencer.handle_queued_command(&data, accepted_epoch);
            }
        }
    }

    pub fn sequencer(&self) -> &WaypointSequencer<N, S> {
        &self.sequencer
    }

    /// Move the node onto a named thread.
    pub fn spawn(mut self) -> Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("sequencer".into())
            .spawn(move || self.run())?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SequencerConfig;
    use crate::events::RecordingSink;
    use crate::navigation::MockNavigationClient;

    fn node_with(
        client: MockNavigationClient,
        events: Receiver<NodeEvent>,
    ) -> SequencerNode<MockNavigationClient, RecordingSink> {
        let sequencer =
            WaypointSequencer::new(client, RecordingSink::new(), SequencerConfig::default());
        SequencerNode::new(sequencer, events, Arc::new(AtomicBool::new(true)))
    }

    fn node(events: Receiver<NodeEvent>) -> SequencerNode<MockNavigationClient, RecordingSink> {
        node_with(MockNavigationClient::new(), events)
    }

    fn line(n: usize) -> Vec<PoseStamped> {
        (0..n)
            .map(|i| PoseStamped::planar("map", i as f64, 0.0, 0.0))
            .collect()
    }

    #[test]
    fn test_events_applied_in_order_until_disconnect() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut node = node(rx);
        let cancel = node.sequencer().cancel_token();

        let first = vec![PoseStamped::planar("map", 1.0, 0.0, 0.0)];
        let second = vec![
            PoseStamped::planar("map", 5.0, 0.0, 0.0),
            PoseStamped::planar("map", 6.0, 0.0, 0.0),
        ];
        tx.send(NodeEvent::SetPath(first)).unwrap();
        tx.send(NodeEvent::command("auto", &cancel)).unwrap();
        // Queued path replaces the old one only after the run
        tx.send(NodeEvent::SetPath(second)).unwrap();
        tx.send(NodeEvent::command("next", &cancel)).unwrap();
        drop(tx);

        node.run();

        let xs: Vec<f64> = node
            .sequencer()
            .client()
            .goals()
            .iter()
            .map(|g| g.target_pose.pose.position.x)
            .collect();
        assert_eq!(xs, vec![1.0, 5.0]);
        assert_eq!(node.sequencer().store().cursor(), 1);
    }

    #[test]
    fn test_cancel_reaches_queued_commands() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let client = MockNavigationClient::new().with_goal_duration(Duration::from_millis(200));
        let mut node = node_with(client, rx);
        let cancel = node.sequencer().cancel_token();

        tx.send(NodeEvent::SetPath(line(10))).unwrap();
        tx.send(NodeEvent::command("next", &cancel)).unwrap();
        tx.send(NodeEvent::command("auto", &cancel)).unwrap();
        drop(tx);

        // Cancel while the first goal is in flight and "auto" is still queued
        let remote = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });
        node.run();
        canceller.join().unwrap();

        assert_eq!(node.sequencer().client().goals().len(), 1);
        assert_eq!(node.sequencer().store().cursor(), 1);
    }

    #[test]
    fn test_commands_after_cancel_still_run() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut node = node(rx);
        let cancel = node.sequencer().cancel_token();

        tx.send(NodeEvent::SetPath(line(3))).unwrap();
        tx.send(NodeEvent::command("auto", &cancel)).unwrap();
        cancel.cancel();
        tx.send(NodeEvent::command("next", &cancel)).unwrap();
        drop(tx);

        node.run();

        // "auto" was cancelled before it started; "next" came later
        assert_eq!(node.sequencer().client().goals().len(), 1);
    }

    #[test]
    fn test_stops_on_shutdown_flag() {
        let (_tx, rx) = crossbeam_channel::unbounded();
        let mut node = node(rx);
        node.running.store(false, Ordering::Relaxed);
        node.run();
        assert!(node.sequencer().client().goals().is_empty());
    }
}
