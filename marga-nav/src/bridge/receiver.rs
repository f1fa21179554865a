//! Per-client inbound message receiver.
//!
//! Reads length-prefixed [`InboundMessage`] frames and forwards path updates
//! and commands, in arrival order, to the sequencer thread. The `"cancel"`
//! command is acted on here so it takes effect while a run is blocking the
//! sequencer thread.
//!
//! - **Read timeout**: 500ms so the shutdown flag is polled; partial frames carry over
//! - **Malformed payload**: logged and discarded, connection stays open
//! - **Oversized frame / EOF**: connection closed

use super::messages::InboundMessage;
use crate::error::{MargaError, Result};
use crate::node::NodeEvent;
use crate::sequencer::CancelToken;
use crate::wire::{self, FrameReader};
use crossbeam_channel::Sender;
use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Out-of-band command that stops the active run
pub const CANCEL_COMMAND: &str = "cancel";

/// Initial capacity for the read buffer (typical command size)
const INITIAL_BUFFER_CAPACITY: usize = 256;

pub struct BridgeReceiver {
    events: Sender<NodeEvent>,
    cancel: CancelToken,
    running: Arc<AtomicBool>,
    frames: FrameReader,
}

impl BridgeReceiver {
    pub fn new(events: Sender<NodeEvent>, cancel: CancelToken, running: Arc<AtomicBool>) -> Self {
        Self {
            events,
            cancel,
            running,
            frames: FrameReader::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Run the receive loop until the client disconnects or shutdown.
    pub fn run(&mut self, mut stream: TcpStream) -> Result<()> {
        if let Err(e) = stream.set_read_timeout(Some(Duration::from_millis(500))) {
            tracing::warn!("Failed to set read timeout: {}", e);
        }

        while self.running.load(Ordering::Relaxed) {
            let msg = match self.frames.read_frame(&mut stream) {
                Ok(Some(payload)) => wire::decode::<InboundMessage>(payload),
                Ok(None) => continue,
                Err(MargaError::Connection(e))
                    if e.kind() == ErrorKind::UnexpectedEof
                        || e.kind() == ErrorKind::ConnectionReset =>
                {
                    tracing::info!("Client disconnected");
                    return Ok(());
                }
                Err(e) => {
                    let _ = stream.shutdown(std::net::Shutdown::Both);
                    return Err(e);
                }
            };
            self.dispatch(msg)?;
        }

        let _ = stream.shutdown(std::net::Shutdown::Both);
        Ok(())
    }

    fn dispatch(&mut self, msg: Result<InboundMessage>) -> Result<()> {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("Discarding malformed message: {}", e);
                return Ok(());
            }
        };

        let event = match msg {
            InboundMessage::Path { poses } => NodeEvent::SetPath(poses),
            InboundMessage::Command { data } if data.trim() == CANCEL_COMMAND => {
                tracing::info!("Cancel requested");
                self.cancel.cancel();
                return Ok(());
            }
            InboundMessage::Command { data } => NodeEvent::command(data, &self.cancel),
        };

        self.events
            .send(event)
            .map_err(|_| MargaError::Protocol("Sequencer thread not running".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PoseStamped;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn test_forwards_in_order_and_intercepts_cancel() {
        let (mut client, server) = connected_pair();
        let (tx, rx) = crossbeam_channel::unbounded();
        let cancel = CancelToken::new();
        let running = Arc::new(AtomicBool::new(true));

        let mut receiver = BridgeReceiver::new(tx, cancel.clone(), running);
        let handle = thread::spawn(move || receiver.run(server));

        let poses = vec![PoseStamped::planar("map", 1.0, 2.0, 0.0)];
        wire::write_frame(&mut client, &InboundMessage::Path { poses: poses.clone() }).unwrap();
        wire::write_frame(&mut client, &InboundMessage::Command { data: "next".into() }).unwrap();
        // Malformed payload is skipped
        client.write_all(&5u32.to_be_bytes()).unwrap();
        client.write_all(b"nope!").unwrap();
        wire::write_frame(&mut client, &InboundMessage::Command { data: "cancel".into() }).unwrap();
        wire::write_frame(&mut client, &InboundMessage::Command { data: "auto".into() }).unwrap();
        drop(client);

        assert!(handle.join().unwrap().is_ok());

        let events: Vec<NodeEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                NodeEvent::SetPath(poses),
                NodeEvent::Command {
                    data: "next".into(),
                    accepted_epoch: 0,
                },
                // Accepted after the cancel, so not affected by it
                NodeEvent::Command {
                    data: "auto".into(),
                    accepted_epoch: 1,
                },
            ]
        );
        assert_eq!(cancel.epoch(), 1);
    }

    #[test]
    fn test_frame_split_across_read_timeout() {
        let (mut client, server) = connected_pair();
        let (tx, rx) = crossbeam_channel::unbounded();
        let running = Arc::new(AtomicBool::new(true));

        let mut receiver = BridgeReceiver::new(tx, CancelToken::new(), running);
        let handle = thread::spawn(move || receiver.run(server));

        let frame = wire::encode_frame(&InboundMessage::Command { data: "auto".into() }).unwrap();
        client.write_all(&frame[..2]).unwrap();
        // Longer than the receiver's read timeout
        thread::sleep(Duration::from_millis(700));
        client.write_all(&frame[2..]).unwrap();
        drop(client);

        assert!(handle.join().unwrap().is_ok());
        let events: Vec<NodeEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![NodeEvent::Command {
                data: "auto".into(),
                accepted_epoch: 0,
            }]
        );
    }

    #[test]
    fn test_oversized_frame_closes_connection() {
        let (mut client, server) = connected_pair();
        let (tx, _rx) = crossbeam_channel::unbounded();
        let running = Arc::new(AtomicBool::new(true));

        let mut receiver = BridgeReceiver::new(tx, CancelToken::new(), running);
        let handle = thread::spawn(move || receiver.run(server));

        client
            .write_all(&(wire::MAX_FRAME_SIZE as u32 + 1).to_be_bytes())
            .unwrap();

        assert!(matches!(handle.join().unwrap(), Err(MargaError::Protocol(_))));
    }
}
