//! Connected observer registry and broadcast publisher.
//!
//! Each observer gets a writer thread fed by a bounded queue, so a broadcast
//! never blocks on a socket. An observer whose queue fills up is dropped.

use super::messages::OutboundMessage;
use crate::events::{EventSink, StatusEvent};
use crate::types::PoseStamped;
use crate::wire;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Write timeout for a single frame on an observer socket
const CLIENT_WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Frames an observer may fall behind by before it is dropped
const CLIENT_QUEUE_DEPTH: usize = 64;

type Frame = Arc<Vec<u8>>;

struct Client {
    addr: SocketAddr,
    frames: Sender<Frame>,
}

/// Outbound queues of every connected bridge client.
///
/// Clones share the same registry.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<Mutex<Vec<Client>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the write half of a client connection and start its writer.
    pub fn register(&self, addr: SocketAddr, stream: TcpStream) {
        if let Err(e) = stream.set_write_timeout(Some(CLIENT_WRITE_TIMEOUT)) {
            tracing::warn!("Failed to set write timeout for {}: {}", addr, e);
        }

        let (tx, rx) = crossbeam_channel::bounded(CLIENT_QUEUE_DEPTH);
        let spawned = thread::Builder::new()
            .name(format!("bridge-tx-{}", addr))
            .spawn(move || write_loop(addr, stream, rx));
        if let Err(e) = spawned {
            tracing::error!("Failed to spawn writer for {}: {}", addr, e);
            return;
        }

        self.clients.lock().push(Client { addr, frames: tx });
        tracing::info!("Observer registered: {}", addr);
    }

    /// Forget `addr`; its writer stops once the queue is drained.
    pub fn unregister(&self, addr: SocketAddr) {
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain(|c| c.addr != addr);
        if clients.len() != before {
            tracing::info!("Observer unregistered: {}", addr);
        }
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue `msg` for every client, dropping those that fell behind or
    /// whose connection failed.
    pub fn broadcast(&self, msg: &OutboundMessage) {
        let frame: Frame = match wire::encode_frame(msg) {
            Ok(frame) => Arc::new(frame),
            Err(e) => {
                tracing::error!("Failed to serialize {:?}: {}", msg, e);
                return;
            }
        };

        self.clients
            .lock()
            .retain(|client| match client.frames.try_send(Arc::clone(&frame)) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("Dropping observer {}: not keeping up", client.addr);
                    false
                }
                Err(TrySendError::Disconnected(_)) => {
                    tracing::info!("Dropping observer {}: connection closed", client.addr);
                    false
                }
            });
    }
}

fn write_loop(addr: SocketAddr, mut stream: TcpStream, frames: Receiver<Frame>) {
    for frame in frames.iter() {
        if let Err(e) = stream.write_all(&frame).and_then(|_| stream.flush()) {
            tracing::warn!("Write to observer {} failed: {}", addr, e);
            break;
        }
    }
    let _ = stream.shutdown(Shutdown::Both);
}

/// [`EventSink`] that broadcasts sequencer notifications to all observers.
#[derive(Clone)]
pub struct BridgePublisher {
    registry: ClientRegistry,
}

impl BridgePublisher {
    pub fn new(registry: ClientRegistry) -> Self {
        Self { registry }
    }
}

impl EventSink for BridgePublisher {
    fn next_goal(&mut self, pose: &PoseStamped) {
        let position = pose.pose.position;
        tracing::info!(
            "Next goal: ({:.2}, {:.2}) heading {:.1}°",
            position.x,
            position.y,
            pose.pose.orientation.yaw().to_degrees()
        );
        self.registry
            .broadcast(&OutboundMessage::NextGoal { pose: pose.clone() });
    }

    fn goal_status(&mut self, event: StatusEvent) {
        tracing::debug!("Goal status: {} ({})", event.tag(), event.kind());
        self.registry.broadcast(&OutboundMessage::from(event));
    }
}
