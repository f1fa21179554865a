//! TCP bridge between path/command sources, observers and the sequencer.
//!
//! ```text
//! client ──Path/Command──► BridgeReceiver ──NodeEvent──► sequencer thread
//!    ▲                          │ "cancel"
//!    │                          ▼
//!    │                      CancelToken
//!    │
//!    └──NextGoal/GoalStatus── BridgePublisher ◄── sequencer thread
//! ```
//!
//! Every accepted connection is both a source and an observer: its write
//! half is registered for broadcasts and a receiver thread handles its
//! inbound frames.

mod messages;
mod receiver;
mod registry;

pub use messages::{InboundMessage, OutboundMessage};
pub use receiver::{BridgeReceiver, CANCEL_COMMAND};
pub use registry::{BridgePublisher, ClientRegistry};

use crate::error::Result;
use crate::node::NodeEvent;
use crate::sequencer::CancelToken;
use crossbeam_channel::Sender;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Poll interval of the non-blocking accept loop
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Listening side of the bridge.
pub struct BridgeServer {
    local_addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl BridgeServer {
    /// Bind `bind_address` and start accepting clients on a background thread.
    pub fn spawn(
        bind_address: &str,
        registry: ClientRegistry,
        events: Sender<NodeEvent>,
        cancel: CancelToken,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Bridge listening on {}", local_addr);

        let handle = thread::Builder::new()
            .name("bridge".into())
            .spawn(move || accept_loop(listener, registry, events, cancel, running))?;

        Ok(Self { local_addr, handle })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn accept_loop(
    listener: TcpListener,
    registry: ClientRegistry,
    events: Sender<NodeEvent>,
    cancel: CancelToken,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Relaxed) {
        let (stream, addr) = match listener.accept() {
            Ok(conn) => conn,
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
                continue;
            }
            Err(e) => {
                tracing::error!("Error accepting client connection: {}", e);
                thread::sleep(ACCEPT_POLL_INTERVAL);
                continue;
            }
        };

        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Failed to set blocking mode for client {}: {}", addr, e);
            continue;
        }
        let write_half = match stream.try_clone() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Failed to clone stream for client {}: {}", addr, e);
                continue;
            }
        };

        tracing::info!("New client connected: {}", addr);
        registry.register(addr, write_half);

        let mut receiver = BridgeReceiver::new(events.clone(), cancel.clone(), Arc::clone(&running));
        let client_registry = registry.clone();
        let spawned = thread::Builder::new()
            .name(format!("bridge-{}", addr))
            .spawn(move || {
                if let Err(e) = receiver.run(stream) {
                    tracing::error!("Receiver for {} failed: {}", addr, e);
                }
                client_registry.unregister(addr);
            });
        if let Err(e) = spawned {
            tracing::error!("Failed to spawn receiver for {}: {}", addr, e);
            registry.unregister(addr);
        }
    }

    tracing::info!("Bridge stopped");
}
