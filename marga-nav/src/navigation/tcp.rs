//! TCP client for a goal-based navigation server.
//!
//! Sends one `NavRequest::Goal` frame per waypoint and blocks on the socket
//! until the matching `NavReply::Result` arrives. Any transport failure
//! drops the connection, is reported as [`GoalOutcome::Aborted`], and the
//! next goal reconnects.

use super::{GoalOutcome, NavGoal, NavReply, NavRequest, NavigationClient};
use crate::error::{MargaError, Result};
use crate::wire::{self, FrameReader};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// Initial capacity for the reply buffer (typical reply size)
const INITIAL_BUFFER_CAPACITY: usize = 256;

pub struct TcpNavigationClient {
    addr: SocketAddr,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
    frames: FrameReader,
}

impl TcpNavigationClient {
    /// Create a client for `addr`. The connection is opened lazily.
    pub fn new(addr: &str, connect_timeout: Duration) -> Result<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| MargaError::Config(format!("Invalid backend address: {}", e)))?;

        Ok(Self {
            addr,
            connect_timeout,
            stream: None,
            frames: FrameReader::with_capacity(INITIAL_BUFFER_CAPACITY),
        })
    }

    /// Open the connection now instead of on the first goal.
    pub fn connect(&mut self) -> Result<()> {
        let stream = TcpStream::connect_timeout(&self.addr, self.connect_timeout)?;
        stream.set_nodelay(true)?;
        // Goals block until the backend answers
        stream.set_read_timeout(None)?;
        tracing::info!("Connected to navigation backend at {}", self.addr);
        self.stream = Some(stream);
        // Nothing read on an old connection carries over
        self.frames = FrameReader::with_capacity(INITIAL_BUFFER_CAPACITY);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn exchange(&mut self, goal: &NavGoal) -> Result<GoalOutcome> {
        if self.stream.is_none() {
            self.connect()?;
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(MargaError::Protocol("Not connected".into()));
        };

        wire::write_frame(stream, &NavRequest::Goal(goal.clone()))?;

        loop {
            let Some(payload) = self.frames.read_frame(stream)? else {
                continue;
            };
            match wire::decode::<NavReply>(payload)? {
                NavReply::Result { id, outcome } if id == goal.id => return Ok(outcome),
                NavReply::Result { id, outcome } => {
                    tracing::debug!("Discarding result {:?} for stale goal {}", outcome, id);
                }
                NavReply::Feedback { id, state } => {
                    tracing::debug!("Goal {} feedback: {:?}", id, state);
                }
            }
        }
    }
}

impl NavigationClient for TcpNavigationClient {
    fn submit_goal(&mut self, goal: &NavGoal) -> GoalOutcome {
        match self.exchange(goal) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Navigation backend error on goal {}: {}", goal.id, e);
                if let Some(stream) = self.stream.take() {
                    let _ = stream.shutdown(std::net::Shutdown::Both);
                }
                GoalOutcome::Aborted
            }
        }
    }
}
