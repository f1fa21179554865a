//! Length-prefixed JSON framing shared by the bridge and the navigation client.
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Payload (variable)       │
//! │ Big-endian u32   │ JSON (serde_json)        │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! - **Maximum frame size**: 1MB; larger frames are a protocol error
//! - **Timeouts**: a read timeout means "no frame yet"; partial frames are kept
//! - **EOF**: surfaced as an I/O error so callers can detect disconnects

use crate::error::{MargaError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{ErrorKind, Read, Write};

/// Largest accepted payload in bytes
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Serialize `msg` into a complete frame (length prefix + payload).
pub fn encode_frame<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(msg)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(MargaError::Protocol(format!(
            "Message too large: {} bytes",
            payload.len()
        )));
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Serialize `msg` and write it as one frame.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<()> {
    let frame = encode_frame(msg)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Incremental frame reader for sockets with a read timeout.
///
/// A timeout can land anywhere in a frame. Bytes already read are kept and
/// the next call picks up where the last one stopped.
#[derive(Debug, Default)]
pub struct FrameReader {
    prefix: [u8; 4],
    prefix_filled: usize,
    payload: Vec<u8>,
    payload_filled: usize,
    /// Last call returned a complete frame; start over on the next one
    complete: bool,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reader whose payload buffer starts at `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            payload: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Read until one frame is complete and return its payload.
    ///
    /// Returns `Ok(None)` when the read timed out first; partial progress is
    /// kept for the next call.
    pub fn read_frame<R: Read>(&mut self, reader: &mut R) -> Result<Option<&[u8]>> {
        if self.complete {
            self.prefix_filled = 0;
            self.payload.clear();
            self.payload_filled = 0;
            self.complete = false;
        }

        while self.prefix_filled < self.prefix.len() {
            match read_some(reader, &mut self.prefix[self.prefix_filled..])? {
                Some(n) => self.prefix_filled += n,
                None => return Ok(None),
            }
            if self.prefix_filled == self.prefix.len() {
                let len = u32::from_be_bytes(self.prefix) as usize;
                if len > MAX_FRAME_SIZE {
                    return Err(MargaError::Protocol(format!(
                        "Message too large: {} bytes",
                        len
                    )));
                }
                self.payload.resize(len, 0);
            }
        }

        while self.payload_filled < self.payload.len() {
            match read_some(reader, &mut self.payload[self.payload_filled..])? {
                Some(n) => self.payload_filled += n,
                None => return Ok(None),
            }
        }

        self.complete = true;
        Ok(Some(&self.payload))
    }
}

/// One `read` call; `None` on timeout, EOF as an error.
fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<Option<usize>> {
    loop {
        match reader.read(buf) {
            Ok(0) => {
                return Err(MargaError::Connection(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }
            Ok(n) => return Ok(Some(n)),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                return Ok(None);
            }
            Err(e) => return Err(MargaError::Connection(e)),
        }
    }
}

/// Decode a frame payload.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::VecDeque;
    use std::io::Cursor;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Ping {
        seq: u32,
        label: String,
    }

    #[test]
    fn test_frame_layout() {
        let mut out = Vec::new();
        write_frame(&mut out, &Ping { seq: 7, label: "a".into() }).unwrap();

        let expected = br#"{"seq":7,"label":"a"}"#;
        assert_eq!(&out[..4], &(expected.len() as u32).to_be_bytes());
        assert_eq!(&out[4..], expected);
    }

    /// Reader that hands out scripted chunks, with `None` as a read timeout.
    struct Trickle {
        chunks: VecDeque<Option<Vec<u8>>>,
    }

    impl Trickle {
        fn new(chunks: Vec<Option<Vec<u8>>>) -> Self {
            Self {
                chunks: chunks.into(),
            }
        }
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.chunks.pop_front() {
                None => Ok(0),
                Some(None) => Err(ErrorKind::TimedOut.into()),
                Some(Some(mut chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.chunks.push_front(Some(chunk.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    #[test]
    fn test_read_consecutive_frames() {
        let mut out = Vec::new();
        write_frame(&mut out, &Ping { seq: 1, label: "first".into() }).unwrap();
        write_frame(&mut out, &Ping { seq: 2, label: "second".into() }).unwrap();

        let mut reader = Cursor::new(out);
        let mut frames = FrameReader::new();

        let first: Ping = decode(frames.read_frame(&mut reader).unwrap().unwrap()).unwrap();
        assert_eq!(first.seq, 1);

        let second: Ping = decode(frames.read_frame(&mut reader).unwrap().unwrap()).unwrap();
        assert_eq!(second.label, "second");
    }

    #[test]
    fn test_timeouts_inside_frame_keep_progress() {
        let frame = encode_frame(&Ping { seq: 9, label: "split".into() }).unwrap();
        let mut reader = Trickle::new(vec![
            None,
            Some(frame[..2].to_vec()),
            None,
            Some(frame[2..7].to_vec()),
            None,
            Some(frame[7..].to_vec()),
        ]);
        let mut frames = FrameReader::new();

        assert!(frames.read_frame(&mut reader).unwrap().is_none());
        assert!(frames.read_frame(&mut reader).unwrap().is_none());
        assert!(frames.read_frame(&mut reader).unwrap().is_none());
        let ping: Ping = decode(frames.read_frame(&mut reader).unwrap().unwrap()).unwrap();
        assert_eq!(ping, Ping { seq: 9, label: "split".into() });
    }

    #[test]
    fn test_frame_after_split_frame() {
        let mut bytes = encode_frame(&Ping { seq: 1, label: "a".into() }).unwrap();
        bytes.extend(encode_frame(&Ping { seq: 2, label: "b".into() }).unwrap());
        let (head, tail) = bytes.split_at(3);
        let mut reader = Trickle::new(vec![Some(head.to_vec()), None, Some(tail.to_vec())]);
        let mut frames = FrameReader::new();

        assert!(frames.read_frame(&mut reader).unwrap().is_none());
        let first: Ping = decode(frames.read_frame(&mut reader).unwrap().unwrap()).unwrap();
        let second: Ping = decode(frames.read_frame(&mut reader).unwrap().unwrap()).unwrap();
        assert_eq!((first.seq, second.seq), (1, 2));
    }

    #[test]
    fn test_eof_is_connection_error() {
        let mut reader = Cursor::new(Vec::<u8>::new());
        let err = FrameReader::new().read_frame(&mut reader).unwrap_err();
        match err {
            MargaError::Connection(e) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_oversized_length_rejected() {
        let len = (MAX_FRAME_SIZE as u32 + 1).to_be_bytes();
        let mut reader = Cursor::new(len.to_vec());
        let err = FrameReader::new().read_frame(&mut reader).unwrap_err();
        assert!(matches!(err, MargaError::Protocol(_)));
    }

    #[test]
    fn test_truncated_payload() {
        let mut bytes = 10u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        let mut reader = Cursor::new(bytes);
        assert!(FrameReader::new().read_frame(&mut reader).is_err());
    }

    #[test]
    fn test_malformed_json() {
        let err = decode::<Ping>(b"{not json").unwrap_err();
        assert!(matches!(err, MargaError::Protocol(_)));
    }
}
