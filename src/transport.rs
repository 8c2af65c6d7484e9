//! Stream transports carrying AgentX frames to the master agent.
//!
//! The session only deals in whole frames: a transport hands back exactly
//! one PDU's bytes per `recv`, recovered from the byte stream by reading
//! the 20-byte header and then `payload_length` more bytes.

use std::{
    io::{self, Read, Write},
    os::unix::net::UnixStream,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use crate::pdu::{frame_len, HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// A reliable, ordered byte stream to the master agent.
pub trait Transport: Send {
    /// Opens the connection. Calling it while open reconnects.
    fn connect(&mut self) -> io::Result<()>;

    /// Writes one complete frame.
    fn send(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Waits up to `timeout` for the next complete frame.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. A closed peer is an
    /// error, after which the transport reports `is_open() == false`. So is
    /// a frame announcing more than `MAX_PAYLOAD_SIZE` bytes of payload.
    fn recv(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>>;

    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// AgentX over a Unix domain socket (RFC 2741 §8.2.1).
#[derive(Debug)]
pub struct UnixTransport {
    path: PathBuf,
    stream: Option<UnixStream>,
    buf: Vec<u8>,
}

impl UnixTransport {
    pub fn new(path: impl AsRef<Path>) -> Self {
        UnixTransport {
            path: path.as_ref().to_path_buf(),
            stream: None,
            buf: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the next buffered frame, if one is complete.
    ///
    /// A header announcing more than [`MAX_PAYLOAD_SIZE`] bytes means the
    /// stream can no longer be framed; the transport is closed.
    fn take_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        let Some(len) = frame_len(&self.buf) else {
            return Ok(None);
        };
        if len > HEADER_SIZE + MAX_PAYLOAD_SIZE {
            self.close();
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "frame of {} bytes exceeds the {} byte limit",
                    len,
                    HEADER_SIZE + MAX_PAYLOAD_SIZE
                ),
            ));
        }
        if self.buf.len() < len {
            return Ok(None);
        }
        let rest = self.buf.split_off(len);
        Ok(Some(std::mem::replace(&mut self.buf, rest)))
    }
}

impl Transport for UnixTransport {
    fn connect(&mut self) -> io::Result<()> {
        self.close();
        let stream = UnixStream::connect(&self.path)?;
        stream.set_write_timeout(Some(Duration::from_secs(10)))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        if let Err(e) = stream.write_all(frame) {
            self.close();
            return Err(e);
        }
        Ok(())
    }

    fn recv(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>> {
        if let Some(frame) = self.take_frame()? {
            return Ok(Some(frame));
        }

        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 4096];
        let mut read_once = false;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() && read_once {
                return Ok(None);
            }
            read_once = true;
            let stream = self.stream.as_mut().ok_or_else(not_connected)?;
            // A zero read timeout is rejected by the socket API.
            stream.set_read_timeout(Some(remaining.max(Duration::from_millis(1))))?;
            let n = match stream.read(&mut chunk) {
                Ok(0) => {
                    self.close();
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "master agent closed the connection",
                    ));
                }
                Ok(n) => n,
                Err(ref e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    return Ok(None)
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.close();
                    return Err(e);
                }
            };
            self.buf.extend_from_slice(&chunk[..n]);
            if let Some(frame) = self.take_frame()? {
                return Ok(Some(frame));
            }
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        self.buf.clear();
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport is not connected")
}
