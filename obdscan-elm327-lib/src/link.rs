//! Transport links to the adapter.
//!
//! A link is a half-duplex, write-then-read byte channel with a
//! bounded read timeout. Exactly one command is outstanding at a time;
//! the engine owns its link exclusively and releases it exactly once.

use crate::error::LinkError;
use log::{debug, info};
use serialport::SerialPort;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Byte channel to the adapter.
pub trait Link {
    /// Write one complete, terminated command.
    fn send(&mut self, data: &[u8]) -> Result<(), LinkError>;

    /// Read a single byte. `None` means a timeout or zero-length read,
    /// both treated as end-of-response.
    fn read_byte(&mut self) -> Result<Option<u8>, LinkError>;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn send(&mut self, data: &[u8]) -> Result<(), LinkError> {
        (**self).send(data)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, LinkError> {
        (**self).read_byte()
    }
}

/// Map one blocking read of a single byte onto the link contract.
fn read_one(reader: &mut impl Read) -> Result<Option<u8>, LinkError> {
    let mut byte = [0u8; 1];
    match reader.read(&mut byte) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(byte[0])),
        Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => Ok(None),
        Err(e) => Err(LinkError::Read(e.to_string())),
    }
}

/// Serial link to a USB or RS-232 ELM327 adapter.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    /// Open `path` at `baud` with `timeout` applied to reads and
    /// writes.
    pub fn open(path: &str, baud: u32, timeout: Duration) -> Result<Self, LinkError> {
        info!("opening serial port {path} at {baud} baud");
        let port = serialport::new(path, baud)
            .timeout(timeout)
            .open()
            .map_err(|e| LinkError::Open(format!("{path}: {e}")))?;
        Ok(Self { port })
    }
}

impl Link for SerialLink {
    fn send(&mut self, data: &[u8]) -> Result<(), LinkError> {
        self.port
            .write_all(data)
            .map_err(|e| LinkError::Write(e.to_string()))
    }

    fn read_byte(&mut self) -> Result<Option<u8>, LinkError> {
        read_one(&mut self.port)
    }
}

/// TCP link to a WiFi ELM327 dongle.
pub struct TcpLink {
    stream: TcpStream,
}

impl TcpLink {
    /// Connect to `addr` (e.g. `192.168.0.10:35000`) with `timeout`
    /// applied to connect, reads, and writes.
    pub fn connect(addr: impl ToSocketAddrs, timeout: Duration) -> Result<Self, LinkError> {
        let addr = addr
            .to_socket_addrs()
            .map_err(|e| LinkError::Open(e.to_string()))?
            .next()
            .ok_or_else(|| LinkError::Open("address resolved to nothing".to_string()))?;
        info!("connecting to TCP dongle at {addr}");
        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| LinkError::Open(format!("{addr}: {e}")))?;
        stream
            .set_read_timeout(Some(timeout))
            .map_err(|e| LinkError::Open(e.to_string()))?;
        stream
            .set_write_timeout(Some(timeout))
            .map_err(|e| LinkError::Open(e.to_string()))?;
        Ok(Self { stream })
    }
}

impl Link for TcpLink {
    fn send(&mut self, data: &[u8]) -> Result<(), LinkError> {
        self.stream
            .write_all(data)
            .map_err(|e| LinkError::Write(e.to_string()))
    }

    fn read_byte(&mut self) -> Result<Option<u8>, LinkError> {
        read_one(&mut self.stream)
    }
}

/// In-memory link replaying scripted responses, for tests and
/// development without an adapter.
///
/// Each queued response answers one `send`; the prompt terminator is
/// appended automatically. A `send` with no queued response reads back
/// empty, which the reader treats as a timeout.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    responses: VecDeque<Vec<u8>>,
    current: VecDeque<u8>,
    sent: Vec<Vec<u8>>,
}

impl ScriptedLink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the raw reply for the next command.
    pub fn push_response(&mut self, reply: &str) {
        let mut bytes = reply.as_bytes().to_vec();
        bytes.push(b'>');
        self.responses.push_back(bytes);
    }

    /// Commands written so far, in order.
    #[must_use]
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }
}

impl Link for ScriptedLink {
    fn send(&mut self, data: &[u8]) -> Result<(), LinkError> {
        debug!("scripted link sent: {:?}", String::from_utf8_lossy(data));
        self.sent.push(data.to_vec());
        self.current = self.responses.pop_front().unwrap_or_default().into();
        Ok(())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, LinkError> {
        Ok(self.current.pop_front())
    }
}
