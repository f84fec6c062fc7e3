//! Error taxonomy for the protocol engine.
//!
//! Link failures are fatal to the request in progress, never to the
//! engine. Everything that can go wrong while decoding a PID is
//! contained at the dispatch boundary and converted to a sentinel
//! [`Value`](crate::value::Value); nothing in this module crosses it.

use derive_more::Display;

/// Failure on the transport link.
#[derive(Debug, Clone, Display)]
pub enum LinkError {
    /// Opening or configuring the port failed.
    #[display("failed to open link: {_0}")]
    Open(String),
    /// Writing a command failed.
    #[display("link write failed: {_0}")]
    Write(String),
    /// Reading a response failed (timeouts are not errors; they end the
    /// response).
    #[display("link read failed: {_0}")]
    Read(String),
    /// The link has already been released.
    #[display("link is closed")]
    Closed,
}

impl std::error::Error for LinkError {}

/// Failure to connect to the vehicle bus. The link is released before
/// this is returned.
#[derive(Debug, Clone, Display)]
pub enum ConnectError {
    /// The adapter reported it cannot reach the vehicle bus.
    #[display("adapter unable to connect to the vehicle bus")]
    Refused,
    /// The link failed during the probe request.
    #[display("{_0}")]
    Link(LinkError),
}

impl std::error::Error for ConnectError {}

impl From<LinkError> for ConnectError {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

/// Failure inside a PID decoder. Contained by
/// [`Elm327::decode_pid`](crate::Elm327::decode_pid), which reports it
/// and returns [`Value::Error`](crate::value::Value::Error).
#[derive(Debug, Clone, Display)]
pub enum DecodeError {
    /// The pruned payload is shorter than the formula needs.
    #[display("response too short: wanted {wanted} hex digits, got {got}")]
    ShortPayload { wanted: usize, got: usize },
    /// The payload contained something other than hex digits.
    #[display("bad hex in response: {_0}")]
    BadHex(String),
    /// The payload did not decode to valid text.
    #[display("payload is not valid text: {_0}")]
    BadText(String),
    /// A trouble-code group's leading digit has no prefix-table entry.
    #[display("no trouble-code prefix for digit {_0:?}")]
    UnknownPrefix(char),
    /// The link failed mid-request.
    #[display("{_0}")]
    Link(LinkError),
}

impl std::error::Error for DecodeError {}

impl From<LinkError> for DecodeError {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

/// A non-fatal failure recorded while bringing up the adapter.
/// Initialization proceeds past these; the engine stays usable in a
/// degraded state.
#[derive(Debug, Clone, Display)]
pub enum InitFailure {
    /// An AT command's reply did not match the expected literal.
    #[display("FAILED: {command} ({purpose})")]
    AtMismatch {
        /// The command that was sent.
        command: &'static str,
        /// What the command was meant to configure.
        purpose: &'static str,
    },
    /// The link could not be driven during initialization.
    #[display("FAILED TO INITIALIZE ELM327 DEVICE: {_0}")]
    Link(LinkError),
}

impl From<LinkError> for InitFailure {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

/// A lookup-table resource that could not be read. The table degrades
/// to empty; loading never fails outright.
#[derive(Debug, Clone, Display)]
#[display("FAILED TO READ FILE: {path}: {reason}")]
pub struct TableWarning {
    /// Path of the resource file.
    pub path: String,
    /// Why it could not be read.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_failure_display_matches_diagnostic_format() {
        let failure = InitFailure::AtMismatch {
            command: "AT E0",
            purpose: "Set Echo Off",
        };
        assert_eq!(failure.to_string(), "FAILED: AT E0 (Set Echo Off)");
    }

    #[test]
    fn decode_error_wraps_link_error() {
        let e = DecodeError::from(LinkError::Closed);
        assert!(matches!(e, DecodeError::Link(LinkError::Closed)));
        assert_eq!(e.to_string(), "link is closed");
    }
}
