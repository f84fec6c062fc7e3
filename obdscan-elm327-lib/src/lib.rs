//! ELM327 OBD-II protocol engine.
//!
//! Talks to an ELM327-compatible diagnostic adapter over a serial or
//! TCP link, frames its prompt-terminated replies, discovers which
//! PIDs the connected vehicle supports, and decodes raw hex payloads
//! into typed values.
//!
//! The usual flow:
//!
//! 1. load the [`Tables`] once,
//! 2. open a [`SerialLink`] (or [`TcpLink`] for a WiFi dongle),
//! 3. build an [`Elm327`] — AT configuration runs immediately and any
//!    mismatches land in [`Elm327::init_failures`],
//! 4. [`Elm327::connect`] to populate the supported-PID registry,
//! 5. call [`Elm327::decode_pid`] per PID and match on the returned
//!    [`Value`].
//!
//! Everything is synchronous: one command is outstanding on the link
//! at any time, and reads block up to the link's configured timeout.

mod decode;
mod dtc;
mod engine;
mod error;
mod link;
mod registry;
mod response;
mod tables;
mod value;

pub use engine::{Elm327, DEFAULT_SETTLE_DELAY};
pub use error::{ConnectError, DecodeError, InitFailure, LinkError, TableWarning};
pub use link::{Link, ScriptedLink, SerialLink, TcpLink};
pub use registry::{PidRegistry, ENGINE_PROVIDED_MARKER, NO_DESCRIPTION};
pub use response::{normalize, prune_echo, NO_DATA_LITERAL, NO_DATA_PLACEHOLDER, PROMPT};
pub use tables::{LookupTable, Tables};
pub use value::{TroubleCode, Value};
