//! The protocol engine: adapter bring-up, vehicle connection, and the
//! PID dispatch boundary.

use crate::decode::DispatchTable;
use crate::error::{ConnectError, InitFailure, LinkError};
use crate::link::Link;
use crate::registry::PidRegistry;
use crate::response::{normalize, prune_echo, read_response, ECHO_MULTILINE, ECHO_STANDARD};
use crate::tables::Tables;
use crate::value::Value;
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use smallvec::SmallVec;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Delay before the first request, letting the adapter reach an idle
/// state after power-up.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Adapter reply substring meaning the vehicle bus is unreachable.
const UNABLE_TO_CONNECT: &str = "UNABLE TO CONNECT";

/// Command buffer sized for the longest request plus terminator.
type CmdBuffer = SmallVec<u8, 16>;

/// Mode 01 supported-PID ranges past the first, each gated on the
/// previous range's continuation PID: (request/gate PID, range start).
const MODE01_RANGES: [(&str, &str); 6] = [
    ("0120", "20"),
    ("0140", "40"),
    ("0160", "60"),
    ("0180", "80"),
    ("01A0", "A0"),
    ("01C0", "C0"),
];

/// Engine for one ELM327 adapter session.
///
/// Owns its [`Link`] exclusively for the whole session and releases it
/// exactly once, either via [`close`](Self::close) or when a connect
/// attempt fails. Fully synchronous: one command is outstanding at a
/// time.
pub struct Elm327<L: Link> {
    link: Option<L>,
    tables: Arc<Tables>,
    registry: PidRegistry,
    dispatch: DispatchTable<L>,
    init_failures: Vec<InitFailure>,
    settle_delay: Duration,
    connected: bool,
}

impl<L: Link> Elm327<L> {
    /// Bring up the adapter on `link`: reset, echo off, spaces off,
    /// protocol select, CAN speed. Command mismatches are recorded in
    /// [`init_failures`](Self::init_failures) and do not abort
    /// construction; the engine remains usable in a degraded state.
    pub fn new(link: L, tables: Arc<Tables>) -> Self {
        let mut engine = Self {
            link: Some(link),
            tables,
            registry: PidRegistry::new(),
            dispatch: DispatchTable::new(),
            init_failures: Vec::new(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            connected: false,
        };
        engine.initialize();
        engine
    }

    fn initialize(&mut self) {
        // Reset first; the version banner reply is discarded.
        if let Err(e) = self.raw_command("AT Z") {
            warn!("adapter reset failed: {e}");
            self.init_failures.push(InitFailure::from(e));
            return;
        }
        // Echo is still on for the AT E0 reply itself.
        self.expect_at("AT E0", "AT E0\nOK\n", "Set Echo Off");
        self.expect_at("AT S0", "OK\n", "Set Space Characters Off");
        self.expect_at("AT SP A3", "OK\n", "Set Protocol ISO 9141-2 / Auto");
        self.expect_at("AT IB 10", "OK\n", "Set High Speed CAN BUS");
        if self.init_failures.is_empty() {
            info!("adapter initialized");
        }
    }

    fn expect_at(&mut self, command: &'static str, expected: &str, purpose: &'static str) {
        match self.raw_command(command) {
            Ok(reply) if normalize(&reply) == expected => {}
            Ok(reply) => {
                warn!("{command} replied {reply:?}, expected {expected:?}");
                self.init_failures
                    .push(InitFailure::AtMismatch { command, purpose });
            }
            Err(e) => {
                warn!("{command} failed: {e}");
                self.init_failures.push(InitFailure::from(e));
            }
        }
    }

    /// Failures recorded while bringing up the adapter.
    #[must_use]
    pub fn init_failures(&self) -> &[InitFailure] {
        &self.init_failures
    }

    /// Override the pre-connect settle delay (mainly for tests and
    /// TCP dongles that are already idle).
    pub fn set_settle_delay(&mut self, delay: Duration) {
        self.settle_delay = delay;
    }

    /// Whether a simple probe (`AT @1`) gets any reply at all.
    pub fn is_present(&mut self) -> bool {
        matches!(self.raw_command("AT @1"), Ok(reply) if !reply.is_empty())
    }

    /// Connect to the vehicle bus and discover the supported PIDs.
    ///
    /// Waits the settle delay, probes with `0100`, and on
    /// `UNABLE TO CONNECT` (or a dead link) releases the link and
    /// fails. On success the registry holds every discovered PID plus
    /// the engine-provided trouble-code entries and is frozen.
    pub fn connect(&mut self) -> Result<(), ConnectError> {
        thread::sleep(self.settle_delay);
        let probe = match self.raw_command("0100") {
            Ok(reply) => reply,
            Err(e) => {
                self.release_link();
                return Err(ConnectError::from(e));
            }
        };
        if probe.contains(UNABLE_TO_CONNECT) {
            self.release_link();
            return Err(ConnectError::Refused);
        }

        // Engine-provided PIDs, marked non-selectable.
        self.registry.insert(
            "03".to_string(),
            "! Show stored Diagnostic Trouble Codes".to_string(),
        );
        self.registry.insert(
            "04".to_string(),
            "! Clear Diagnostic Trouble Codes and stored values".to_string(),
        );
        self.registry.insert(
            "07".to_string(),
            "! Show pending Diagnostic Trouble Codes (detected during current or last driving cycle)"
                .to_string(),
        );

        self.resolve_range("01", "0100", "00", ECHO_STANDARD);
        for (gate, range_start) in MODE01_RANGES {
            if self.registry.contains(gate) {
                self.resolve_range("01", gate, range_start, ECHO_STANDARD);
            }
        }
        self.resolve_range("05", "050100", "00", ECHO_MULTILINE);
        self.resolve_range("09", "0900", "00", ECHO_MULTILINE);

        self.connected = true;
        info!("connected; {} PIDs supported", self.registry.len());
        Ok(())
    }

    /// Issue one supported-PID bitmap request and fold the result into
    /// the registry. Failures leave the registry as it was; the
    /// connection stays usable.
    fn resolve_range(&mut self, mode: &str, request: &str, range_start: &str, echo_bytes: usize) {
        let raw = match self.raw_command(request) {
            Ok(reply) => reply,
            Err(e) => {
                debug!("support bitmap request {request} failed: {e}");
                return;
            }
        };
        let payload = prune_echo(&normalize(&raw), echo_bytes);
        let tables = Arc::clone(&self.tables);
        let descriptions = match mode {
            "01" => &tables.pid_descriptions_mode01,
            "05" => &tables.pid_descriptions_mode05,
            _ => &tables.pid_descriptions_mode09,
        };
        self.registry
            .resolve_supported_pids(mode, &payload, range_start, descriptions);
    }

    /// The PIDs the connected vehicle supports.
    #[must_use]
    pub fn supported_pids(&self) -> &PidRegistry {
        &self.registry
    }

    /// Whether [`connect`](Self::connect) has succeeded.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Decode one PID.
    ///
    /// Codes with no registered decoder yield
    /// [`Value::NotImplemented`]. Any failure inside a decoder is
    /// reported here and contained as [`Value::Error`]; nothing
    /// propagates past this boundary.
    pub fn decode_pid(&mut self, pid: &str) -> Value {
        let Some(decoder) = self.dispatch.get(pid) else {
            return Value::NotImplemented;
        };
        match decoder(self) {
            Ok(value) => value,
            Err(e) => {
                error!("PID {pid} decode failed: {e}");
                Value::Error
            }
        }
    }

    /// Query the adapter's information report (`AT I`, `AT @1`, ...)
    /// as an ordered label → text record.
    pub fn adapter_info(&mut self) -> Result<IndexMap<String, String>, LinkError> {
        const QUERIES: [(&str, &str); 9] = [
            ("AT I", "ELM Device Version"),
            ("AT @1", "ELM Device Description"),
            ("AT @2", "ELM Device User Data"),
            ("AT DP", "Using CAN BUS Protocol"),
            ("AT RV", "Volt At OBDII Connector"),
            ("AT CS", "CAN Status"),
            ("AT KW", "Key Words"),
            ("AT BD", "ELM327 Buffer Dump"),
            ("AT PPS", "ELM327 Programmable Parameters"),
        ];
        let mut info = IndexMap::new();
        for (command, label) in QUERIES {
            let reply = self.raw_command(command)?;
            info.insert(label.to_string(), normalize(&reply).trim().to_string());
        }
        Ok(info)
    }

    /// Release the transport link. Safe to call more than once.
    pub fn close(&mut self) {
        self.release_link();
    }

    fn release_link(&mut self) {
        if self.link.take().is_some() {
            info!("transport link released");
        }
        self.connected = false;
    }

    /// Send `command` (terminator appended) and return the raw framed
    /// reply.
    pub(crate) fn raw_command(&mut self, command: &str) -> Result<String, LinkError> {
        let link = self.link.as_mut().ok_or(LinkError::Closed)?;
        let mut bytes = CmdBuffer::new();
        bytes.extend_from_slice(command.as_bytes());
        bytes.push(b'\r');
        read_response(link, &bytes)
    }

    /// Issue `request`, normalize the reply, and prune `echo_bytes`
    /// confirmation bytes from each line.
    pub(crate) fn query(
        &mut self,
        request: &str,
        echo_bytes: usize,
    ) -> Result<String, LinkError> {
        let raw = self.raw_command(request)?;
        Ok(prune_echo(&normalize(&raw), echo_bytes))
    }

    pub(crate) fn tables(&self) -> Arc<Tables> {
        Arc::clone(&self.tables)
    }

    /// PID codes with a registered decoder, in table order.
    #[must_use]
    pub fn implemented_pids(&self) -> Vec<&'static str> {
        self.dispatch.pids().collect()
    }
}

#[cfg(test)]
impl Elm327<crate::link::ScriptedLink> {
    pub(crate) fn test_register(&mut self, pid: &str) {
        self.registry
            .insert(pid.to_string(), crate::registry::NO_DESCRIPTION.to_string());
    }

    pub(crate) fn test_push_response(&mut self, reply: &str) {
        self.link.as_mut().expect("link open").push_response(reply);
    }

    pub(crate) fn test_sent_count(&self) -> usize {
        self.link.as_ref().map_or(0, |link| link.sent().len())
    }
}
