//! Registry of the PIDs the connected vehicle supports.

use crate::tables::LookupTable;
use indexmap::IndexMap;
use log::debug;

/// Marker prefixed to descriptions of PIDs the engine registers itself
/// (stored/pending/clear trouble codes) rather than discovers via a
/// support bitmap. Consumers treat marked entries as non-selectable.
pub const ENGINE_PROVIDED_MARKER: char = '!';

/// Description recorded for a supported PID with no lookup entry.
pub const NO_DESCRIPTION: &str = "[NO DESCRIPTION]";

/// The set of PIDs the connected vehicle supports, keyed by mode+PID
/// code (`010C`, `0902`, ...). Populated while connecting, read-only
/// afterwards; iteration follows registration order.
#[derive(Debug, Clone, Default)]
pub struct PidRegistry {
    pids: IndexMap<String, String>,
}

impl PidRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the vehicle supports `pid`.
    #[must_use]
    pub fn contains(&self, pid: &str) -> bool {
        self.pids.contains_key(pid)
    }

    /// Description registered for `pid`.
    #[must_use]
    pub fn description(&self, pid: &str) -> Option<&str> {
        self.pids.get(pid).map(String::as_str)
    }

    /// Registered PIDs with descriptions, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pids.iter().map(|(pid, d)| (pid.as_str(), d.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    pub(crate) fn insert(&mut self, pid: String, description: String) {
        self.pids.insert(pid, description);
    }

    /// Decode a supported-PID bitmap and register every flagged PID.
    ///
    /// `payload` is the pruned hex bitmap and `range_start` the
    /// two-digit PID number at the top of the addressed range. Bits
    /// are tested from the least-significant end while the PID counter
    /// runs down from `range_start + 4 * len(payload)`, so bit 0 maps
    /// to the highest PID of the range and the highest bit to the
    /// lowest. Verify against the adapter's bit convention before
    /// relying on this for a new vehicle family.
    pub(crate) fn resolve_supported_pids(
        &mut self,
        mode: &str,
        payload: &str,
        range_start: &str,
        descriptions: &LookupTable,
    ) {
        let Ok(start) = u32::from_str_radix(range_start, 16) else {
            debug!("bad range start {range_start:?} for mode {mode}");
            return;
        };
        let Ok(mut bits) = u128::from_str_radix(payload, 16) else {
            debug!("unparseable support bitmap for mode {mode}: {payload:?}");
            return;
        };
        let mut pid_number = start + 4 * payload.len() as u32;
        while bits > 0 {
            if bits & 1 == 1 {
                let key = format!("{pid_number:02X}");
                let description = descriptions
                    .get(&key)
                    .unwrap_or(NO_DESCRIPTION)
                    .to_string();
                self.insert(format!("{mode}{key}"), description);
            }
            bits >>= 1;
            pid_number -= 1;
        }
    }
}
