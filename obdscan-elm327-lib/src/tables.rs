//! Lookup tables mapping hex codes to descriptive text.
//!
//! Tables are loaded once from flat text resources before the engine
//! is constructed and shared by reference for the life of the process.
//! The resource format is one entry per line:
//! `"<hex-code><space><description text>"`. A missing or unreadable
//! resource degrades that table to empty and surfaces as a
//! [`TableWarning`], never as a hard failure.

use crate::error::TableWarning;
use log::warn;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One immutable hex-code → description mapping.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: HashMap<String, String>,
}

impl LookupTable {
    /// Parse resource text. Lines without a space separator are
    /// skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for line in text.lines() {
            if let Some((code, description)) = line.split_once(' ') {
                if !code.is_empty() {
                    entries.insert(code.to_string(), description.trim().to_string());
                }
            }
        }
        Self { entries }
    }

    /// Look up a code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    /// Whether the table has an entry for `code`.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge another resource's entries over this table's. Later
    /// entries win, so vehicle-specific descriptions can extend the
    /// ISO/SAE set.
    pub fn extend_from(&mut self, other: LookupTable) {
        self.entries.extend(other.entries);
    }
}

/// Every lookup table the engine consumes.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    /// PID 011C: OBD standard the vehicle conforms to.
    pub obd_standards: LookupTable,
    /// PID 0112: commanded secondary air status.
    pub secondary_air_status: LookupTable,
    /// PID 0103: fuel system status.
    pub fuel_system_status: LookupTable,
    /// Leading trouble-code digit → two-character code prefix
    /// (`0` → `P0`, `4` → `C0`, ...).
    pub trouble_code_prefix: LookupTable,
    /// Trouble code → description.
    pub trouble_code_descriptions: LookupTable,
    /// Mode 01 PID number → description.
    pub pid_descriptions_mode01: LookupTable,
    /// Mode 05 PID number → description.
    pub pid_descriptions_mode05: LookupTable,
    /// Mode 09 PID number → description.
    pub pid_descriptions_mode09: LookupTable,
}

/// Standard resource file names looked for in the data directory.
const OBD_STANDARDS_FILE: &str = "VehicleObdStandards.txt";
const SECONDARY_AIR_FILE: &str = "CommandedSecondaryAirStatus.txt";
const FUEL_SYSTEM_FILE: &str = "FuelSystemStatus.txt";
const TROUBLE_PREFIX_FILE: &str = "TroubleCodePrefix.txt";
const TROUBLE_DESCRIPTIONS_FILE: &str = "TroubleCodes-ISO-SAE.txt";
const PID_MODE01_FILE: &str = "PidDescriptionsMode01.txt";
const PID_MODE05_FILE: &str = "PidDescriptionsMode05.txt";
const PID_MODE09_FILE: &str = "PidDescriptionsMode09.txt";

impl Tables {
    /// Load every table from `dir`. Each missing or unreadable file
    /// degrades that table to empty and adds a warning.
    pub fn load(dir: &Path) -> (Self, Vec<TableWarning>) {
        let mut warnings = Vec::new();
        let mut load_one = |file: &str| -> LookupTable {
            let path = dir.join(file);
            match fs::read_to_string(&path) {
                Ok(text) => LookupTable::parse(&text),
                Err(e) => {
                    warn!("failed to read lookup table {}: {e}", path.display());
                    warnings.push(TableWarning {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    });
                    LookupTable::default()
                }
            }
        };
        let tables = Self {
            obd_standards: load_one(OBD_STANDARDS_FILE),
            secondary_air_status: load_one(SECONDARY_AIR_FILE),
            fuel_system_status: load_one(FUEL_SYSTEM_FILE),
            trouble_code_prefix: load_one(TROUBLE_PREFIX_FILE),
            trouble_code_descriptions: load_one(TROUBLE_DESCRIPTIONS_FILE),
            pid_descriptions_mode01: load_one(PID_MODE01_FILE),
            pid_descriptions_mode05: load_one(PID_MODE05_FILE),
            pid_descriptions_mode09: load_one(PID_MODE09_FILE),
        };
        (tables, warnings)
    }

    /// Merge a vehicle-specific trouble-code description resource over
    /// the ISO/SAE set. Returns a warning instead of failing if the
    /// file cannot be read.
    pub fn extend_trouble_descriptions(&mut self, path: &Path) -> Option<TableWarning> {
        match fs::read_to_string(path) {
            Ok(text) => {
                self.trouble_code_descriptions
                    .extend_from(LookupTable::parse(&text));
                None
            }
            Err(e) => {
                warn!("failed to read lookup table {}: {e}", path.display());
                Some(TableWarning {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_first_space() {
        let table = LookupTable::parse("01 Open loop\n02 Closed loop, using oxygen sensor\n");
        assert_eq!(table.get("01"), Some("Open loop"));
        assert_eq!(table.get("02"), Some("Closed loop, using oxygen sensor"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn parse_skips_lines_without_separator() {
        let table = LookupTable::parse("garbage\n03 Fine\n\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("03"), Some("Fine"));
    }

    #[test]
    fn extend_from_prefers_later_entries() {
        let mut base = LookupTable::parse("P0101 Generic description");
        base.extend_from(LookupTable::parse("P0101 Vehicle-specific description"));
        assert_eq!(base.get("P0101"), Some("Vehicle-specific description"));
    }

    #[test]
    fn missing_directory_degrades_every_table() {
        let (tables, warnings) = Tables::load(Path::new("/nonexistent/obdscan-tables"));
        assert_eq!(warnings.len(), 8);
        assert!(tables.obd_standards.is_empty());
        assert!(tables.trouble_code_prefix.is_empty());
    }
}
