//! CLI configuration: serial parameters and resource locations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Serial port the adapter is on.
    #[serde(default = "default_port")]
    pub port: String,
    /// Serial baud rate.
    #[serde(default = "default_baud")]
    pub baud: u32,
    /// Read/write timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Settle delay before the first request after connecting, in
    /// milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Directory holding the lookup-table resources.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// TCP dongle address (`host:port`); takes precedence over the
    /// serial port when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp: Option<String>,
    /// Extra vehicle-specific trouble-code description files, merged
    /// over the ISO/SAE set.
    #[serde(default)]
    pub extra_trouble_codes: Vec<PathBuf>,
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

const fn default_baud() -> u32 {
    38400
}

const fn default_timeout_ms() -> u64 {
    60_000
}

const fn default_settle_ms() -> u64 {
    5_000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud: default_baud(),
            timeout_ms: default_timeout_ms(),
            settle_ms: default_settle_ms(),
            data_dir: default_data_dir(),
            tcp: None,
            extra_trouble_codes: Vec::new(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}
