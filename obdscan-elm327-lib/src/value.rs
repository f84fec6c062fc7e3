//! Typed results of PID decoding.

use indexmap::IndexMap;
use std::fmt;

/// A diagnostic trouble code with its optional description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TroubleCode {
    /// Five-character code, e.g. `P0301`.
    pub code: String,
    /// Description from the lookup tables, if one exists.
    pub description: Option<String>,
}

impl fmt::Display for TroubleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} {description}", self.code),
            None => write!(f, "{} [NO DESCRIPTION]", self.code),
        }
    }
}

/// The result of decoding one PID.
///
/// Callers match on the variant; the sentinel variants are distinct
/// from every legitimate decode result, so an unsupported PID can
/// never be mistaken for a zero reading.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Exact integer quantity (temperatures, speeds, counts, ...).
    Integer(i64),
    /// Fractional physical quantity (loads, trims, RPM, ...).
    Float(f64),
    /// Categorical or free-form text (lookup results, VIN, ...).
    Text(String),
    /// Ordered label-to-value record for bitfield and multi-channel
    /// PIDs.
    Record(IndexMap<String, Value>),
    /// Decoded diagnostic trouble codes.
    TroubleCodes(Vec<TroubleCode>),
    /// No decoder is registered for the PID.
    NotImplemented,
    /// The vehicle does not support the PID.
    NoData,
    /// The decoder failed; details were reported at the dispatch
    /// boundary.
    Error,
    /// A categorical code had no lookup-table entry.
    Invalid,
    /// The PID is supported but has no description entry.
    NoDescription,
}

impl Value {
    /// True for the sentinel variants, false for decoded data.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        matches!(
            self,
            Self::NotImplemented | Self::NoData | Self::Error | Self::Invalid | Self::NoDescription
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Record(fields) => {
                let mut first = true;
                for (label, value) in fields {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{label}: {value}")?;
                }
                Ok(())
            }
            Self::TroubleCodes(codes) => {
                let mut first = true;
                for code in codes {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{code}")?;
                }
                Ok(())
            }
            Self::NotImplemented => f.write_str("!NOT IMPLEMENTED!"),
            Self::NoData => f.write_str("N/A"),
            Self::Error => f.write_str("!ERROR!"),
            Self::Invalid => f.write_str("[INVALID]"),
            Self::NoDescription => f.write_str("[NO DESCRIPTION]"),
        }
    }
}
