//! Device storage occupancy, used to pace uploads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::adb::RemoteDevice;

/// Binary-scaled storage unit for ceilings and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageUnit {
    Kb,
    Mb,
    #[default]
    Gb,
}

impl StorageUnit {
    pub fn bytes(self) -> u64 {
        match self {
            StorageUnit::Kb => 1024,
            StorageUnit::Mb => 1024 * 1024,
            StorageUnit::Gb => 1024 * 1024 * 1024,
        }
    }

    pub fn from_bytes(self, bytes: u64) -> f64 {
        bytes as f64 / self.bytes() as f64
    }

    pub fn label(self) -> &'static str {
        match self {
            StorageUnit::Kb => "KB",
            StorageUnit::Mb => "MB",
            StorageUnit::Gb => "GB",
        }
    }
}

impl fmt::Display for StorageUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StorageUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kb" | "k" => Ok(StorageUnit::Kb),
            "mb" | "m" => Ok(StorageUnit::Mb),
            "gb" | "g" => Ok(StorageUnit::Gb),
            other => Err(format!("unknown storage unit {other:?} (expected kb, mb or gb)")),
        }
    }
}

/// Result of an occupancy query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Bytes(u64),
    /// The query failed. Callers treat this as "under the ceiling".
    Unavailable,
}

impl Occupancy {
    pub fn in_unit(self, unit: StorageUnit) -> Option<f64> {
        match self {
            Occupancy::Bytes(b) => Some(unit.from_bytes(b)),
            Occupancy::Unavailable => None,
        }
    }

    /// `true` only for a measured value at or above `ceiling`.
    pub fn at_or_above(self, ceiling: f64, unit: StorageUnit) -> bool {
        self.in_unit(unit).is_some_and(|v| v >= ceiling)
    }
}

/// Queries occupancy of a device directory.
pub struct StorageMonitor<'a> {
    device: &'a dyn RemoteDevice,
}

impl<'a> StorageMonitor<'a> {
    pub fn new(device: &'a dyn RemoteDevice) -> Self {
        Self { device }
    }

    /// Never fails: any transport or parse error becomes `Unavailable`.
    pub fn occupancy(&self, remote_dir: &str) -> Occupancy {
        match self.device.disk_usage_kb(remote_dir) {
            Ok(kb) => Occupancy::Bytes(kb.saturating_mul(1024)),
            Err(e) => {
                tracing::warn!(dir = remote_dir, error = %e, "storage query failed; not gating");
                Occupancy::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_scaling() {
        assert_eq!(StorageUnit::Gb.from_bytes(5 * 1024 * 1024 * 1024), 5.0);
        assert_eq!(StorageUnit::Mb.from_bytes(1536 * 1024), 1.5);
    }

    #[test]
    fn ceiling_is_inclusive() {
        let five_gb = Occupancy::Bytes(5 * 1024 * 1024 * 1024);
        assert!(five_gb.at_or_above(5.0, StorageUnit::Gb));
        let just_under = Occupancy::Bytes(5 * 1024 * 1024 * 1024 - 1024);
        assert!(!just_under.at_or_above(5.0, StorageUnit::Gb));
        assert!(!Occupancy::Unavailable.at_or_above(0.0, StorageUnit::Gb));
    }

    #[test]
    fn unit_parsing() {
        assert_eq!("GB".parse::<StorageUnit>().unwrap(), StorageUnit::Gb);
        assert_eq!("m".parse::<StorageUnit>().unwrap(), StorageUnit::Mb);
        assert!("tb".parse::<StorageUnit>().is_err());
    }
}
