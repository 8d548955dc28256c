use serde::{Deserialize, Serialize};

use super::error::CellInfoError;

/// One visible cell in a radio snapshot.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CellInfo {
    #[serde(default)]
    pub registered: bool,
    #[serde(flatten)]
    pub radio: RadioInfo,
}

impl CellInfo {
    pub fn lte(&self) -> Option<&LteIdentity> {
        match &self.radio {
            RadioInfo::Lte(cell) => Some(cell),
            _ => None,
        }
    }
}

/// Radio technology of a cell. Only LTE cells carry identity and signal data;
/// the others are recognised so snapshots parse, but are never selected.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "radio", rename_all = "snake_case")]
pub enum RadioInfo {
    Lte(LteIdentity),
    Nr,
    Gsm,
    Wcdma,
    Cdma,
}

/// LTE identity and signal strength. Every field may be missing on partial data.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LteIdentity {
    #[serde(default)]
    pub ci: Option<i32>,
    #[serde(default)]
    pub mcc: Option<String>,
    #[serde(default)]
    pub mnc: Option<String>,
    #[serde(default)]
    pub tac: Option<i32>,
    /// Reference signal received power, dBm.
    #[serde(default)]
    pub rsrp: Option<i32>,
}

/// Provenance of the cell attached to a sample.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
pub enum CellSource {
    #[serde(rename = "LTE_registered")]
    #[strum(serialize = "LTE_registered")]
    LteRegistered,
    #[serde(rename = "LTE_any")]
    #[strum(serialize = "LTE_any")]
    LteAny,
    #[serde(rename = "unknown")]
    #[strum(serialize = "unknown")]
    Unknown,
}

/// Snapshot source for visible cells.
///
/// `Ok(None)` means the radio reported nothing (radio off, no SIM);
/// `Err` covers permission and platform failures.
pub trait CellInfoProvider: Send + Sync {
    fn all_cell_info(&self) -> Result<Option<Vec<CellInfo>>, CellInfoError>;
}
