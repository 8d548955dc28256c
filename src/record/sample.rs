use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;

use crate::cell::CellSelection;
use crate::location::RawFix;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One accepted fix joined with the cell it was attributed to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: Option<DateTime<Local>>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub cell: CellSelection,
}

impl Sample {
    pub fn new(fix: &RawFix, cell: CellSelection) -> Self {
        let timestamp = Local.timestamp_millis_opt(fix.time_ms).single();
        if timestamp.is_none() {
            log::warn!("Fix time {} ms is out of range", fix.time_ms);
        }

        Self {
            timestamp,
            latitude: fix.latitude,
            longitude: fix.longitude,
            cell,
        }
    }

    /// The CSV fields of this sample, in column order.
    pub fn to_record(&self) -> [String; 9] {
        let timestamp = self
            .timestamp
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();

        [
            timestamp,
            self.latitude.to_string(),
            self.longitude.to_string(),
            self.cell.cell_id.to_string(),
            optional(self.cell.rsrp),
            optional(self.cell.mcc.as_deref()),
            optional(self.cell.mnc.as_deref()),
            optional(self.cell.tac),
            self.cell.source.to_string(),
        ]
    }
}

fn optional<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::types::CellSource;

    const FIX: RawFix = RawFix {
        latitude: 35.6892,
        longitude: 51.389,
        time_ms: 1_714_557_600_123,
    };

    fn expected_time() -> String {
        Local
            .timestamp_millis_opt(FIX.time_ms)
            .unwrap()
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }

    #[test]
    fn full_row() {
        let cell = CellSelection {
            cell_id: 100,
            rsrp: Some(-90),
            mcc: Some("432".into()),
            mnc: Some("11".into()),
            tac: Some(7),
            source: CellSource::LteRegistered,
        };
        let row = Sample::new(&FIX, cell).to_record().join(",");
        assert_eq!(
            row,
            format!("{},35.6892,51.389,100,-90,432,11,7,LTE_registered", expected_time())
        );
    }

    #[test]
    fn unknown_cell_leaves_optionals_empty() {
        let record = Sample::new(&FIX, CellSelection::unknown()).to_record();
        assert_eq!(
            record.join(","),
            format!("{},35.6892,51.389,-1,,,,,unknown", expected_time())
        );
        assert!(record[4..8].iter().all(String::is_empty));
    }

    #[test]
    fn timestamp_has_second_precision() {
        let sample = Sample::new(&FIX, CellSelection::unknown());
        let [time, ..] = sample.to_record();
        assert_eq!(time.len(), "2024-05-01 10:00:00".len());
        assert!(!time.contains('.'));
    }

    #[test]
    fn out_of_range_time_renders_empty() {
        let fix = RawFix {
            time_ms: i64::MAX,
            ..FIX
        };
        let sample = Sample::new(&fix, CellSelection::unknown());
        assert!(sample.timestamp.is_none());
        let record = sample.to_record();
        assert_eq!(record[0], "");
        assert_eq!(record[1], "35.6892");
    }
}
