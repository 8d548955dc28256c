use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::error::ScenarioError;
use crate::cell::CellInfo;
use crate::location::LocationError;

/// A recorded or hand-written trace of what the platform would report.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub location_permission: bool,
    pub deliveries: Vec<TimedDelivery>,
    pub snapshots: Vec<CellSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimedDelivery {
    pub at: Duration,
    pub delivery: Delivery,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Fixes delivered together, oldest first.
    Fixes(Vec<FixSpec>),
    Failure(LocationError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixSpec {
    pub latitude: f64,
    pub longitude: f64,
    /// Fix time; `None` uses the wall clock at delivery.
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellSnapshot {
    pub at: Duration,
    pub unavailable: bool,
    pub cells: Option<Vec<CellInfo>>,
}

#[derive(Deserialize)]
struct RawScenario {
    #[serde(default = "granted")]
    location_permission: bool,
    #[serde(default)]
    fixes: Vec<RawFixEvent>,
    #[serde(default)]
    cells: Vec<RawCellSnapshot>,
}

fn granted() -> bool {
    true
}

#[derive(Deserialize)]
struct RawFixEvent {
    at: serde_yaml::Value,
    latitude: Option<f64>,
    longitude: Option<f64>,
    time: Option<DateTime<Utc>>,
    #[serde(default)]
    batch: Vec<RawBatchFix>,
    error: Option<ProviderFailure>,
}

#[derive(Deserialize)]
struct RawBatchFix {
    latitude: f64,
    longitude: f64,
    time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum ProviderFailure {
    PermissionRevoked,
    Unavailable,
}

#[derive(Deserialize)]
struct RawCellSnapshot {
    at: serde_yaml::Value,
    #[serde(default)]
    unavailable: bool,
    cells: Option<Vec<CellInfo>>,
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_str(&yaml)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ScenarioError> {
        let raw: RawScenario = serde_yaml::from_str(yaml)?;

        let mut deliveries = raw
            .fixes
            .into_iter()
            .enumerate()
            .map(|(i, event)| parse_fix_event(i, event))
            .collect::<Result<Vec<_>, _>>()?;
        deliveries.sort_by_key(|d| d.at);

        let mut snapshots = raw
            .cells
            .into_iter()
            .enumerate()
            .map(|(i, snapshot)| {
                Ok(CellSnapshot {
                    at: parse_offset(&snapshot.at).map_err(|e| ScenarioError::Cells(i, e))?,
                    unavailable: snapshot.unavailable,
                    cells: snapshot.cells,
                })
            })
            .collect::<Result<Vec<_>, ScenarioError>>()?;
        snapshots.sort_by_key(|s| s.at);

        Ok(Scenario {
            location_permission: raw.location_permission,
            deliveries,
            snapshots,
        })
    }

    /// Offset of the last scheduled event.
    pub fn duration(&self) -> Duration {
        let last_fix = self.deliveries.last().map(|d| d.at);
        let last_cells = self.snapshots.last().map(|s| s.at);
        last_fix.max(last_cells).unwrap_or_default()
    }
}

fn parse_fix_event(i: usize, event: RawFixEvent) -> Result<TimedDelivery, ScenarioError> {
    let err = |msg: &str| ScenarioError::Fix(i, msg.into());
    let at = parse_offset(&event.at).map_err(|e| err(&e))?;

    if let Some(failure) = event.error {
        if event.latitude.is_some() || event.longitude.is_some() || !event.batch.is_empty() {
            return Err(err("error events cannot carry fixes"));
        }
        let error = match failure {
            ProviderFailure::PermissionRevoked => LocationError::PermissionDenied,
            ProviderFailure::Unavailable => {
                LocationError::Unavailable("provider reported failure".into())
            }
        };
        return Ok(TimedDelivery {
            at,
            delivery: Delivery::Failure(error),
        });
    }

    let (latitude, longitude) = match (event.latitude, event.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Err(err("missing latitude/longitude")),
    };
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(err("coordinates out of range"));
    }

    let mut fixes: Vec<FixSpec> = event
        .batch
        .into_iter()
        .map(|b| FixSpec {
            latitude: b.latitude,
            longitude: b.longitude,
            time: b.time,
        })
        .collect();
    fixes.push(FixSpec {
        latitude,
        longitude,
        time: event.time,
    });

    Ok(TimedDelivery {
        at,
        delivery: Delivery::Fixes(fixes),
    })
}

/// Offsets are humantime strings ("1m 30s"); bare numbers count seconds.
fn parse_offset(value: &serde_yaml::Value) -> Result<Duration, String> {
    match value {
        serde_yaml::Value::String(s) => {
            humantime::parse_duration(s.trim()).map_err(|e| e.to_string())
        }
        serde_yaml::Value::Number(n) => n
            .as_u64()
            .map(Duration::from_secs)
            .ok_or_else(|| format!("invalid offset: {}", n)),
        _ => Err("offset must be a duration".into()),
    }
}
