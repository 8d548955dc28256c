use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use super::scenario::{CellSnapshot, Delivery, FixSpec, Scenario, TimedDelivery};
use crate::cell::{CellInfo, CellInfoError, CellInfoProvider};
use crate::location::{
    FixCallback, LocationError, LocationProvider, LocationRequest, LocationResult,
    LocationUpdate, RawFix, SubscriptionId,
};

/// Replays scenario fixes in real time, offsets counted from `origin`.
pub struct ReplayLocation {
    permission: bool,
    deliveries: Arc<Vec<TimedDelivery>>,
    origin: Instant,
    next_id: AtomicU64,
    tasks: StdMutex<HashMap<SubscriptionId, JoinHandle<()>>>,
}

/// Serves the cell snapshot in effect at the current scenario offset.
pub struct ReplayCells {
    snapshots: Vec<CellSnapshot>,
    origin: Instant,
}

impl Scenario {
    pub fn into_providers(self, origin: Instant) -> (ReplayLocation, ReplayCells) {
        let location = ReplayLocation {
            permission: self.location_permission,
            deliveries: Arc::new(self.deliveries),
            origin,
            next_id: AtomicU64::new(1),
            tasks: StdMutex::new(HashMap::new()),
        };
        let cells = ReplayCells {
            snapshots: self.snapshots,
            origin,
        };
        (location, cells)
    }
}

impl LocationProvider for ReplayLocation {
    fn request_updates(
        &self,
        request: LocationRequest,
        callback: FixCallback,
    ) -> Result<SubscriptionId, LocationError> {
        if !self.permission {
            return Err(LocationError::PermissionDenied);
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        log::debug!(
            "Replay subscription {:?} (interval {} ms, max delay {} ms)",
            id,
            request.interval_ms,
            request.max_update_delay_ms
        );

        let deliveries = self.deliveries.clone();
        let origin = self.origin;
        let task = runtime.spawn(async move {
            for timed in deliveries.iter() {
                let Some(due) = origin.checked_add(timed.at) else {
                    log::warn!("Replay offset {:?} is out of range, skipping the rest", timed.at);
                    break;
                };
                sleep_until(due).await;
                callback(to_update(&timed.delivery));
            }
            // hold the callback until the subscription is removed
            std::future::pending::<()>().await;
        });

        self.tasks.lock().unwrap().insert(id, task);
        Ok(id)
    }

    fn remove_updates(&self, id: SubscriptionId) {
        if let Some(task) = self.tasks.lock().unwrap().remove(&id) {
            task.abort();
        }
    }
}

impl Drop for ReplayLocation {
    fn drop(&mut self) {
        for (_, task) in self.tasks.lock().unwrap().drain() {
            task.abort();
        }
    }
}

fn to_update(delivery: &Delivery) -> LocationUpdate {
    match delivery {
        Delivery::Fixes(fixes) => LocationUpdate::Result(LocationResult {
            locations: fixes.iter().map(to_raw_fix).collect(),
        }),
        Delivery::Failure(e) => LocationUpdate::Failed(e.clone()),
    }
}

fn to_raw_fix(fix: &FixSpec) -> RawFix {
    RawFix {
        latitude: fix.latitude,
        longitude: fix.longitude,
        time_ms: fix.time.unwrap_or_else(Utc::now).timestamp_millis(),
    }
}

impl CellInfoProvider for ReplayCells {
    fn all_cell_info(&self) -> Result<Option<Vec<CellInfo>>, CellInfoError> {
        let elapsed = self.origin.elapsed();
        let current = self
            .snapshots
            .iter()
            .take_while(|s| s.at <= elapsed)
            .last();

        match current {
            None => Ok(None),
            Some(snapshot) if snapshot.unavailable => Err(CellInfoError::Unavailable(format!(
                "radio unavailable at {}",
                humantime::format_duration(snapshot.at)
            ))),
            Some(snapshot) => Ok(snapshot.cells.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::record::writer::HEADER;
    use crate::sampler::Sampler;
    use std::time::Duration;

    const SCENARIO: &str = r#"
fixes:
  - at: 0s
    latitude: 35.7
    longitude: 51.4
    time: 2024-05-01T10:00:00Z
  - at: 10ms
    latitude: 35.8
    longitude: 51.5
cells:
  - at: 0s
    cells:
      - radio: gsm
        registered: true
      - radio: lte
        registered: true
        ci: 100
        mcc: "432"
        mnc: "11"
        tac: 7
        rsrp: -90
  - at: 50ms
    unavailable: true
"#;

    #[tokio::test]
    async fn snapshot_follows_offset() {
        let scenario = Scenario::from_str(SCENARIO).unwrap();
        let (_, cells) = scenario.into_providers(Instant::now());
        let current = cells.all_cell_info().unwrap().unwrap();
        assert_eq!(current.len(), 2);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(matches!(
            cells.all_cell_info(),
            Err(CellInfoError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn no_snapshot_yet_means_no_cells() {
        let scenario = Scenario::from_str("cells:\n  - at: 1h\n    cells: []\n").unwrap();
        let (_, cells) = scenario.into_providers(Instant::now());
        assert_eq!(cells.all_cell_info().unwrap(), None);
    }

    #[tokio::test]
    async fn denied_permission_refuses_subscription() {
        let scenario = Scenario::from_str("location_permission: false\n").unwrap();
        let (location, _) = scenario.into_providers(Instant::now());
        let result =
            location.request_updates(LocationRequest::for_interval(5), Box::new(|_: LocationUpdate| {}));
        assert_eq!(result, Err(LocationError::PermissionDenied));
    }

    #[tokio::test]
    async fn replays_through_sampler() {
        let dir = tempfile::tempdir().unwrap();
        let scenario = Scenario::from_str(SCENARIO).unwrap();
        let (location, cells) = scenario.into_providers(Instant::now());
        let mut sampler = Sampler::new(Arc::new(location), Arc::new(cells));

        let config = SessionConfig {
            interval: Some(5),
            filename: "replay.csv".into(),
            output_dir: dir.path().to_path_buf(),
        };
        sampler.start(&config).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        sampler.stop().await;

        let content = std::fs::read_to_string(dir.path().join("replay.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].ends_with(",35.7,51.4,100,-90,432,11,7,LTE_registered"));

        let status = sampler.status();
        assert_eq!(status.accepted, 1);
        assert_eq!(status.dropped, 1);
    }
}
