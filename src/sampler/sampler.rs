use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::clock::{Clock, SystemClock};
use super::error::SamplerError;
use super::gate::Gate;
use crate::cell::{self, CellInfoProvider};
use crate::config::SessionConfig;
use crate::location::{
    FixCallback, LocationProvider, LocationRequest, LocationResult, LocationUpdate,
};
use crate::record::{CsvLog, Sample};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SamplerMode {
    Idle,
    Running {
        started: DateTime<Local>,
        path: PathBuf,
        interval_secs: u64,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SamplerStatus {
    pub mode: SamplerMode,
    pub accepted: u64,
    pub dropped: u64,
    pub write_errors: u64,
    pub last_sample: Option<Sample>,
}

impl SamplerStatus {
    fn idle() -> Self {
        Self {
            mode: SamplerMode::Idle,
            accepted: 0,
            dropped: 0,
            write_errors: 0,
            last_sample: None,
        }
    }
}

#[derive(Debug)]
struct Shared {
    status: SamplerStatus,
}

/// An update stamped with the wall-clock time it was handed to us.
struct Received {
    at_ms: i64,
    update: LocationUpdate,
}

struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// One sampling session at a time: a location subscription feeding a gate,
/// a cell lookup and an append-only CSV log.
pub struct Sampler {
    location: Arc<dyn LocationProvider>,
    cells: Arc<dyn CellInfoProvider>,
    clock: Arc<dyn Clock>,
    shared: Arc<StdMutex<Shared>>,
    worker: Option<WorkerHandle>,
}

impl Sampler {
    pub fn new(location: Arc<dyn LocationProvider>, cells: Arc<dyn CellInfoProvider>) -> Self {
        Self::with_clock(location, cells, Arc::new(SystemClock))
    }

    pub fn with_clock(
        location: Arc<dyn LocationProvider>,
        cells: Arc<dyn CellInfoProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            location,
            cells,
            clock,
            shared: Arc::new(StdMutex::new(Shared {
                status: SamplerStatus::idle(),
            })),
            worker: None,
        }
    }

    pub fn status(&self) -> SamplerStatus {
        self.shared.lock().unwrap().status.clone()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status().mode, SamplerMode::Running { .. })
    }

    /// Opens the sample log and subscribes to location updates. A session that
    /// is already running is stopped first.
    pub async fn start(&mut self, config: &SessionConfig) -> Result<(), SamplerError> {
        if self.worker.is_some() {
            log::info!("Sampling session already active, restarting");
            self.stop().await;
        }

        let interval_secs = config.interval_secs();
        let path = config.output_path();
        let writer = CsvLog::open(&path)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let clock = self.clock.clone();
        let callback: FixCallback = Box::new(move |update| {
            let _ = tx.send(Received {
                at_ms: clock.now_ms(),
                update,
            });
        });

        let request = LocationRequest::for_interval(interval_secs);
        let subscription = match self.location.request_updates(request, callback) {
            Ok(id) => id,
            Err(e) => {
                log::error!("Location subscription failed, stopping session: {}", e);
                writer.close();
                self.shared.lock().unwrap().status.mode = SamplerMode::Idle;
                return Err(e.into());
            }
        };

        {
            let mut locked = self.shared.lock().unwrap();
            locked.status = SamplerStatus {
                mode: SamplerMode::Running {
                    started: Local::now(),
                    path: path.clone(),
                    interval_secs,
                },
                ..SamplerStatus::idle()
            };
        }

        log::info!(
            "Sampling every {}s into {}",
            interval_secs,
            path.display()
        );

        let worker = Worker {
            gate: Gate::new(interval_secs),
            writer,
            cells: self.cells.clone(),
            shared: self.shared.clone(),
        };
        let location = self.location.clone();
        let shared = self.shared.clone();
        let (stop_tx, stop_rx) = oneshot::channel();

        let join = tokio::spawn(async move {
            let writer = worker.run(rx, stop_rx).await;
            location.remove_updates(subscription);
            writer.close();

            shared.lock().unwrap().status.mode = SamplerMode::Idle;
            log::info!("Sampling session ended");
        });

        self.worker = Some(WorkerHandle { stop_tx, join });
        Ok(())
    }

    /// Unsubscribes and closes the sample log. Safe to call when idle.
    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            if let Err(e) = worker.join.await {
                log::error!("Sampling worker failed: {}", e);
            }
        }
        let mut locked = self.shared.lock().unwrap();
        locked.status.mode = SamplerMode::Idle;
    }
}

/// Owns the gate and the log for one session. Updates are handled strictly one
/// at a time, so gate check, lookup and write never interleave.
struct Worker<W: Write> {
    gate: Gate,
    writer: CsvLog<W>,
    cells: Arc<dyn CellInfoProvider>,
    shared: Arc<StdMutex<Shared>>,
}

impl<W: Write> Worker<W> {
    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Received>,
        mut stop_rx: oneshot::Receiver<()>,
    ) -> CsvLog<W> {
        loop {
            tokio::select! {
                biased;
                received = rx.recv() => match received {
                    Some(Received { at_ms, update: LocationUpdate::Result(result) }) => {
                        self.on_result(at_ms, &result);
                    }
                    Some(Received { update: LocationUpdate::Failed(e), .. }) => {
                        log::error!("Location updates failed, stopping session: {}", e);
                        break;
                    }
                    None => break,
                },
                _ = &mut stop_rx => {
                    rx.close();
                    while let Some(received) = rx.recv().await {
                        if let LocationUpdate::Result(result) = received.update {
                            self.on_result(received.at_ms, &result);
                        }
                    }
                    break;
                }
            }
        }
        self.writer
    }

    fn on_result(&mut self, at_ms: i64, result: &LocationResult) {
        let Some(fix) = result.last_location() else {
            return;
        };

        if !self.gate.offer(at_ms) {
            self.shared.lock().unwrap().status.dropped += 1;
            return;
        }

        let sample = Sample::new(fix, cell::lookup(self.cells.as_ref()));
        let written = self.writer.append(&sample);

        let mut locked = self.shared.lock().unwrap();
        locked.status.accepted += 1;
        match written {
            Ok(row) => {
                log::debug!("Wrote: {}", row);
                locked.status.last_sample = Some(sample);
            }
            Err(e) => {
                log::error!("Error writing sample: {}", e);
                locked.status.write_errors += 1;
            }
        }
    }
}
