use serde::{Deserialize, Serialize};

use super::error::LocationError;

/// Smallest spacing the provider is asked to respect between two deliveries.
const MIN_UPDATE_INTERVAL_MS: u64 = 1000;

/// A single position report as delivered by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Provider-reported fix time, milliseconds since the Unix epoch.
    pub time_ms: i64,
}

/// One delivery from the provider. Batched deliveries carry several fixes,
/// oldest first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocationResult {
    pub locations: Vec<RawFix>,
}

impl LocationResult {
    #[cfg(test)]
    pub fn single(fix: RawFix) -> Self {
        Self {
            locations: vec![fix],
        }
    }

    pub fn last_location(&self) -> Option<&RawFix> {
        self.locations.last()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationUpdate {
    Result(LocationResult),
    Failed(LocationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocationRequest {
    pub interval_ms: u64,
    pub min_update_interval_ms: u64,
    pub max_update_delay_ms: u64,
}

impl LocationRequest {
    pub fn for_interval(interval_secs: u64) -> Self {
        let interval_ms = interval_secs.saturating_mul(1000);
        Self {
            interval_ms,
            min_update_interval_ms: MIN_UPDATE_INTERVAL_MS.min(interval_ms),
            max_update_delay_ms: interval_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

pub type FixCallback = Box<dyn Fn(LocationUpdate) + Send + Sync>;

/// Source of position updates.
///
/// `request_updates` registers `callback` and returns the handle that must be
/// passed back to `remove_updates` to cancel that registration. Providers may
/// invoke the callback from any thread and at any cadence.
pub trait LocationProvider: Send + Sync {
    fn request_updates(
        &self,
        request: LocationRequest,
        callback: FixCallback,
    ) -> Result<SubscriptionId, LocationError>;

    /// Cancels a subscription. Unknown ids are ignored.
    fn remove_updates(&self, id: SubscriptionId);
}
