mod error;
mod types;

pub use error::LocationError;
pub use types::{
    FixCallback, LocationProvider, LocationRequest, LocationResult, LocationUpdate, RawFix,
    SubscriptionId,
};
