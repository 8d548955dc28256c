mod error;
mod provider;
mod scenario;

pub use scenario::{Delivery, Scenario};
