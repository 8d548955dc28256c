mod error;
mod selector;
pub mod types;

pub use error::CellInfoError;
pub use selector::{lookup, CellSelection};
pub use types::{CellInfo, CellInfoProvider};
