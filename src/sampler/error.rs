use thiserror::Error;

use crate::location::LocationError;
use crate::record::WriterError;

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("sample log error: {0}")]
    Writer(#[from] WriterError),
    #[error("location error: {0}")]
    Location(#[from] LocationError),
}
