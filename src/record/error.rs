use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}
