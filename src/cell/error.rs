use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellInfoError {
    #[error("cell info permission denied")]
    PermissionDenied,
    #[error("cell info unavailable: {0}")]
    Unavailable(String),
}
