use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("fix {0}: {1}")]
    Fix(usize, String),
    #[error("cells {0}: {1}")]
    Cells(usize, String),
}
