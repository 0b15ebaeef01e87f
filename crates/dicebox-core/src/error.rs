use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiceboxError {
    #[error("unknown die id: {0}")]
    UnknownDie(String),

    #[error("invalid side {0}: must be 1..=6")]
    InvalidSide(u8),

    #[error("config not found at {0}: run 'dicebox init'")]
    ConfigNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DiceboxError>;
