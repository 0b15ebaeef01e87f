use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("binding failed: {0}")]
    Bind(String),

    #[error("process error: {0}")]
    Process(String),
}
