use thiserror::Error;

#[derive(Error, Debug)]
pub enum FarmhandError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Snapshot codec error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("Confusing message from coordinator")]
    ConfusingMessage,
}

pub type Result<T> = std::result::Result<T, FarmhandError>;
