use thiserror::Error;

/// Errors that can occur on an IRC connection.
#[derive(Debug, Error)]
pub enum IrcError {
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by server")]
    Closed,

    #[error("connection timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("malformed IRC line: {0:?}")]
    Parse(String),
}
