use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid board: {0}")]
    InvalidBoard(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
