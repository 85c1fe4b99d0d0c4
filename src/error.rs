use rmcp::ErrorData as RpcError;

use thiserror::Error;
use tokio::io;

pub type ServiceResult<T> = core::result::Result<T, ServiceError>;

/// Validation failures at mutation boundaries. `Display` is the reason shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GoalError {
    #[error("Goal title cannot be empty.")]
    EmptyTitle,
    #[error("There is already an active goal. Complete or abandon it first.")]
    GoalAlreadyActive,
}

impl GoalError {
    pub fn code(&self) -> &'static str {
        match self {
            GoalError::EmptyTitle => "EmptyTitle",
            GoalError::GoalAlreadyActive => "GoalAlreadyActive",
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not resolve a data directory")]
    NoDataDir,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    FromString(String),
    #[error("{0}")]
    Config(String),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    RpcError(#[from] RpcError),
    #[error("{0}")]
    IoError(#[from] io::Error),
    #[error("{0}")]
    SerdeJsonError(#[from] serde_json::Error),
}
