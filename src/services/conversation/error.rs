use thiserror::Error;

use crate::repositories::StorageError;
use crate::services::conversation::session::SessionError;

#[derive(Debug, Error)]
pub(crate) enum FlowError {
    #[error("user is not allowed to run teacher actions")]
    Unauthorized,
    #[error("test {0} not found")]
    TestNotFound(i64),
    #[error("user is not registered")]
    NotRegistered,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl FlowError {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            FlowError::Unauthorized => "unauthorized",
            FlowError::TestNotFound(_) => "test_not_found",
            FlowError::NotRegistered => "not_registered",
            FlowError::Storage(_) => "storage",
            FlowError::Session(_) => "session",
        }
    }
}
