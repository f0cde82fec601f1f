use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid draft id: {0}")]
    InvalidDraftId(String),

    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
