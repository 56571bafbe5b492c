use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database operation failed: {0}")]
    Database(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid stored value: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Push delivery failed: {0}")]
    Delivery(String),

    #[error("Push payload could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<std::io::Error> for PushError {
    fn from(err: std::io::Error) -> Self {
        PushError::Delivery(err.to_string())
    }
}
