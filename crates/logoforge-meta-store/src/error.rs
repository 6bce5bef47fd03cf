use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum MetaStoreError {
    #[error("concept {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MetaStoreError {
    fn from(err: serde_json::Error) -> Self {
        MetaStoreError::Serialization(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for MetaStoreError {
    fn from(err: sqlx::Error) -> Self {
        MetaStoreError::Database(err.to_string())
    }
}
