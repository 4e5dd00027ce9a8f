#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid accessory context: {0}")]
    Context(#[from] serde_json::Error),
}
