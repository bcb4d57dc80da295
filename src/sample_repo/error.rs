// Persistence failures. Callers in the tick loop log these and fall back to defaults.

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("clock error: {0}")]
    Clock(String),
}
