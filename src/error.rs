use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Payment not found")]
    NotFound,
    #[error("Confirmed value does not match the payment value")]
    ValueMismatch,
    /// Store-level signal for a lost confirmation race. Never leaves the lifecycle.
    #[error("Payment already paid")]
    AlreadyPaid,
    #[error("Persistence error: {0}")]
    PersistenceError(String),
    #[error("Code generation error: {0}")]
    CodeGeneration(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
}

pub type Result<T> = std::result::Result<T, PaymentError>;
