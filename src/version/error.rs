use thiserror::Error;

/// Classification of a [`StoreError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty or malformed identifying input, never retried
    InvalidArgument,
    /// A well-formed lookup matched zero rows
    NotFound,
    /// An internal invariant was violated by the stored data
    Inconsistency,
    /// Anything raised by the storage collaborator (I/O, timeout, cancellation)
    Storage,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("BUG: {0}")]
    Inconsistency(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Query cancelled: {0}")]
    Cancelled(String),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Inconsistency(_) => ErrorKind::Inconsistency,
            StoreError::Database(_)
            | StoreError::Cancelled(_)
            | StoreError::LockPoisoned
            | StoreError::Task(_) => ErrorKind::Storage,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
