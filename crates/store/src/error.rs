use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Document store operation error.
///
/// These are infrastructure failures. Handlers do not recover from them; the
/// API maps every variant to a 500 response.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mongodb: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("in-memory store lock poisoned")]
    Poisoned,
}
