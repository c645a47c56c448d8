use thiserror::Error;

/// Errors raised by the store and the derivation logic built on it.
#[derive(Debug, Error)]
pub enum Error {
    /// The referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// The request failed validation or referenced a missing parent
    #[error("{0}")]
    Invalid(String),

    /// The store could not complete the operation
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
