use crate::domain::money::Credits;
use std::fmt;
use thiserror::Error;

/// The kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Category,
    Subscription,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::User => "user",
            EntityKind::Category => "category",
            EntityKind::Subscription => "subscription",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: u64 },
    #[error("insufficient funds: balance {balance}, price {price}")]
    InsufficientFunds { balance: Credits, price: Credits },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Persistence failure: {0}")]
    PersistenceFailure(Box<dyn std::error::Error + Send + Sync>),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LedgerError {
    pub fn not_found(entity: EntityKind, id: u64) -> Self {
        LedgerError::NotFound { entity, id }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        LedgerError::PersistenceFailure(Box::new(std::io::Error::other(message.into())))
    }

    /// Errors caused by the request itself. Nothing was written when one of these is returned.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LedgerError::NotFound { .. }
                | LedgerError::InsufficientFunds { .. }
                | LedgerError::ValidationError(_)
                | LedgerError::CsvError(_)
        )
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::PersistenceFailure(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        LedgerError::PersistenceFailure(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
