use crate::policy::OpKind;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BankError {
    #[error("amount must be a positive integer, got {0}")]
    InvalidAmount(i64),

    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: i64, available: i64 },

    #[error("{kind} cooldown active, next allowed at {next_allowed_at}")]
    CooldownActive {
        kind: OpKind,
        next_allowed_at: DateTime<Utc>,
    },

    #[error("no bank record for {0}")]
    NotFound(String),

    #[error("bank record already exists for {0}")]
    DuplicateOwner(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type BankResult<T> = Result<T, BankError>;
