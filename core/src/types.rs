//! Shared primitive types used across the crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable, unique identifier for any entity.
pub type EntityId = String;

/// Starting balance for a freshly created bank record.
pub const DEFAULT_BALANCE: i64 = 1000;

/// Identity a bank record is keyed on: a user, optionally scoped to a
/// community. The scope is opaque to this crate; records for the same user
/// under different scopes are fully independent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerKey {
    pub user_id: EntityId,
    pub scope_id: Option<EntityId>,
}

impl OwnerKey {
    pub fn user(user_id: impl Into<EntityId>) -> Self {
        Self {
            user_id: user_id.into(),
            scope_id: None,
        }
    }

    pub fn scoped(user_id: impl Into<EntityId>, scope_id: impl Into<EntityId>) -> Self {
        Self {
            user_id: user_id.into(),
            scope_id: Some(scope_id.into()),
        }
    }

    /// Scope as persisted: `''` when absent, so the UNIQUE(user_id, scope_id)
    /// constraint holds (SQLite treats NULLs as distinct).
    pub(crate) fn scope_column(&self) -> &str {
        self.scope_id.as_deref().unwrap_or("")
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope_id {
            Some(scope) => write!(f, "{}@{}", self.user_id, scope),
            None => write!(f, "{}", self.user_id),
        }
    }
}

/// One owner's bank state. `amount` is mutated only through
/// [`crate::store::BankStore::apply_delta`]; the timestamps move only as a
/// side effect of a permitted, persisted operation of the matching kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankRecord {
    pub record_id: EntityId,
    pub owner: OwnerKey,
    pub amount: i64,
    pub last_deposit: Option<DateTime<Utc>>,
    pub last_withdrawal: Option<DateTime<Utc>>,
}
