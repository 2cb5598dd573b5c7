//! Cooldown policy: one deposit and one withdrawal per rolling 24-hour
//! window, tracked independently per kind. Pure decisions only; no I/O and
//! no global clock reads.

use crate::types::BankRecord;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cooldown window in unix nanoseconds. Shared with the store's SQL guard
/// so the pure decision and the commit-time check cannot drift.
pub const COOLDOWN_NANOS: i64 = 24 * 60 * 60 * 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Deposit,
    Withdrawal,
}

impl OpKind {
    /// The timestamp this kind of operation is rate-limited on. A deposit's
    /// permission depends only on `last_deposit`, a withdrawal's only on
    /// `last_withdrawal`.
    pub fn last_applied(self, record: &BankRecord) -> Option<DateTime<Utc>> {
        match self {
            OpKind::Deposit => record.last_deposit,
            OpKind::Withdrawal => record.last_withdrawal,
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Deposit => write!(f, "deposit"),
            OpKind::Withdrawal => write!(f, "withdrawal"),
        }
    }
}

pub fn cooldown() -> TimeDelta {
    TimeDelta::nanoseconds(COOLDOWN_NANOS)
}

/// Whether `kind` is permitted at `now`. First use is always allowed; after
/// that, `now` must be strictly after the prior timestamp plus 24 hours.
/// Exactly 24 hours later is still denied (the boundary is exclusive).
pub fn is_allowed(kind: OpKind, record: &BankRecord, now: DateTime<Utc>) -> bool {
    match kind.last_applied(record) {
        None => true,
        Some(last) => now > last + cooldown(),
    }
}

/// Earliest instant at which `kind` becomes permitted again, or `None` when
/// the kind has never run (allowed immediately). Since the boundary is
/// exclusive, this is one nanosecond past the 24-hour mark.
pub fn next_allowed_at(kind: OpKind, record: &BankRecord) -> Option<DateTime<Utc>> {
    kind.last_applied(record)
        .map(|last| last + cooldown() + TimeDelta::nanoseconds(1))
}
