//! SQLite persistence for bank records.
//!
//! RULE: only the store talks to the database. The service layer calls
//! store methods and never executes SQL directly.
//!
//! `apply_delta` is the single atomic boundary for balance mutations: the
//! affordability guard, the cooldown guard, the balance delta, and the
//! timestamp write all happen in one UPDATE statement, so two racing
//! withdrawals can never both commit against the same headroom.

use crate::{
    error::{BankError, BankResult},
    policy::{self, OpKind, COOLDOWN_NANOS},
    types::{BankRecord, OwnerKey, DEFAULT_BALANCE},
};
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct BankStore {
    conn: Mutex<Connection>,
}

impl BankStore {
    pub fn open(path: &str) -> BankResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> BankResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Bound how long a store call may block on a busy database. Hitting
    /// the bound surfaces as [`BankError::Persistence`]; the caller may
    /// retry, re-evaluating balance and cooldown from fresh state.
    pub fn set_busy_timeout(&self, timeout: Duration) -> BankResult<()> {
        self.lock()?.busy_timeout(timeout)?;
        Ok(())
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> BankResult<()> {
        self.lock()?
            .execute_batch(include_str!("../../migrations/001_bank_record.sql"))?;
        Ok(())
    }

    /// Create a fresh record for `owner`: default balance, no timestamps.
    /// A second create for the same owner fails with `DuplicateOwner`;
    /// `BankService::ensure_account` is the idempotent path.
    pub fn create(&self, owner: &OwnerKey) -> BankResult<BankRecord> {
        let record = BankRecord {
            record_id: Uuid::new_v4().to_string(),
            owner: owner.clone(),
            amount: DEFAULT_BALANCE,
            last_deposit: None,
            last_withdrawal: None,
        };
        let result = self.lock()?.execute(
            "INSERT INTO bank_record (record_id, user_id, scope_id, amount)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.record_id,
                owner.user_id,
                owner.scope_column(),
                record.amount
            ],
        );
        match result {
            Ok(_) => {
                log::debug!("created bank record {} for {owner}", record.record_id);
                Ok(record)
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(BankError::DuplicateOwner(owner.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_by_owner(&self, owner: &OwnerKey) -> BankResult<BankRecord> {
        self.lock()?
            .query_row(
                "SELECT record_id, user_id, scope_id, amount, last_deposit, last_withdrawal
                 FROM bank_record WHERE user_id = ?1 AND scope_id = ?2",
                params![owner.user_id, owner.scope_column()],
                record_row_mapper,
            )
            .optional()?
            .ok_or_else(|| BankError::NotFound(owner.to_string()))
    }

    /// Atomically add `delta` to the balance and stamp the timestamp for
    /// `kind` with `now`, in one statement guarded by both the affordability
    /// check (`amount + delta >= 0`) and the cooldown check evaluated
    /// against the stored timestamp. Returns the post-update record.
    ///
    /// When the guards reject, the row is re-read inside the same
    /// transaction to classify the denial: `NotFound` if the record
    /// vanished, `InsufficientFunds` if the delta would overdraw,
    /// `CooldownActive` otherwise. Denials leave the row untouched.
    pub fn apply_delta(
        &self,
        record_id: &str,
        delta: i64,
        kind: OpKind,
        now: DateTime<Utc>,
    ) -> BankResult<BankRecord> {
        let now_ns = to_nanos(now)?;
        let ts_col = match kind {
            OpKind::Deposit => "last_deposit",
            OpKind::Withdrawal => "last_withdrawal",
        };
        let sql = format!(
            "UPDATE bank_record
                SET amount = amount + ?1, {ts_col} = ?2
              WHERE record_id = ?3
                AND amount + ?1 >= 0
                AND ({ts_col} IS NULL OR {ts_col} + ?4 < ?2)"
        );

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let changed = tx.execute(&sql, params![delta, now_ns, record_id, COOLDOWN_NANOS])?;
        let record = fetch_by_id(&tx, record_id)?
            .ok_or_else(|| BankError::NotFound(record_id.to_string()))?;

        if changed == 0 {
            // Guards rejected; transaction drops without committing.
            if record.amount + delta < 0 {
                return Err(BankError::InsufficientFunds {
                    requested: -delta,
                    available: record.amount,
                });
            }
            let next_allowed_at = policy::next_allowed_at(kind, &record)
                .ok_or_else(|| anyhow!("update rejected for {record_id} with no cause"))?;
            return Err(BankError::CooldownActive {
                kind,
                next_allowed_at,
            });
        }

        tx.commit()?;
        log::debug!(
            "applied {kind} delta {delta} to {record_id}, balance now {}",
            record.amount
        );
        Ok(record)
    }

    fn lock(&self) -> BankResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BankError::Other(anyhow!("bank store mutex poisoned")))
    }
}

fn fetch_by_id(conn: &Connection, record_id: &str) -> BankResult<Option<BankRecord>> {
    conn.query_row(
        "SELECT record_id, user_id, scope_id, amount, last_deposit, last_withdrawal
         FROM bank_record WHERE record_id = ?1",
        params![record_id],
        record_row_mapper,
    )
    .optional()
    .map_err(Into::into)
}

fn record_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<BankRecord> {
    let scope_id: String = row.get(2)?;
    Ok(BankRecord {
        record_id: row.get(0)?,
        owner: OwnerKey {
            user_id: row.get(1)?,
            scope_id: (!scope_id.is_empty()).then_some(scope_id),
        },
        amount: row.get(3)?,
        last_deposit: row.get::<_, Option<i64>>(4)?.map(from_nanos),
        last_withdrawal: row.get::<_, Option<i64>>(5)?.map(from_nanos),
    })
}

fn to_nanos(t: DateTime<Utc>) -> BankResult<i64> {
    t.timestamp_nanos_opt()
        .ok_or_else(|| BankError::Other(anyhow!("timestamp out of range: {t}")))
}

fn from_nanos(ns: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(ns)
}
