//! Bank service: validates amounts, checks affordability, applies the
//! cooldown policy, and drives the store.
//!
//! The pre-checks here exist to fail early with a precise error; the store's
//! `apply_delta` re-enforces both guards inside its atomic boundary, so a
//! concurrent caller slipping between the snapshot read and the commit is
//! still rejected correctly.

use crate::{
    error::{BankError, BankResult},
    policy::{self, OpKind},
    store::BankStore,
    types::{BankRecord, OwnerKey},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct BankService {
    store: Arc<BankStore>,
}

impl BankService {
    pub fn new(store: Arc<BankStore>) -> Self {
        Self { store }
    }

    /// Idempotent create-or-get: a new owner gets a record with the default
    /// balance, an existing owner gets their record back unchanged. A racing
    /// create by another caller is resolved by re-reading.
    pub fn ensure_account(&self, owner: &OwnerKey) -> BankResult<BankRecord> {
        match self.store.get_by_owner(owner) {
            Ok(record) => Ok(record),
            Err(BankError::NotFound(_)) => match self.store.create(owner) {
                Ok(record) => Ok(record),
                Err(BankError::DuplicateOwner(_)) => self.store.get_by_owner(owner),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Add `amount` to the owner's balance, rate-limited to once per rolling
    /// 24-hour window. Returns the post-update record.
    pub fn deposit(
        &self,
        owner: &OwnerKey,
        amount: i64,
        now: DateTime<Utc>,
    ) -> BankResult<BankRecord> {
        let record = self.load_for(owner, amount)?;
        guard_cooldown(OpKind::Deposit, &record, now)?;
        let updated = self
            .store
            .apply_delta(&record.record_id, amount, OpKind::Deposit, now)?;
        log::debug!("deposit {amount} for {owner}, balance {}", updated.amount);
        Ok(updated)
    }

    /// Remove `amount` from the owner's balance, capped at the current
    /// balance and rate-limited to once per rolling 24-hour window.
    /// Affordability is reported ahead of the cooldown.
    pub fn withdraw(
        &self,
        owner: &OwnerKey,
        amount: i64,
        now: DateTime<Utc>,
    ) -> BankResult<BankRecord> {
        let record = self.load_for(owner, amount)?;
        if amount > record.amount {
            return Err(BankError::InsufficientFunds {
                requested: amount,
                available: record.amount,
            });
        }
        guard_cooldown(OpKind::Withdrawal, &record, now)?;
        let updated =
            self.store
                .apply_delta(&record.record_id, -amount, OpKind::Withdrawal, now)?;
        log::debug!("withdrawal {amount} for {owner}, balance {}", updated.amount);
        Ok(updated)
    }

    /// Read-only probe: would a withdrawal of `amount` currently be
    /// permitted? True only if the record exists, the amount is positive and
    /// affordable, and the cooldown has lapsed. A true answer is advisory;
    /// a concurrent mutation can still win the race before `withdraw` runs.
    pub fn can_withdraw(
        &self,
        owner: &OwnerKey,
        amount: i64,
        now: DateTime<Utc>,
    ) -> BankResult<bool> {
        match self.store.get_by_owner(owner) {
            Ok(record) => Ok(amount > 0
                && amount <= record.amount
                && policy::is_allowed(OpKind::Withdrawal, &record, now)),
            Err(BankError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn load_for(&self, owner: &OwnerKey, amount: i64) -> BankResult<BankRecord> {
        if amount <= 0 {
            return Err(BankError::InvalidAmount(amount));
        }
        self.store.get_by_owner(owner)
    }
}

fn guard_cooldown(kind: OpKind, record: &BankRecord, now: DateTime<Utc>) -> BankResult<()> {
    if policy::is_allowed(kind, record, now) {
        return Ok(());
    }
    // Denied implies a prior timestamp exists, so next_allowed_at is Some.
    match policy::next_allowed_at(kind, record) {
        Some(next_allowed_at) => Err(BankError::CooldownActive {
            kind,
            next_allowed_at,
        }),
        None => Ok(()),
    }
}
