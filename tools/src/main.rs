//! vault-cli: headless runner for the bank service.
//!
//! Usage:
//!   vault-cli --db bank.db ensure alice
//!   vault-cli --db bank.db deposit alice 250
//!   vault-cli --db bank.db withdraw alice 100 --scope guild-7
//!   vault-cli --db bank.db can-withdraw alice 100
//!   vault-cli --db bank.db balance alice

use anyhow::{bail, Result};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use vault_core::{
    clock::{Clock, SystemClock},
    BankError, BankService, BankStore, OwnerKey,
};

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let scope = args
        .windows(2)
        .find(|w| w[0] == "--scope")
        .map(|w| w[1].clone());

    // First non-flag argument is the command; the rest are positional.
    let mut positional = Vec::new();
    let mut skip = false;
    for arg in &args[1..] {
        if skip {
            skip = false;
            continue;
        }
        if arg == "--db" || arg == "--scope" {
            skip = true;
            continue;
        }
        positional.push(arg.as_str());
    }

    let Some((&command, rest)) = positional.split_first() else {
        bail!("usage: vault-cli [--db <path>] [--scope <id>] <command> <user> [amount]");
    };

    let store = BankStore::open(db)?;
    store.migrate()?;
    let service = BankService::new(Arc::new(store));
    let now = SystemClock.now();

    let owner = |user: &str| match &scope {
        Some(s) => OwnerKey::scoped(user, s.clone()),
        None => OwnerKey::user(user),
    };

    let outcome = match (command, rest) {
        ("ensure", [user]) => service.ensure_account(&owner(user)),
        ("balance", [user]) => service.ensure_account(&owner(user)),
        ("deposit", [user, amount]) => service.deposit(&owner(user), parse_amount(amount)?, now),
        ("withdraw", [user, amount]) => service.withdraw(&owner(user), parse_amount(amount)?, now),
        ("can-withdraw", [user, amount]) => {
            let allowed = service.can_withdraw(&owner(user), parse_amount(amount)?, now)?;
            println!("{}", serde_json::json!({ "can_withdraw": allowed }));
            return Ok(());
        }
        _ => bail!("unknown command or wrong arguments: {command}"),
    };

    match outcome {
        Ok(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Err(e @ BankError::Persistence(_)) => {
            log::warn!("store failure, safe to retry with fresh state: {e}");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_amount(raw: &str) -> Result<i64> {
    raw.parse()
        .map_err(|_| anyhow::anyhow!("amount must be an integer, got {raw:?}"))
}
