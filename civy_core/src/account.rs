//! Account management: lazy creation and checked balance changes.
//!
//! Every mutation of an [`Account`] goes through this module so the
//! non-negative balance invariant is enforced in one place.

use crate::{Account, Error, Holding, Ledger, Result};
use chrono::{DateTime, Utc};

/// Return the user's account, inserting a default one if it is missing
///
/// The flag is `true` only when this call created the account.
pub fn ensure<'a>(
    ledger: &'a mut Ledger,
    user_id: &str,
    starting_gold: u64,
) -> (&'a mut Account, bool) {
    let accounts = ledger.accounts_mut();
    let created = !accounts.contains_key(user_id);
    if created {
        tracing::info!("Opening account for user {} with {} gold", user_id, starting_gold);
    }
    let account = accounts
        .entry(user_id.to_string())
        .or_insert_with(|| Account::new(starting_gold));
    (account, created)
}

/// Add `amount` (possibly negative) to one holding and return the new total
///
/// The account is left untouched when the result would be negative or
/// would overflow.
pub fn apply_delta(account: &mut Account, holding: Holding, amount: i64) -> Result<u64> {
    let balance = account.balance(holding);
    let updated = if amount >= 0 {
        balance
            .checked_add(amount.unsigned_abs())
            .ok_or(Error::BalanceOverflow {
                holding,
                balance,
                delta: amount,
            })?
    } else {
        balance
            .checked_sub(amount.unsigned_abs())
            .ok_or(Error::NegativeBalance {
                holding,
                balance,
                delta: amount,
            })?
    };

    *account.balance_mut(holding) = updated;
    tracing::debug!("{} {} -> {} (delta {})", holding, balance, updated, amount);
    Ok(updated)
}

pub fn record_daily_claim(account: &mut Account, now: DateTime<Utc>) {
    account.last_daily = Some(now);
}
