//! Business rule validation and posting arithmetic.
//!
//! Nothing here touches storage. The ledger service calls these with values
//! read under a row lock, so the answers are authoritative for that session.

use payvault_shared::types::AccountId;
use rust_decimal::Decimal;

use super::error::{LedgerError, Rejection};
use super::types::TransactionType;

/// Shortest accepted owner name, in characters.
pub const OWNER_MIN_LEN: usize = 2;
/// Longest accepted owner name, in characters.
pub const OWNER_MAX_LEN: usize = 72;

/// Decimal places kept by storage (`NUMERIC(19, 4)`).
pub const MAX_SCALE: u32 = 4;

/// Largest amount or balance storage can hold: `999_999_999_999_999.9999`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_313_682_943, 2_328_306_436, 0, false, 4);

/// Rejects zero, negative, over-precise, and out-of-range amounts.
///
/// # Errors
///
/// Returns `InvalidInput(NonPositiveAmount)` when `amount <= 0`,
/// `InvalidInput(ExcessPrecision)` when it has more than `MAX_SCALE` places and
/// `InvalidInput(AmountOutOfRange)` when it exceeds `MAX_AMOUNT`.
pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(Rejection::NonPositiveAmount(amount).into());
    }
    check_storable(amount)
}

fn check_storable(value: Decimal) -> Result<(), LedgerError> {
    if value > MAX_AMOUNT {
        return Err(Rejection::AmountOutOfRange(value).into());
    }
    if value.normalize().scale() > MAX_SCALE {
        return Err(Rejection::ExcessPrecision(value).into());
    }
    Ok(())
}

/// Checks a transfer request before any storage work happens.
///
/// # Errors
///
/// Returns `InvalidInput` for a non-positive amount or when both sides are
/// the same account.
pub fn validate_transfer(
    from: AccountId,
    to: AccountId,
    amount: Decimal,
) -> Result<(), LedgerError> {
    validate_amount(amount)?;
    if from == to {
        return Err(Rejection::SameAccount.into());
    }
    Ok(())
}

/// Applies one posting to a balance and returns the new balance.
///
/// A withdrawal larger than the balance is refused, so the result is never
/// negative when the input balance is not. A deposit that would push the
/// balance past `MAX_AMOUNT` is refused as well.
///
/// # Errors
///
/// Returns `InvalidInput` for an invalid amount, insufficient funds, or a
/// resulting balance outside the storable range.
pub fn apply_posting(
    balance: Decimal,
    kind: TransactionType,
    amount: Decimal,
) -> Result<Decimal, LedgerError> {
    validate_amount(amount)?;
    let updated = match kind {
        TransactionType::Deposit => balance.checked_add(amount),
        TransactionType::Withdrawal if amount > balance => {
            return Err(LedgerError::insufficient_funds(balance, amount));
        }
        TransactionType::Withdrawal => balance.checked_sub(amount),
    };
    match updated {
        Some(updated) if updated <= MAX_AMOUNT => Ok(updated),
        Some(updated) => Err(Rejection::AmountOutOfRange(updated).into()),
        None => Err(Rejection::AmountOutOfRange(amount).into()),
    }
}

/// Returns the two accounts in the order their rows must be locked.
///
/// Ascending id order, independent of transfer direction, so two transfers
/// between the same pair can never wait on each other in a cycle.
#[must_use]
pub fn lock_order(a: AccountId, b: AccountId) -> [AccountId; 2] {
    if a <= b { [a, b] } else { [b, a] }
}

/// Validates and normalizes an owner name (trimmed, 2..=72 characters).
///
/// # Errors
///
/// Returns `InvalidInput(InvalidOwner)` if the trimmed name is out of bounds.
pub fn normalize_owner(owner: &str) -> Result<String, LedgerError> {
    let trimmed = owner.trim();
    let len = trimmed.chars().count();
    if !(OWNER_MIN_LEN..=OWNER_MAX_LEN).contains(&len) {
        return Err(Rejection::InvalidOwner {
            min: OWNER_MIN_LEN,
            max: OWNER_MAX_LEN,
        }
        .into());
    }
    Ok(trimmed.to_string())
}

/// Rejects negative, over-precise, or out-of-range opening balances. Zero is allowed.
///
/// # Errors
///
/// Returns `InvalidInput(NegativeOpeningBalance)`, `InvalidInput(ExcessPrecision)`
/// or `InvalidInput(AmountOutOfRange)`.
pub fn validate_opening_balance(balance: Decimal) -> Result<(), LedgerError> {
    if balance < Decimal::ZERO {
        return Err(Rejection::NegativeOpeningBalance.into());
    }
    check_storable(balance)
}
