use bpl_common::PointsError;
use thiserror::Error;

use crate::{
    db_types::{BalanceSnapshot, NewWithdrawal, Withdrawal},
    traits::WithdrawalResult,
};

#[derive(Debug, Clone, Error)]
pub enum BalanceError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
    /// The store could not obtain its locks in time. The operation may be retried.
    #[error("Conflicting concurrent access: {0}")]
    Conflict(String),
    #[error("Invalid withdrawal amount: {0}")]
    InvalidAmount(#[from] PointsError),
}

impl From<sqlx::Error> for BalanceError {
    fn from(e: sqlx::Error) -> Self {
        if is_lock_conflict(&e) {
            BalanceError::Conflict(e.to_string())
        } else {
            BalanceError::DatabaseError(e.to_string())
        }
    }
}

/// `SQLITE_BUSY`, `SQLITE_LOCKED` and their extended codes.
const LOCK_CONFLICT_CODES: [&str; 5] = ["5", "6", "261", "262", "517"];

fn is_lock_conflict(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().map(|c| LOCK_CONFLICT_CODES.contains(&c.as_ref())).unwrap_or(false),
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

/// Balance and withdrawal behaviour for a ledger backend.
///
/// Balances are never stored. They are always derived from the user's `Accrued` orders and withdrawals.
#[allow(async_fn_in_trait)]
pub trait BalanceManagement {
    /// Reads the accrued and withdrawn totals for the user in a single consistent read.
    async fn fetch_balance(&self, user_id: i64) -> Result<BalanceSnapshot, BalanceError>;

    /// Atomically checks the user's current balance and records the withdrawal if it is covered.
    ///
    /// Implementations must serialise concurrent withdrawals for the same user, so that the balance can never go
    /// negative. If the balance is insufficient, nothing is written.
    async fn try_withdraw(&self, withdrawal: NewWithdrawal) -> Result<WithdrawalResult, BalanceError>;

    /// All withdrawals for the user, newest first.
    async fn fetch_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, BalanceError>;
}
