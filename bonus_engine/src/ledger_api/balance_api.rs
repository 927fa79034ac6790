use std::{fmt::Debug, time::Duration};

use bpl_common::OrderNumber;
use log::*;

use crate::{
    db_types::{Balance, NewWithdrawal, Withdrawal},
    traits::{BalanceError, BalanceManagement, WithdrawalResult},
};

/// The number of times a withdrawal is attempted when the store reports a lock conflict.
pub const MAX_WITHDRAWAL_ATTEMPTS: usize = 3;
const RETRY_PAUSE: Duration = Duration::from_millis(25);

/// `BalanceApi` reports user balances and performs withdrawals against them.
pub struct BalanceApi<B> {
    db: B,
}

impl<B: Debug> Debug for BalanceApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BalanceApi ({:?})", self.db)
    }
}

impl<B> BalanceApi<B>
where B: BalanceManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// The user's current balance, and the total they have withdrawn to date.
    pub async fn balance(&self, user_id: i64) -> Result<Balance, BalanceError> {
        let snapshot = self.db.fetch_balance(user_id).await?;
        let balance = Balance::from(snapshot);
        if balance.current.is_overdrawn() {
            error!("💰️ User #{user_id} has a negative balance of {}. The ledger is inconsistent!", balance.current);
        }
        Ok(balance)
    }

    /// Spends `amount` points from the user's balance against `order_number`.
    ///
    /// The amount must be finite and strictly positive. If the user's current balance does not cover it, nothing is
    /// recorded and [`WithdrawalResult::InsufficientFunds`] is returned.
    pub async fn withdraw(
        &self,
        user_id: i64,
        order_number: OrderNumber,
        amount: f64,
    ) -> Result<WithdrawalResult, BalanceError> {
        let withdrawal = NewWithdrawal::new(user_id, order_number, amount)?;
        let mut attempt = 1;
        loop {
            match self.db.try_withdraw(withdrawal.clone()).await {
                Ok(result) => {
                    log_withdrawal(&withdrawal, &result);
                    return Ok(result);
                },
                Err(BalanceError::Conflict(msg)) if attempt < MAX_WITHDRAWAL_ATTEMPTS => {
                    warn!("💰️ Withdrawal for user #{user_id} hit a lock conflict (attempt {attempt}): {msg}. Retrying.");
                    attempt += 1;
                    tokio::time::sleep(RETRY_PAUSE * attempt as u32).await;
                },
                Err(e) => {
                    warn!("💰️ Withdrawal of {} for user #{user_id} failed: {e}", withdrawal.amount);
                    return Err(e);
                },
            }
        }
    }

    /// All of the user's withdrawals, newest first.
    pub async fn withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, BalanceError> {
        self.db.fetch_withdrawals_for_user(user_id).await
    }
}

fn log_withdrawal(withdrawal: &NewWithdrawal, result: &WithdrawalResult) {
    match result {
        WithdrawalResult::Accepted(w) => {
            info!("💰️ User #{} withdrew {} against order {}", w.user_id, w.amount, w.order_number)
        },
        WithdrawalResult::InsufficientFunds { available, requested } => debug!(
            "💰️ User #{} cannot withdraw {requested} against order {}. Only {available} available",
            withdrawal.user_id, withdrawal.order_number
        ),
    }
}
