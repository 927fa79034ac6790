use bpl_common::Points;

use crate::db_types::{Order, Withdrawal};

/// The outcome of an idempotent order insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOrderResult {
    Inserted(Order),
    /// An order with the same number is already on record. The existing order is returned, whoever owns it.
    AlreadyExists(Order),
}

/// The outcome of a withdrawal attempt. Insufficient funds is a business result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum WithdrawalResult {
    Accepted(Withdrawal),
    InsufficientFunds { available: Points, requested: Points },
}

impl WithdrawalResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}
