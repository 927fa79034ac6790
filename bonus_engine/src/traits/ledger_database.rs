use crate::traits::{BalanceManagement, OrderManagement, UserManagement};

/// The highest-level behaviour a backend must provide to act as the store for the bonus points ledger.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase: Clone + OrderManagement + BalanceManagement + UserManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the database connection pool. Pending queries are allowed to finish.
    async fn close(&mut self);
}
