//! `SqliteDatabase` is the concrete SQLite backend for the bonus points ledger.
//!
//! It implements every trait defined in the [`crate::traits`] module.
use std::fmt::Debug;

use bpl_common::{OrderNumber, Points};
use log::*;
use sqlx::SqlitePool;

use super::{db_url, new_pool, orders, users, withdrawals, SqliteDatabaseError};
use crate::{
    db_types::{BalanceSnapshot, NewUser, NewWithdrawal, Order, OrderStatusType, User, Withdrawal},
    traits::{
        BalanceError,
        BalanceManagement,
        InsertOrderResult,
        LedgerDatabase,
        OrderManagement,
        OrderManagementError,
        UserApiError,
        UserManagement,
        WithdrawalResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) {
        self.pool.close().await;
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, user_id: i64, number: &OrderNumber) -> Result<InsertOrderResult, OrderManagementError> {
        let mut tx = self.pool.begin().await?;
        let inserted = match orders::insert_if_absent(user_id, number, &mut tx).await {
            Ok(inserted) => inserted,
            Err(e) if is_foreign_key_violation(&e) => return Err(OrderManagementError::UserNotFound(user_id)),
            Err(e) => return Err(e.into()),
        };
        let order = orders::fetch_order_by_number(number, &mut tx).await?.ok_or_else(|| {
            OrderManagementError::DatabaseError(format!("Order {number} vanished straight after it was recorded"))
        })?;
        tx.commit().await?;
        if inserted {
            debug!("🗃️ Order {number} recorded for user #{user_id} with id {}", order.id);
            Ok(InsertOrderResult::Inserted(order))
        } else {
            trace!("🗃️ Order {number} already exists. Owner is user #{}", order.user_id);
            Ok(InsertOrderResult::AlreadyExists(order))
        }
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_unresolved_orders(&self, limit: i64) -> Result<Vec<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_unresolved_orders(limit, &mut conn).await?;
        Ok(orders)
    }

    async fn update_order_resolution(
        &self,
        number: &OrderNumber,
        status: OrderStatusType,
        accrual: Option<Points>,
    ) -> Result<Option<Order>, OrderManagementError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::update_resolution(number, status, accrual, &mut tx).await?;
        if !updated {
            trace!("🗃️ Order {number} is unknown or already resolved. Not moving it to {status}");
            tx.rollback().await?;
            return Ok(None);
        }
        let order = orders::fetch_order_by_number(number, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {number} is now {status}");
        Ok(order)
    }
}

impl BalanceManagement for SqliteDatabase {
    async fn fetch_balance(&self, user_id: i64) -> Result<BalanceSnapshot, BalanceError> {
        let mut conn = self.pool.acquire().await?;
        let snapshot = withdrawals::balance_snapshot(user_id, &mut conn).await?;
        Ok(snapshot)
    }

    /// In a single atomic transaction:
    /// * takes the write lock by touching the user's row. Concurrent withdrawals queue up behind it.
    /// * recomputes the accrued and withdrawn totals.
    /// * records the withdrawal if the current balance covers it, and rolls back otherwise.
    async fn try_withdraw(&self, withdrawal: NewWithdrawal) -> Result<WithdrawalResult, BalanceError> {
        let user_id = withdrawal.user_id;
        let mut tx = self.pool.begin().await?;
        if !withdrawals::lock_user(user_id, &mut tx).await? {
            tx.rollback().await?;
            return Err(BalanceError::UserNotFound(user_id));
        }
        let snapshot = withdrawals::balance_snapshot(user_id, &mut tx).await?;
        let available = snapshot.current();
        if !available.covers(withdrawal.amount) {
            tx.rollback().await?;
            debug!("🗃️ User #{user_id} has {available} available, which does not cover {}", withdrawal.amount);
            return Ok(WithdrawalResult::InsufficientFunds { available, requested: withdrawal.amount });
        }
        let record = withdrawals::insert_withdrawal(&withdrawal, &mut tx).await?;
        tx.commit().await?;
        Ok(WithdrawalResult::Accepted(record))
    }

    async fn fetch_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, BalanceError> {
        let mut conn = self.pool.acquire().await?;
        let withdrawals = withdrawals::fetch_withdrawals_for_user(user_id, &mut conn).await?;
        Ok(withdrawals)
    }
}

impl UserManagement for SqliteDatabase {
    async fn insert_user(&self, user: NewUser) -> Result<User, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        match users::insert_user(&user, &mut conn).await {
            Ok(user) => {
                debug!("🗃️ User #{} created for login {}", user.id, user.login);
                Ok(user)
            },
            Err(e) if is_unique_violation(&e) => Err(UserApiError::LoginTaken(user.login)),
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user_by_login(login, &mut conn).await?;
        Ok(user)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `BPL_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Applies the embedded schema migrations. Migrations that have already been applied are skipped.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
