use bpl_common::{OrderNumber, Points};
use thiserror::Error;

use crate::{
    db_types::{Order, OrderStatusType},
    traits::InsertOrderResult,
};

#[derive(Debug, Clone, Error)]
pub enum OrderManagementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
}

impl From<sqlx::Error> for OrderManagementError {
    fn from(e: sqlx::Error) -> Self {
        OrderManagementError::DatabaseError(e.to_string())
    }
}

/// The `OrderManagement` trait defines the order-related behaviour a ledger backend must support.
///
/// Order numbers are unique across all users. Once recorded, an order is bound to its first owner forever and is never
/// deleted. Only the reconciliation poller changes an order after it has been inserted.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Records a new order for `user_id` in the `Intake` state.
    ///
    /// If an order with this number already exists, nothing is written and the existing order is returned as
    /// [`InsertOrderResult::AlreadyExists`]. This holds under concurrent submissions of the same number.
    async fn insert_order(&self, user_id: i64, number: &OrderNumber) -> Result<InsertOrderResult, OrderManagementError>;

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderManagementError>;

    /// All orders for the user, newest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderManagementError>;

    /// Up to `limit` orders in the `Intake` or `Pending` state, oldest first.
    async fn fetch_unresolved_orders(&self, limit: i64) -> Result<Vec<Order>, OrderManagementError>;

    /// Moves an unresolved order to `status`, recording `accrual` alongside it.
    ///
    /// Orders that are already in a terminal state are left untouched, in which case `None` is returned.
    async fn update_order_resolution(
        &self,
        number: &OrderNumber,
        status: OrderStatusType,
        accrual: Option<Points>,
    ) -> Result<Option<Order>, OrderManagementError>;
}
