use std::fmt::Debug;

use bpl_common::OrderNumber;
use log::*;

use crate::{
    db_types::Order,
    ledger_api::order_objects::SubmitOrderResult,
    traits::{InsertOrderResult, OrderManagement, OrderManagementError},
};

/// `OrderFlowApi` handles order submissions from users and the queries that go with them.
///
/// Orders are only ever created here. Moving them through their lifecycle is the job of the
/// [`crate::accrual::AccrualPoller`].
pub struct OrderFlowApi<B> {
    db: B,
}

impl<B: Debug> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?})", self.db)
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Submits an order number on behalf of `user_id`.
    ///
    /// Order numbers are bound to whoever submits them first. Resubmitting your own order is harmless, and is reported
    /// as [`SubmitOrderResult::AlreadySubmitted`].
    pub async fn submit_order(
        &self,
        user_id: i64,
        number: &OrderNumber,
    ) -> Result<SubmitOrderResult, OrderManagementError> {
        let result = match self.db.insert_order(user_id, number).await? {
            InsertOrderResult::Inserted(order) => {
                info!("🔄️ Order {number} accepted for user #{user_id}");
                SubmitOrderResult::Accepted(order)
            },
            InsertOrderResult::AlreadyExists(order) if order.user_id == user_id => {
                debug!("🔄️ User #{user_id} resubmitted order {number}");
                SubmitOrderResult::AlreadySubmitted(order)
            },
            InsertOrderResult::AlreadyExists(_) => {
                info!("🔄️ User #{user_id} tried to submit order {number}, which belongs to another user");
                SubmitOrderResult::OwnedByAnotherUser
            },
        };
        Ok(result)
    }

    /// All of the user's orders, newest first.
    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderManagementError> {
        let orders = self.db.fetch_orders_for_user(user_id).await?;
        trace!("🔄️ {} orders found for user #{user_id}", orders.len());
        Ok(orders)
    }

    pub async fn order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderManagementError> {
        self.db.fetch_order_by_number(number).await
    }
}
