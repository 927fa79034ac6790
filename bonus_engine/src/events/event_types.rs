use crate::db_types::{Order, OrderStatusType};

/// Published once an order reaches a terminal state, i.e. `Accrued` or `Rejected`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderResolvedEvent {
    pub order: Order,
}

impl OrderResolvedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }

    pub fn status(&self) -> OrderStatusType {
        self.order.status
    }
}
