//! Bonus Points Ledger engine
//!
//! Users submit order numbers, an external accrual authority decides how many bonus points each order earns, and users
//! spend their points through withdrawals. This library holds the consistency rules for all of that:
//!
//! 1. Database management and control ([`mod@sqlite`] and [`mod@traits`]). The store is the only shared mutable state in
//!    the system. SQLite is the supported backend. The data types stored in the database live in [`mod@db_types`].
//! 2. The public ledger API (`OrderFlowApi`, `BalanceApi`, `UserApi`), consumed by the request layer.
//! 3. Reconciliation ([`mod@accrual`]). A background poller asks the accrual authority about unresolved orders and
//!    moves them through the order state machine in [`mod@order_state`].
//!
//! The engine publishes an event whenever an order reaches a terminal state. See [`mod@events`] for how to hook into it.
mod db;

pub mod accrual;
pub mod db_types;
pub mod events;
mod ledger_api;
pub mod order_state;
pub mod traits;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{self, SqliteDatabase, SqliteDatabaseError};
pub use ledger_api::{
    balance_api::{BalanceApi, MAX_WITHDRAWAL_ATTEMPTS},
    order_flow_api::OrderFlowApi,
    order_objects::{self, SubmitOrderResult},
    user_api::UserApi,
};
