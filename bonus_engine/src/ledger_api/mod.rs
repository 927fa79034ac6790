//! The public face of the ledger, consumed by the request layer.
//!
//! * [`OrderFlowApi`] accepts order submissions and enforces order-number ownership.
//! * [`BalanceApi`] reports balances and runs withdrawals.
//! * [`UserApi`] stores and looks up user records.
pub mod balance_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod user_api;
