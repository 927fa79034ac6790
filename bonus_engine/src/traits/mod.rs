//! # Ledger store interfaces
//!
//! The traits in this module define the behaviour a database backend must expose in order to act as the store for
//! the bonus points ledger.
//!
//! * [`LedgerDatabase`] ties the others together and is what the process wires up at startup.
//! * [`OrderManagement`] records orders and moves them through the order state machine.
//! * [`BalanceManagement`] derives balances and performs the withdrawal transaction.
//! * [`UserManagement`] stores user records.
mod balance_management;
mod data_objects;
mod ledger_database;
mod order_management;
mod user_management;

pub use balance_management::{BalanceError, BalanceManagement};
pub use data_objects::{InsertOrderResult, WithdrawalResult};
pub use ledger_database::LedgerDatabase;
pub use order_management::{OrderManagement, OrderManagementError};
pub use user_management::{UserApiError, UserManagement};
