//! # Bonus points ledger server
//!
//! This crate hosts the ledger process. It is responsible for:
//! * Reading the configuration from the environment.
//! * Opening the ledger database and bringing its schema up to date.
//! * Running the accrual poller, which reconciles submitted orders against the external accrual system.
//! * Shutting everything down cleanly on Ctrl-C.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
pub mod accrual_worker;
pub mod cli;
pub mod config;
pub mod errors;
pub mod server;
