//! Reconciliation of locally known orders against the external accrual authority.
//!
//! * [`AccrualAuthority`] is the seam to the authority. [`AccrualHttpClient`] is the production implementation.
//! * [`AccrualPoller`] is the background task that asks the authority about unresolved orders and moves them through
//!   the order state machine.
mod authority;
mod http_client;
mod poller;

pub use authority::{AccrualAuthority, AccrualClientError, AccrualReply, AccrualReport, AuthorityStatus};
pub use http_client::{interpret, AccrualHttpClient, DEFAULT_RETRY_AFTER, MAX_RETRY_AFTER};
pub use poller::{AccrualPoller, CycleSummary, PollerConfig, RateLimitGate};
