use std::time::Duration;

use bpl_common::{OrderNumber, Points};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The order statuses reported by the accrual authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthorityStatus {
    /// The order is registered, but the reward has not been calculated yet.
    Registered,
    /// The reward is being calculated.
    Processing,
    /// The order is not eligible for a reward. Final.
    Invalid,
    /// The reward has been calculated. Final.
    Processed,
    /// Anything this version of the engine does not recognise.
    #[serde(other)]
    Unknown,
}

/// The body of a successful authority reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualReport {
    pub order: String,
    pub status: AuthorityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
}

impl AccrualReport {
    pub fn new(order: &OrderNumber, status: AuthorityStatus) -> Self {
        Self { order: order.to_string(), status, accrual: None }
    }

    pub fn with_accrual(mut self, accrual: Points) -> Self {
        self.accrual = Some(accrual);
        self
    }
}

/// Everything the accrual authority can tell us about an order.
#[derive(Debug, Clone, PartialEq)]
pub enum AccrualReply {
    /// The authority has a status for the order.
    Report(AccrualReport),
    /// The authority does not know about the order yet.
    NoInformation,
    /// The authority is throttling us. No further queries may be made until the delay has passed.
    RateLimited(Duration),
    /// The authority failed, or replied with something unexpected.
    Failure(String),
}

#[derive(Debug, Clone, Error)]
pub enum AccrualClientError {
    #[error("Could not initialize the accrual client: {0}")]
    Initialization(String),
    #[error("Could not reach the accrual authority: {0}")]
    Transport(String),
    #[error("The accrual authority did not reply within {0:?}")]
    Timeout(Duration),
}

/// A source of truth for order accruals.
///
/// Implementations perform a single request-response exchange per call and never retry on their own; retry policy
/// belongs to the reconciliation poller.
#[allow(async_fn_in_trait)]
pub trait AccrualAuthority {
    async fn query_order(&self, number: &OrderNumber) -> Result<AccrualReply, AccrualClientError>;
}
