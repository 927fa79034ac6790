//! The order state machine.
//!
//! Orders only ever move forward, and only in response to what the accrual authority reports:
//!
//! | Authority reports         | Current `Intake` | Current `Pending` | Current `Accrued`/`Rejected` |
//! |---------------------------|------------------|-------------------|------------------------------|
//! | `REGISTERED`/`PROCESSING` | `Pending`        | no change         | no change                    |
//! | `INVALID`                 | `Rejected`       | `Rejected`        | no change                    |
//! | `PROCESSED` + amount      | `Accrued`        | `Accrued`         | no change                    |
//! | anything else             | no change        | no change         | no change                    |
//!
//! A `PROCESSED` report without an amount is final as far as the authority is concerned, so the order is accrued with
//! a zero reward rather than being polled forever. A negative or non-finite amount is treated as garbage.
use bpl_common::Points;
use log::*;

use crate::{
    accrual::{AccrualReport, AuthorityStatus},
    db_types::OrderStatusType,
};

/// The new state of an order after applying an authority report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub status: OrderStatusType,
    pub accrual: Option<Points>,
}

impl Resolution {
    fn pending() -> Self {
        Self { status: OrderStatusType::Pending, accrual: None }
    }

    fn rejected() -> Self {
        Self { status: OrderStatusType::Rejected, accrual: None }
    }

    fn accrued(amount: Points) -> Self {
        Self { status: OrderStatusType::Accrued, accrual: Some(amount) }
    }
}

/// Works out where an order in state `current` should move to, given the authority's `report`.
///
/// Returns `None` when nothing needs to be written.
pub fn next_state(current: OrderStatusType, report: &AccrualReport) -> Option<Resolution> {
    if current.is_terminal() {
        trace!("🔄️ Order {} is already {current}. Ignoring {:?} report", report.order, report.status);
        return None;
    }
    let resolution = match (report.status, report.accrual) {
        (AuthorityStatus::Registered | AuthorityStatus::Processing, _) => Resolution::pending(),
        (AuthorityStatus::Invalid, _) => Resolution::rejected(),
        (AuthorityStatus::Processed, Some(amount)) if amount.value().is_finite() && amount.value() >= 0.0 => {
            Resolution::accrued(amount)
        },
        (AuthorityStatus::Processed, Some(amount)) => {
            warn!("🔄️ Authority reported an impossible accrual of {amount} for order {}. Ignoring.", report.order);
            return None;
        },
        (AuthorityStatus::Processed, None) => {
            warn!("🔄️ Order {} was processed without an accrual amount. Accruing zero points.", report.order);
            Resolution::accrued(Points::zero())
        },
        (AuthorityStatus::Unknown, _) => {
            debug!("🔄️ Unrecognised authority status for order {}. Will retry later.", report.order);
            return None;
        },
    };
    current.can_transition_to(resolution.status).then_some(resolution)
}
