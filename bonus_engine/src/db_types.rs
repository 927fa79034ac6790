use std::{fmt::Display, str::FromStr};

use bpl_common::{OrderNumber, Points, PointsError};
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------        User           -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub login: String,
    /// The password hash, as produced by the authentication layer. The engine never inspects it.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn new<S: Into<String>>(login: S, password_hash: S) -> Self {
        Self { login: login.into(), password_hash: password_hash.into() }
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The lifecycle of a submitted order.
///
/// ```text
///   Intake ──► Pending ──► Accrued  (terminal)
///      │          │
///      └──────────┴──────► Rejected (terminal)
/// ```
///
/// The serialized names are the ones the loyalty system's public API reports to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// Submitted by the user, and not yet acknowledged by the accrual authority.
    #[serde(rename = "NEW")]
    Intake,
    /// The accrual authority knows about the order and is still computing the reward.
    #[serde(rename = "PROCESSING")]
    Pending,
    /// The reward has been finalized. Counts towards the user's balance.
    #[serde(rename = "PROCESSED")]
    Accrued,
    /// The accrual authority determined that the order is not eligible for a reward.
    #[serde(rename = "INVALID")]
    Rejected,
}

impl OrderStatusType {
    /// Statuses that the reconciliation poller still needs to resolve.
    pub const UNRESOLVED: [OrderStatusType; 2] = [OrderStatusType::Intake, OrderStatusType::Pending];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accrued | Self::Rejected)
    }

    /// Whether the state machine permits moving from `self` to `next`. Remaining in the same state is not a
    /// transition.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!((self, next), (Intake, Pending | Accrued | Rejected) | (Pending, Accrued | Rejected))
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Intake => write!(f, "Intake"),
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Accrued => write!(f, "Accrued"),
            OrderStatusType::Rejected => write!(f, "Rejected"),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Intake");
            OrderStatusType::Intake
        })
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Intake" => Ok(Self::Intake),
            "Pending" => Ok(Self::Pending),
            "Accrued" => Ok(Self::Accrued),
            "Rejected" => Ok(Self::Rejected),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Order {
    #[serde(skip)]
    pub id: i64,
    #[serde(rename = "number")]
    pub order_number: OrderNumber,
    #[serde(skip)]
    pub user_id: i64,
    pub status: OrderStatusType,
    /// The reward for the order. Only ever set once the order is `Accrued`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
    #[serde(rename = "uploaded_at")]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      Withdrawal      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Withdrawal {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    /// The order the points were spent on. This is a label only; it need not match any submitted order.
    #[serde(rename = "order")]
    pub order_number: OrderNumber,
    #[serde(rename = "sum")]
    pub amount: Points,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWithdrawal {
    pub user_id: i64,
    pub order_number: OrderNumber,
    pub amount: Points,
}

impl NewWithdrawal {
    /// Creates a new withdrawal request. The amount must be finite and strictly positive.
    pub fn new(user_id: i64, order_number: OrderNumber, amount: f64) -> Result<Self, PointsError> {
        let amount = Points::try_positive(amount)?;
        Ok(Self { user_id, order_number, amount })
    }
}

//--------------------------------------       Balance        ---------------------------------------------------------
/// The raw totals that a balance is derived from, read in a single consistent statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, FromRow)]
pub struct BalanceSnapshot {
    pub accrued_total: Points,
    pub withdrawn_total: Points,
}

impl BalanceSnapshot {
    pub fn current(&self) -> Points {
        self.accrued_total - self.withdrawn_total
    }
}

/// A user's spendable balance. This is never stored; it is always derived from the orders and withdrawals tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Balance {
    pub current: Points,
    pub withdrawn: Points,
}

impl From<BalanceSnapshot> for Balance {
    fn from(snapshot: BalanceSnapshot) -> Self {
        Self { current: snapshot.current(), withdrawn: snapshot.withdrawn_total }
    }
}
