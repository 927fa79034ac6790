use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Points        ---------------------------------------------------------
/// An amount of bonus points. Accruals and withdrawals are both expressed in points.
///
/// Points are fractional, so any decision that could overdraw a balance must go through [`Points::covers`], which
/// applies the fixed [`Points::EPSILON`] tolerance.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Points(f64);

op!(binary Points, Add, add);
op!(binary Points, Sub, sub);
op!(inplace Points, AddAssign, add_assign);
op!(inplace Points, SubAssign, sub_assign);
op!(unary Points, Neg, neg);

impl Sum for Points {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PointsError {
    #[error("Amount must be a finite number, but got {0}")]
    NotFinite(f64),
    #[error("Amount must be strictly positive, but got {0}")]
    NotPositive(f64),
}

impl From<f64> for Points {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl Display for Points {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0.2}pts", self.0)
    }
}

impl Points {
    /// Tolerance used when comparing balances against requested amounts.
    pub const EPSILON: f64 = 1e-9;

    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Validates an amount supplied by a caller. Only finite, strictly positive amounts can be withdrawn.
    pub fn try_positive(value: f64) -> Result<Self, PointsError> {
        if !value.is_finite() {
            return Err(PointsError::NotFinite(value));
        }
        if value <= 0.0 {
            return Err(PointsError::NotPositive(value));
        }
        Ok(Self(value))
    }

    /// True if this balance is large enough to pay `amount`, allowing for floating point error.
    pub fn covers(&self, amount: Points) -> bool {
        self.0 + Self::EPSILON >= amount.0
    }

    /// True if the value is below zero by more than the comparison tolerance.
    pub fn is_overdrawn(&self) -> bool {
        self.0 < -Self::EPSILON
    }
}
