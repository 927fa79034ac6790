use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

//--------------------------------------     OrderNumber       -------------------------------------------------------
/// A user-supplied order number.
///
/// An `OrderNumber` can only be built from a non-empty string of ASCII digits that passes the Luhn checksum, so any
/// value of this type has already been validated. Values read back from the database are trusted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderNumberError {
    #[error("Order number is empty")]
    Empty,
    #[error("Order number may only contain digits: {0}")]
    NotNumeric(String),
    #[error("Order number {0} fails the checksum")]
    InvalidChecksum(String),
}

impl OrderNumber {
    /// Builds a valid order number from `payload` by appending the Luhn check digit.
    pub fn from_payload(payload: &str) -> Result<Self, OrderNumberError> {
        check_digits(payload)?;
        let sum = luhn_sum(payload, true);
        let check = (10 - sum % 10) % 10;
        Ok(Self(format!("{payload}{check}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_digits(s)?;
        if luhn_sum(s, false) % 10 != 0 {
            return Err(OrderNumberError::InvalidChecksum(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = OrderNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderNumber> for String {
    fn from(value: OrderNumber) -> Self {
        value.0
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn check_digits(s: &str) -> Result<(), OrderNumberError> {
    if s.is_empty() {
        return Err(OrderNumberError::Empty);
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OrderNumberError::NotNumeric(s.to_string()));
    }
    Ok(())
}

/// Luhn sum of the digits in `s`, walking from the right. When `double_first` is true the rightmost digit is doubled,
/// which is what a payload without its check digit needs.
fn luhn_sum(s: &str, double_first: bool) -> u32 {
    s.bytes()
        .rev()
        .map(|b| u32::from(b - b'0'))
        .enumerate()
        .map(|(i, d)| {
            let double = (i % 2 == 0) == double_first;
            match (double, d * 2) {
                (true, d2) if d2 > 9 => d2 - 9,
                (true, d2) => d2,
                (false, _) => d,
            }
        })
        .sum()
}
