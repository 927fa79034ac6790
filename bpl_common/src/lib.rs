mod order_number;
mod points;

pub mod helpers;
pub mod op;

pub use order_number::{OrderNumber, OrderNumberError};
pub use points::{Points, PointsError};
