use crate::db_types::Order;

/// The outcome of an order submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOrderResult {
    /// The order is new and has been recorded in the `Intake` state.
    Accepted(Order),
    /// The same user submitted this order number before. Nothing changed.
    AlreadySubmitted(Order),
    /// The order number belongs to someone else. Nothing changed, and nothing about the owner is revealed.
    OwnedByAnotherUser,
}
