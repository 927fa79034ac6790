use std::time::Duration;

use bonus_engine::{
    accrual::{AccrualReply, AccrualReport, AuthorityStatus},
    db_types::OrderStatusType,
    traits::WithdrawalResult,
    SubmitOrderResult,
};
use bpl_common::{OrderNumber, Points};
use cucumber::{given, then, when};
use log::*;

use crate::cucumber::LedgerWorld;

fn order_number(s: &str) -> OrderNumber {
    s.parse().unwrap_or_else(|e| panic!("{s} is not a valid order number: {e}"))
}

fn authority_status(s: &str) -> AuthorityStatus {
    match s {
        "REGISTERED" => AuthorityStatus::Registered,
        "PROCESSING" => AuthorityStatus::Processing,
        "INVALID" => AuthorityStatus::Invalid,
        "PROCESSED" => AuthorityStatus::Processed,
        _ => AuthorityStatus::Unknown,
    }
}

fn assert_points(actual: Points, expected: f64, what: &str) {
    assert!((actual.value() - expected).abs() < 1e-6, "Expected {what} of {expected}, but got {actual}");
}

//--------------------------------------        Orders        ---------------------------------------------------------
#[when(expr = "'{word}' submits order {word}")]
async fn submit_order(world: &mut LedgerWorld, login: String, number: String) {
    let system = world.system_mut();
    let user_id = system.user_id(&login);
    let result = system.orders().submit_order(user_id, &order_number(&number)).await.expect("Error submitting order");
    debug!("🚀️ {login} submitted {number}: {result:?}");
    system.last_submission = Some(result);
}

#[then(expr = "the submission is {word}")]
async fn check_submission(world: &mut LedgerWorld, outcome: String) {
    let result = world.system().last_submission.as_ref().expect("Nothing has been submitted");
    let ok = match outcome.as_str() {
        "accepted" => matches!(result, SubmitOrderResult::Accepted(_)),
        "resubmitted" => matches!(result, SubmitOrderResult::AlreadySubmitted(_)),
        "refused" => matches!(result, SubmitOrderResult::OwnedByAnotherUser),
        other => panic!("Unknown submission outcome: {other}"),
    };
    assert!(ok, "Expected the submission to be {outcome}, but got {result:?}");
}

#[then(expr = "'{word}' has {int} order(s)")]
async fn check_order_count(world: &mut LedgerWorld, login: String, count: usize) {
    let system = world.system();
    let orders = system.orders().orders_for_user(system.user_id(&login)).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count);
}

#[then(expr = "order {word} is {word}")]
async fn check_order_status(world: &mut LedgerWorld, number: String, status: String) {
    let expected = status.parse::<OrderStatusType>().expect("Not a valid order status");
    let order = world
        .system()
        .orders()
        .order_by_number(&order_number(&number))
        .await
        .expect("Error fetching order")
        .expect("Order does not exist");
    assert_eq!(order.status, expected);
}

//--------------------------------------       Balances       ---------------------------------------------------------
#[then(expr = "'{word}' has a balance of {float} with {float} withdrawn")]
async fn check_balance(world: &mut LedgerWorld, login: String, current: f64, withdrawn: f64) {
    let system = world.system();
    let balance = system.balances().balance(system.user_id(&login)).await.expect("Error fetching balance");
    assert_points(balance.current, current, "a current balance");
    assert_points(balance.withdrawn, withdrawn, "a withdrawn total");
}

#[when(expr = "'{word}' withdraws {float} points against order {word}")]
async fn withdraw(world: &mut LedgerWorld, login: String, amount: f64, number: String) {
    let system = world.system_mut();
    let user_id = system.user_id(&login);
    let result =
        system.balances().withdraw(user_id, order_number(&number), amount).await.expect("Error processing withdrawal");
    system.last_withdrawal = Some(result);
}

#[when(expr = "'{word}' withdraws {float} and {float} points at the same time")]
async fn concurrent_withdrawals(world: &mut LedgerWorld, login: String, first: f64, second: f64) {
    let system = world.system_mut();
    let user_id = system.user_id(&login);
    let api = system.balances();
    let (a, b) = tokio::join!(
        api.withdraw(user_id, order_number("2377225624"), first),
        api.withdraw(user_id, order_number("79927398713"), second),
    );
    let (a, b) = (a.expect("Error processing withdrawal"), b.expect("Error processing withdrawal"));
    assert!(!(a.is_accepted() && b.is_accepted()), "Both withdrawals went through: {a:?} / {b:?}");
    system.last_withdrawal = Some(if a.is_accepted() { b } else { a });
}

#[then(expr = "the withdrawal is {word}")]
async fn check_withdrawal(world: &mut LedgerWorld, outcome: String) {
    let result = world.system().last_withdrawal.as_ref().expect("No withdrawal has been made");
    let ok = match outcome.as_str() {
        "accepted" => matches!(result, WithdrawalResult::Accepted(_)),
        "refused" => matches!(result, WithdrawalResult::InsufficientFunds { .. }),
        other => panic!("Unknown withdrawal outcome: {other}"),
    };
    assert!(ok, "Expected the withdrawal to be {outcome}, but got {result:?}");
}

//--------------------------------------    Reconciliation    ---------------------------------------------------------
#[given(expr = "the authority reports order {word} as {word} with {float} points")]
async fn authority_reports_with_accrual(world: &mut LedgerWorld, number: String, status: String, points: f64) {
    let number = order_number(&number);
    let report = AccrualReport::new(&number, authority_status(&status)).with_accrual(Points::from(points));
    world.system().authority.set_reply(&number, AccrualReply::Report(report));
}

#[given(expr = "the authority reports order {word} as {word}")]
async fn authority_reports(world: &mut LedgerWorld, number: String, status: String) {
    let number = order_number(&number);
    let report = AccrualReport::new(&number, authority_status(&status));
    world.system().authority.set_reply(&number, AccrualReply::Report(report));
}

#[given(expr = "the authority is rate limiting for {int}ms")]
async fn authority_throttles(world: &mut LedgerWorld, ms: u64) {
    world.system().authority.set_throttle(Some(Duration::from_millis(ms)));
}

#[given("the authority stops rate limiting")]
async fn authority_stops_throttling(world: &mut LedgerWorld) {
    world.system().authority.set_throttle(None);
}

#[when(expr = "the poller runs {int} cycle(s)")]
async fn run_cycles(world: &mut LedgerWorld, cycles: usize) {
    let system = world.system_mut();
    for _ in 0..cycles {
        let summary = system.poller.run_cycle(&mut system.gate).await;
        debug!("🚀️ Poll cycle: {summary:?}");
    }
}

#[then(expr = "the authority has been asked {int} time(s)")]
async fn check_authority_calls(world: &mut LedgerWorld, calls: usize) {
    assert_eq!(world.system().authority.calls(), calls);
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut LedgerWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
