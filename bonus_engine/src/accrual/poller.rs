//! The reconciliation poller.
//!
//! The poller wakes up every `poll_interval`, picks the oldest unresolved orders and asks the accrual authority about
//! each of them in turn. Reports are fed through [`crate::order_state::next_state`] and any resulting transition is
//! committed immediately, so one bad order never holds up the rest.
//!
//! When the authority throttles us, the [`RateLimitGate`] is closed until the requested delay has passed. The rest of
//! the batch is abandoned and every cycle until then is skipped without contacting the authority.
use std::time::Duration;

use log::*;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    accrual::{AccrualAuthority, AccrualClientError, AccrualReply, AccrualReport, MAX_RETRY_AFTER},
    db_types::Order,
    events::{EventProducers, OrderResolvedEvent},
    order_state::next_state,
    traits::OrderManagement,
};

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub request_timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(1), batch_size: 10, request_timeout: Duration::from_secs(5) }
    }
}

//--------------------------------------    RateLimitGate     ---------------------------------------------------------
/// The earliest time the authority may be contacted again. Owned by the poller task and never shared.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitGate {
    not_before: Option<Instant>,
}

impl RateLimitGate {
    pub fn is_open_at(&self, now: Instant) -> bool {
        self.not_before.map(|t| now >= t).unwrap_or(true)
    }

    /// Closes the gate until `until`. The gate only ever moves forward, so a shorter hold never cuts an existing one
    /// short.
    pub fn hold_until(&mut self, until: Instant) {
        match self.not_before {
            Some(t) if t >= until => {},
            _ => self.not_before = Some(until),
        }
    }

    /// Closes the gate for `delay` from `now`. Delays longer than [`MAX_RETRY_AFTER`] are clamped to it. Returns the
    /// time the gate reopens.
    pub fn hold_for(&mut self, now: Instant, delay: Duration) -> Option<Instant> {
        let delay = delay.min(MAX_RETRY_AFTER);
        match now.checked_add(delay) {
            Some(until) => self.hold_until(until),
            None => warn!("🕰️ Cannot hold the rate limit gate for {delay:?}. The clock would overflow"),
        }
        self.not_before
    }

    pub fn not_before(&self) -> Option<Instant> {
        self.not_before
    }
}

//--------------------------------------     CycleSummary     ---------------------------------------------------------
/// What happened during a single poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// The rate limit gate was closed, so the authority was not contacted at all.
    pub skipped: bool,
    /// Number of unresolved orders picked up for this cycle.
    pub selected: usize,
    /// Number of authority queries made.
    pub queried: usize,
    /// Number of orders whose state changed.
    pub transitioned: usize,
    /// The authority throttled us and the rest of the batch was abandoned.
    pub throttled: bool,
    /// Shutdown was requested part way through the batch.
    pub interrupted: bool,
}

//--------------------------------------     AccrualPoller    ---------------------------------------------------------
pub struct AccrualPoller<B, A> {
    db: B,
    authority: A,
    config: PollerConfig,
    producers: EventProducers,
    shutdown: CancellationToken,
}

impl<B, A> AccrualPoller<B, A>
where
    B: OrderManagement,
    A: AccrualAuthority,
{
    pub fn new(db: B, authority: A, config: PollerConfig, shutdown: CancellationToken) -> Self {
        Self { db, authority, config, producers: EventProducers::default(), shutdown }
    }

    /// Subscribers that are told about every order that reaches a terminal state.
    pub fn with_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Runs poll cycles until the shutdown token is cancelled.
    pub async fn run(self) {
        let mut gate = RateLimitGate::default();
        let mut timer = interval(self.config.poll_interval.max(Duration::from_millis(1)));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "🕰️ Accrual poller started. Polling every {:?}, {} orders at a time",
            self.config.poll_interval, self.config.batch_size
        );
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = timer.tick() => {},
            }
            let summary = self.run_cycle(&mut gate).await;
            if summary.transitioned > 0 || summary.throttled {
                debug!("🕰️ Poll cycle complete: {summary:?}");
            } else {
                trace!("🕰️ Poll cycle complete: {summary:?}");
            }
            if summary.interrupted {
                break;
            }
        }
        info!("🕰️ Accrual poller has shut down");
    }

    /// Runs a single reconciliation pass over the oldest unresolved orders.
    pub async fn run_cycle(&self, gate: &mut RateLimitGate) -> CycleSummary {
        let mut summary = CycleSummary::default();
        if !gate.is_open_at(Instant::now()) {
            trace!("🕰️ Authority is rate limiting us. Skipping this cycle");
            summary.skipped = true;
            return summary;
        }
        let orders = match self.db.fetch_unresolved_orders(self.config.batch_size).await {
            Ok(orders) => orders,
            Err(e) => {
                warn!("🕰️ Could not fetch unresolved orders: {e}. Will try again next cycle");
                return summary;
            },
        };
        summary.selected = orders.len();
        for order in orders {
            if self.shutdown.is_cancelled() {
                summary.interrupted = true;
                break;
            }
            // An in-flight query is never abandoned on shutdown. It is bounded by the request timeout instead.
            let reply = self.query(&order).await;
            summary.queried += 1;
            match reply {
                AccrualReply::Report(report) => {
                    if self.apply_report(&order, &report).await {
                        summary.transitioned += 1;
                    }
                },
                AccrualReply::NoInformation => {
                    trace!("🕰️ Authority has nothing on order {} yet", order.order_number);
                },
                AccrualReply::RateLimited(delay) => {
                    gate.hold_for(Instant::now(), delay);
                    info!("🕰️ Authority is rate limiting us. Pausing all queries for {:?}", delay.min(MAX_RETRY_AFTER));
                    summary.throttled = true;
                    break;
                },
                AccrualReply::Failure(reason) => {
                    warn!("🕰️ Could not reconcile order {}: {reason}", order.order_number);
                },
            }
        }
        summary
    }

    /// Asks the authority about the order, bounded by the request timeout. Transport errors and timeouts are
    /// reported as failures.
    async fn query(&self, order: &Order) -> AccrualReply {
        let deadline = self.config.request_timeout;
        match timeout(deadline, self.authority.query_order(&order.order_number)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => AccrualReply::Failure(e.to_string()),
            Err(_) => AccrualReply::Failure(AccrualClientError::Timeout(deadline).to_string()),
        }
    }

    /// Returns true if the order changed state.
    async fn apply_report(&self, order: &Order, report: &AccrualReport) -> bool {
        if report.order != order.order_number.as_str() {
            warn!("🕰️ Asked about order {} but the authority replied about {}", order.order_number, report.order);
        }
        let Some(resolution) = next_state(order.status, report) else {
            return false;
        };
        let number = &order.order_number;
        match self.db.update_order_resolution(number, resolution.status, resolution.accrual).await {
            Ok(Some(updated)) => {
                info!("🕰️ Order {number} moved from {} to {}", order.status, updated.status);
                if updated.status.is_terminal() {
                    self.producers.publish_order_resolved(OrderResolvedEvent::new(updated)).await;
                }
                true
            },
            Ok(None) => {
                debug!("🕰️ Order {number} was resolved elsewhere. Leaving it alone");
                false
            },
            Err(e) => {
                error!("🕰️ Could not save new state {} for order {number}: {e}", resolution.status);
                false
            },
        }
    }
}
