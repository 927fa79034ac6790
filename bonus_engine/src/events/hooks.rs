//! Wiring between the engine's event sources and user-supplied hooks.
//!
//! Register hooks on [`EventHooks`], turn them into [`EventHandlers`], hand [`EventHandlers::producers`] to the
//! components that publish events (the accrual poller), and then start the handlers. Each registered hook gets its own
//! channel and handler task.
//!
//! The handler tasks end once every producer has been dropped and their queued events have been handled, so awaiting
//! the returned [`JoinSet`] after the poller has stopped drains all outstanding events.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::task::JoinSet;

use crate::events::{EventHandler, EventProducer, Handler, OrderResolvedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_resolved_producer: Vec<EventProducer<OrderResolvedEvent>>,
}

impl EventProducers {
    /// Fans the event out to every subscribed hook.
    pub async fn publish_order_resolved(&self, event: OrderResolvedEvent) {
        for producer in &self.order_resolved_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order_resolved_producer.is_empty()
    }
}

pub struct EventHandlers {
    order_resolved: Vec<EventHandler<OrderResolvedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let order_resolved = hooks.on_order_resolved.into_iter().map(|f| EventHandler::new(buffer_size, f)).collect();
        Self { order_resolved }
    }

    pub fn producers(&self) -> EventProducers {
        let order_resolved_producer = self.order_resolved.iter().map(EventHandler::subscribe).collect();
        EventProducers { order_resolved_producer }
    }

    /// Spawns one task per registered hook. Await the returned set to wait for every handler to drain.
    pub fn start_handlers(self) -> JoinSet<()> {
        let mut tasks = JoinSet::new();
        debug!("📬️ Starting {} order resolution handlers", self.order_resolved.len());
        for handler in self.order_resolved {
            tasks.spawn(handler.start_handler());
        }
        tasks
    }
}

/// The hooks to run when engine events fire. Any number of hooks may be registered per event.
#[derive(Default, Clone)]
pub struct EventHooks {
    on_order_resolved: Vec<Handler<OrderResolvedEvent>>,
}

impl EventHooks {
    /// Registers an async hook that runs every time an order reaches `Accrued` or `Rejected`.
    pub fn on_order_resolved<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(OrderResolvedEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_order_resolved
            .push(Arc::new(move |ev| Box::pin(f(ev)) as Pin<Box<dyn Future<Output = ()> + Send>>));
        self
    }

    pub fn order_resolved_hook_count(&self) -> usize {
        self.on_order_resolved.len()
    }
}
