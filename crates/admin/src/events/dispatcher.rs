//! Fan-out of change events to registered handlers.
//!
//! One dispatcher consumes the subscription; handlers are synchronous
//! and run in registration order for each event.

use haberdash_core::PaymentStatus;

use crate::platform::types::ChangeEvent;

use super::Subscription;

/// A registered consumer of change events.
pub trait ChangeHandler: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// React to one event. Handlers must not block.
    fn handle(&mut self, event: &ChangeEvent);
}

/// Dispatches each event from a subscription to every handler.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Vec<Box<dyn ChangeHandler>>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; it sees every subsequent event.
    pub fn register(&mut self, handler: Box<dyn ChangeHandler>) {
        tracing::debug!(handler = handler.name(), "Registered change handler");
        self.handlers.push(handler);
    }

    /// Consume the subscription until the feed closes.
    pub async fn run(mut self, mut subscription: Subscription) {
        while let Some(event) = subscription.next().await {
            for handler in &mut self.handlers {
                handler.handle(&event);
            }
        }
        tracing::info!("Change feed closed, dispatcher stopping");
    }
}

/// Warns when a variant's availability hits zero, so merchandising can
/// restock or pull the listing before shoppers hit inventory rejections.
pub struct StockDepletionMonitor;

impl ChangeHandler for StockDepletionMonitor {
    fn name(&self) -> &'static str {
        "stock-depletion-monitor"
    }

    fn handle(&mut self, event: &ChangeEvent) {
        if let ChangeEvent::Inventory {
            variant_id,
            available,
            ..
        } = event
            && *available <= 0
        {
            tracing::warn!(variant_id = %variant_id, "Variant sold out");
        }
    }
}

/// Logs order payment transitions from the feed.
pub struct OrderPaymentLogger;

impl ChangeHandler for OrderPaymentLogger {
    fn name(&self) -> &'static str {
        "order-payment-logger"
    }

    fn handle(&mut self, event: &ChangeEvent) {
        if let ChangeEvent::Orders {
            order_id,
            payment_status,
            ..
        } = event
        {
            match payment_status {
                PaymentStatus::Paid => {
                    tracing::info!(order_id = %order_id, "Order paid");
                }
                PaymentStatus::Expired | PaymentStatus::Refunded => {
                    tracing::info!(order_id = %order_id, status = ?payment_status, "Order closed without capture");
                }
                PaymentStatus::Pending => {}
            }
        }
    }
}
