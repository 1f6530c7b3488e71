//! Change-event subscriptions over the platform's audit feed.
//!
//! A subscription is a channel yielding a sequence of typed
//! [`ChangeEvent`]s, fed by a background poller. Cancellation is simply
//! releasing the [`Subscription`] handle: dropping it aborts the poller,
//! and the poller stops on its own if the receiver goes away first.

pub mod dispatcher;

pub use dispatcher::{ChangeHandler, Dispatcher, OrderPaymentLogger, StockDepletionMonitor};

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::platform::types::ChangeEvent;
use crate::platform::{AdminPlatformApi, AdminPlatformClient};

/// How many events may sit in the channel before the poller backs off.
const CHANNEL_CAPACITY: usize = 64;

/// A live subscription to the audit feed.
pub struct Subscription {
    rx: mpsc::Receiver<ChangeEvent>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Wrap an already-spawned poller and its channel.
    #[must_use]
    pub const fn new(rx: mpsc::Receiver<ChangeEvent>, task: JoinHandle<()>) -> Self {
        Self { rx, task }
    }

    /// Receive the next event, or `None` once the feed has closed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start polling the audit feed and return the subscription handle.
#[must_use]
pub fn subscribe(platform: AdminPlatformClient, interval: Duration) -> Subscription {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let task = tokio::spawn(poll_changes(platform, interval, tx));
    Subscription::new(rx, task)
}

/// The poll loop feeding a subscription.
///
/// Resumes from the highest cursor seen; feed errors are logged and the
/// next tick retries. Returns when the receiving side of the channel is
/// released.
pub async fn poll_changes<P: AdminPlatformApi>(
    platform: P,
    interval: Duration,
    tx: mpsc::Sender<ChangeEvent>,
) {
    let mut cursor = 0u64;

    loop {
        match platform.changes_since(cursor).await {
            Ok(events) => {
                for event in events {
                    cursor = cursor.max(event.cursor());
                    if tx.send(event).await.is_err() {
                        // Subscription handle released; stop polling.
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, cursor, "Change feed poll failed");
            }
        }

        tokio::time::sleep(interval).await;
    }
}
