//! Violation broadcast.
//!
//! Pages queue a [`ViolationNotification`] and return immediately. The
//! [`ObserverService`] drains the queue on its own execution context and
//! hands each notification to every registered [`Observer`] under
//! [`VIOLATION_TOPIC`].

use parking_lot::RwLock;
use serde::Serialize;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Topic under which violations are broadcast.
pub const VIOLATION_TOPIC: &str = "xss-on-violate-policy";

/// Default capacity of the notification queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// What observers learn about a violation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ViolationNotification {
    /// Policy label, e.g. `"Inline Script"`.
    pub policy: String,
    /// The offending script text or URL.
    pub content: String,
    /// URL of the page the violation happened on.
    pub uri: String,
    /// Whether the load was cancelled.
    pub block_mode: bool,
}

impl ViolationNotification {
    /// The ordered `(policy, content, uri, block_mode)` payload.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!([self.policy, self.content, self.uri, self.block_mode])
    }

    /// A violation report object.
    pub fn to_report(&self) -> serde_json::Value {
        serde_json::json!({
            "xss-report": {
                "document-uri": self.uri,
                "violated-policy": self.policy,
                "content": self.content,
                "block-mode": self.block_mode,
            }
        })
    }
}

/// Receiver of broadcast notifications.
pub trait Observer: Send + Sync {
    fn observe(&self, topic: &str, notification: &ViolationNotification);
}

/// Sending half of the notification queue. Cheap to clone; one per page is fine.
#[derive(Clone, Debug)]
pub struct NotificationSender {
    tx: mpsc::Sender<ViolationNotification>,
}

impl NotificationSender {
    /// Queue a notification without waiting. Returns false if it was dropped
    /// because the queue is full or the service has stopped.
    pub fn dispatch(&self, notification: ViolationNotification) -> bool {
        match self.tx.try_send(notification) {
            Ok(()) => true,
            Err(TrySendError::Full(n)) => {
                tracing::warn!(target: "xss", "Notification queue full, dropping {} report for {}", n.policy, n.uri);
                false
            }
            Err(TrySendError::Closed(n)) => {
                tracing::warn!(target: "xss", "Observer service stopped, dropping {} report for {}", n.policy, n.uri);
                false
            }
        }
    }
}

/// Create a bounded notification queue.
pub fn notification_queue(
    capacity: usize,
) -> (NotificationSender, mpsc::Receiver<ViolationNotification>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (NotificationSender { tx }, rx)
}

/// Registry of observers, run on the coordination context.
#[derive(Default)]
pub struct ObserverService {
    observers: RwLock<Vec<Arc<dyn Observer>>>,
}

impl ObserverService {
    /// Create a service with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    pub fn add_observer(&self, observer: Arc<dyn Observer>) {
        self.observers.write().push(observer);
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Deliver one notification to every observer, on the calling context.
    pub fn notify_observers(&self, topic: &str, notification: &ViolationNotification) {
        tracing::debug!(target: "xss", "Sending observer notification for {}", notification.uri);
        for observer in self.observers.read().iter() {
            observer.observe(topic, notification);
        }
    }

    /// Start a dedicated coordination thread. It exits once every
    /// [`NotificationSender`] has been dropped and the queue is drained.
    pub fn spawn(
        self: &Arc<Self>,
        capacity: usize,
    ) -> io::Result<(NotificationSender, JoinHandle<()>)> {
        let (sender, mut rx) = notification_queue(capacity);
        let service = Arc::clone(self);

        let handle = thread::Builder::new()
            .name("xss-notifier".to_string())
            .spawn(move || {
                while let Some(notification) = rx.blocking_recv() {
                    service.notify_observers(VIOLATION_TOPIC, &notification);
                }
                tracing::debug!(target: "xss", "Notification queue closed");
            })?;

        Ok((sender, handle))
    }

    /// Drain `rx` as a task on an existing async runtime.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<ViolationNotification>) {
        while let Some(notification) = rx.recv().await {
            self.notify_observers(VIOLATION_TOPIC, &notification);
        }
    }
}
