//! Violation reporting.

use crate::observer::{NotificationSender, ViolationNotification};
use networking::{CancelReason, HttpChannel};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// The operation a violation was detected in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    InlineScript,
    ExternalScript,
    JsUrl,
    EventListener,
    BaseElement,
    Object,
    DataUrl,
    JsAction,
}

impl PolicyKind {
    /// Label used in console messages and notifications.
    pub fn label(&self) -> &'static str {
        match self {
            PolicyKind::InlineScript => "Inline Script",
            PolicyKind::ExternalScript => "External Script",
            PolicyKind::JsUrl => "JS URL",
            PolicyKind::EventListener => "Event Listener",
            PolicyKind::BaseElement => "Base Element",
            PolicyKind::Object => "Object",
            PolicyKind::DataUrl => "Data URL",
            PolicyKind::JsAction => "JS Action",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A detected violation, with the filter flags as they were at detection.
#[derive(Clone, Debug)]
pub struct Violation {
    pub policy: PolicyKind,
    /// The offending script text or resource URL.
    pub content: String,
    /// The page the violation happened on.
    pub uri: Url,
    pub report_only: bool,
    pub block_mode: bool,
}

impl Violation {
    /// Line written to the developer console.
    pub fn console_message(&self) -> String {
        format!("XSS Violation on URL {}: {}", self.uri, self.policy)
    }

    /// Notification sent to observers.
    pub fn to_notification(&self) -> ViolationNotification {
        ViolationNotification {
            policy: self.policy.label().to_string(),
            content: self.content.clone(),
            uri: self.uri.to_string(),
            block_mode: self.block_mode,
        }
    }
}

/// Developer console sink.
pub trait Console: Send + Sync {
    fn log_string_message(&self, message: &str);
}

/// Console that writes through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingConsole;

impl Console for TracingConsole {
    fn log_string_message(&self, message: &str) {
        tracing::warn!(target: "console", "{}", message);
    }
}

/// Bounded in-memory console.
pub struct ConsoleBuffer {
    entries: Mutex<VecDeque<String>>,
    max_entries: usize,
}

impl ConsoleBuffer {
    /// Create a console keeping at most `max_entries` messages.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_entries,
        }
    }

    /// Logged messages, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Number of buffered messages.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Console for ConsoleBuffer {
    fn log_string_message(&self, message: &str) {
        let mut entries = self.entries.lock();
        entries.push_back(message.to_string());
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
    }
}

impl Default for ConsoleBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Fans a violation out to the console, the observer queue and the channel.
#[derive(Clone)]
pub struct ViolationReporter {
    console: Arc<dyn Console>,
    notifier: Option<NotificationSender>,
}

impl ViolationReporter {
    /// Create a reporter writing to `console` and queueing on `notifier`.
    pub fn new(console: Arc<dyn Console>, notifier: Option<NotificationSender>) -> Self {
        Self { console, notifier }
    }

    /// Reporter that only logs through `tracing` and broadcasts nothing.
    pub fn tracing_only() -> Self {
        Self::new(Arc::new(TracingConsole), None)
    }

    /// Report `violation`.
    ///
    /// The console line is written and the notification queued before this
    /// returns; observers see it later on their own context. In block mode
    /// the load on `channel` is cancelled before returning.
    pub fn report(&self, violation: &Violation, channel: Option<&dyn HttpChannel>) {
        let disposition = if violation.report_only { "reported" } else { "enforced" };
        tracing::debug!(target: "xss", "Violation ({}): {} on {}", disposition, violation.policy, violation.uri);

        self.console.log_string_message(&violation.console_message());

        match &self.notifier {
            Some(notifier) => {
                notifier.dispatch(violation.to_notification());
            }
            None => tracing::debug!(target: "xss", "No observer service, skipping notification"),
        }

        if violation.block_mode {
            match channel {
                Some(channel) => channel.cancel(CancelReason::XssBlocked),
                None => tracing::warn!(target: "xss", "Block mode active but {} has no channel to cancel", violation.uri),
            }
        }
    }
}

impl Default for ViolationReporter {
    fn default() -> Self {
        Self::tracing_only()
    }
}

impl fmt::Debug for ViolationReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViolationReporter")
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::notification_queue;
    use networking::{ChannelStatus, HeaderMap, LoadChannel, Request};

    fn violation(block_mode: bool) -> Violation {
        Violation {
            policy: PolicyKind::InlineScript,
            content: "alert(1)".to_string(),
            uri: Url::parse("https://example.com/?q=alert(1)").unwrap(),
            report_only: false,
            block_mode,
        }
    }

    #[test]
    fn test_policy_labels() {
        assert_eq!(PolicyKind::JsUrl.label(), "JS URL");
        assert_eq!(PolicyKind::Object.to_string(), "Object");
        assert_eq!(PolicyKind::JsAction.label(), "JS Action");
    }

    #[test]
    fn test_console_message() {
        assert_eq!(
            violation(false).console_message(),
            "XSS Violation on URL https://example.com/?q=alert(1): Inline Script"
        );
    }

    #[test]
    fn test_console_buffer_is_bounded() {
        let console = ConsoleBuffer::new(2);
        console.log_string_message("one");
        console.log_string_message("two");
        console.log_string_message("three");

        assert_eq!(console.messages(), vec!["two", "three"]);
        assert_eq!(console.len(), 2);
    }

    #[test]
    fn test_report_fans_out() {
        let console = Arc::new(ConsoleBuffer::default());
        let (sender, mut rx) = notification_queue(4);
        let reporter = ViolationReporter::new(console.clone(), Some(sender));
        let channel = LoadChannel::new(
            Request::get(Url::parse("https://example.com/?q=alert(1)").unwrap()),
            HeaderMap::new(),
        );

        reporter.report(&violation(true), Some(&channel));

        assert_eq!(console.len(), 1);
        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.policy, "Inline Script");
        assert_eq!(notification.content, "alert(1)");
        assert!(notification.block_mode);
        assert_eq!(channel.status(), ChannelStatus::Cancelled(CancelReason::XssBlocked));
    }

    #[test]
    fn test_report_without_block_mode_keeps_load() {
        let reporter = ViolationReporter::new(Arc::new(ConsoleBuffer::default()), None);
        let channel = LoadChannel::new(
            Request::get(Url::parse("https://example.com/").unwrap()),
            HeaderMap::new(),
        );

        reporter.report(&violation(false), Some(&channel));

        assert_eq!(channel.status(), ChannelStatus::Active);
    }
}
