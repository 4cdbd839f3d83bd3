//! Customer-facing notices raised while validating carts.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// How the storefront should present a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocks the action that raised it.
    #[default]
    Error,
    /// Informational.
    Notice,
    /// Confirms a completed action.
    Success,
}

impl Severity {
    /// Returns a human-readable name for this severity.
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Notice => "notice",
            Severity::Success => "success",
        }
    }
}

/// A single message queued for the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
}

/// Receives notices for display to the customer.
pub trait NotificationSink {
    fn notify(&self, message: &str, severity: Severity);
}

/// Collects notices for one request.
#[derive(Debug, Default)]
pub struct NoticeBuffer {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of notices collected so far.
    pub fn len(&self) -> usize {
        self.notices.lock().map(|n| n.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drains the collected notices.
    pub fn take(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|mut n| std::mem::take(&mut *n))
            .unwrap_or_default()
    }
}

impl NotificationSink for NoticeBuffer {
    fn notify(&self, message: &str, severity: Severity) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(Notice {
                message: message.to_string(),
                severity,
            });
        }
    }
}
