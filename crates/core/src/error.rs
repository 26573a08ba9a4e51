use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Error categories for programmatic handling by harness callers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network never settled, response never arrived
    Network,
    /// Element not found or selector issues
    ElementNotFound,
    /// JavaScript execution errors
    ScriptExecution,
    /// Navigation or page load errors
    Navigation,
    /// Browser/driver errors
    Browser,
    /// A bounded wait ran out
    Timeout,
}

/// Structured error with context for debugging flaky page interactions
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("[{category:?}] {message}")]
pub struct HarnessError {
    pub category: ErrorCategory,
    pub message: String,
    /// Optional context (selector, url, pending request count, ...)
    pub context: serde_json::Value,
    /// Whether retrying the same interaction may succeed
    pub recoverable: bool,
}

impl HarnessError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            context: serde_json::json!({}),
            recoverable: false,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    pub fn recoverable(mut self) -> Self {
        self.recoverable = true;
        self
    }

    /// The network did not stay quiet long enough before `waited` ran out.
    pub fn network_busy(waited: Duration, pending: usize) -> Self {
        let waited_ms = waited.as_millis();
        Self::new(
            ErrorCategory::Timeout,
            format!(
                "After {}ms, there are still {} pending network requests.",
                waited_ms, pending
            ),
        )
        .with_context(serde_json::json!({
            "fail_timeout_ms": waited_ms as u64,
            "pending_requests": pending,
        }))
        .recoverable()
    }

    pub fn timeout_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Timeout, message).recoverable()
    }

    pub fn element_not_found(selector: impl Into<String>) -> Self {
        let selector = selector.into();
        Self::new(
            ErrorCategory::ElementNotFound,
            format!("Element not found: {}", selector),
        )
        .with_context(serde_json::json!({ "selector": selector }))
        .recoverable()
    }

    pub fn network_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Network, message).recoverable()
    }

    pub fn script_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::ScriptExecution, message)
    }

    pub fn navigation_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Navigation, message).recoverable()
    }

    pub fn browser_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Browser, message)
    }

    /// Pending request count recorded by [`HarnessError::network_busy`].
    pub fn pending_requests(&self) -> Option<usize> {
        self.context
            .get("pending_requests")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
    }
}

/// Classify a driver failure by its message.
pub fn to_harness_error(e: impl std::fmt::Display, action: &str) -> HarnessError {
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        HarnessError::timeout_error(format!("{} timed out: {}", action, s))
    } else if lower.contains("navigation") {
        HarnessError::navigation_error(format!("{} navigation failed: {}", action, s))
    } else if lower.contains("not found") || lower.contains("could not find node") {
        HarnessError::element_not_found(format!("{}: {}", action, s))
    } else {
        HarnessError::browser_error(format!("{} failed: {}", action, s))
    }
}
