//! Page-settling primitives for browser-driven tests: wait for the network to
//! go quiet, wait for the DOM to stop changing, and retry racy interactions.

pub mod config;
pub mod driver;
pub mod error;
pub mod network;
pub mod render;
pub mod retry;

pub use config::{BrowserConfig, WaitConfig};
pub use driver::{DocumentSource, PageDriver};
pub use error::{to_harness_error, ErrorCategory, HarnessError};
pub use network::{NetworkEvent, NetworkMonitor, NetworkSubscription, RequestId, ResponseInfo};
pub use render::{wait_until_html_rendered, RenderOutcome, RenderPoller};
pub use retry::{retry, retry_with, RetryPolicy};
