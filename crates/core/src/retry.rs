use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::driver::DocumentSource;
use crate::render::wait_until_html_rendered;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Render-wait interval between a failed attempt and the next one
    pub render_interval: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts,
            render_interval: Duration::from_millis(50),
        }
    }
}

/// Run `action` up to `attempts` times, returning the first success.
///
/// Failures are swallowed; between attempts the page is given a chance to
/// finish rendering. `None` means every attempt failed.
pub async fn retry<D, F, Fut, T, E>(page: &D, action: F, attempts: u32) -> Option<T>
where
    D: DocumentSource + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_with(page, action, &RetryPolicy::new(attempts)).await
}

pub async fn retry_with<D, F, Fut, T, E>(page: &D, mut action: F, policy: &RetryPolicy) -> Option<T>
where
    D: DocumentSource + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    for attempt in 1..=policy.attempts {
        match action().await {
            Ok(value) => return Some(value),
            Err(e) => {
                debug!(attempt, attempts = policy.attempts, error = %e, "attempt failed");
                if attempt == policy.attempts {
                    break;
                }
                if let Err(e) = wait_until_html_rendered(page, policy.render_interval).await {
                    debug!(error = %e, "render wait between attempts failed");
                }
            }
        }
    }

    debug!(attempts = policy.attempts, "retry budget exhausted");
    None
}
