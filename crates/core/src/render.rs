//! DOM-size stability polling.
//!
//! Single-page apps keep re-rendering after their last response lands, so
//! network idleness alone does not mean the page is done. The poller samples
//! the serialized document until its length stops changing.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument};

use crate::driver::DocumentSource;
use crate::error::HarnessError;

pub const RENDER_CEILING: Duration = Duration::from_secs(10);
pub const MIN_STABLE_SAMPLES: usize = 3;

/// What a poll observed. Reaching the ceiling is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOutcome {
    pub samples: usize,
    pub stable_samples: usize,
    pub last_length: usize,
}

#[derive(Debug, Clone)]
pub struct RenderPoller {
    ceiling: Duration,
    min_stable_samples: usize,
}

impl Default for RenderPoller {
    fn default() -> Self {
        Self {
            ceiling: RENDER_CEILING,
            min_stable_samples: MIN_STABLE_SAMPLES,
        }
    }
}

impl RenderPoller {
    pub fn new(ceiling: Duration, min_stable_samples: usize) -> Self {
        Self {
            ceiling,
            min_stable_samples,
        }
    }

    /// Number of samples a poll at `interval` may take.
    pub fn max_samples(&self, interval: Duration) -> usize {
        let interval_ms = interval.as_millis().max(1);
        ((self.ceiling.as_millis() / interval_ms) as usize).max(1)
    }

    #[instrument(skip(self, page))]
    pub async fn poll<D>(&self, page: &D, interval: Duration) -> Result<RenderOutcome, HarnessError>
    where
        D: DocumentSource + ?Sized,
    {
        let max_samples = self.max_samples(interval);
        let mut last_length = 0;
        let mut stable_samples = 0;
        let mut samples = 0;

        while samples < max_samples {
            let length = page.content().await?.len();
            samples += 1;

            if last_length != 0 && length == last_length {
                stable_samples += 1;
            } else {
                stable_samples = 0;
            }

            if stable_samples >= self.min_stable_samples {
                debug!(samples, length, "document stable");
                return Ok(RenderOutcome {
                    samples,
                    stable_samples,
                    last_length: length,
                });
            }

            last_length = length;
            sleep(interval).await;
        }

        debug!(samples, last_length, "render ceiling reached, continuing anyway");
        Ok(RenderOutcome {
            samples,
            stable_samples,
            last_length,
        })
    }
}

/// Wait until the document length holds still for three samples, or ten seconds pass.
pub async fn wait_until_html_rendered<D>(page: &D, interval: Duration) -> Result<(), HarnessError>
where
    D: DocumentSource + ?Sized,
{
    RenderPoller::default().poll(page, interval).await.map(|_| ())
}
