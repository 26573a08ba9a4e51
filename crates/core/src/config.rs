use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing knobs for the settle primitives and the page helpers built on them.
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Continuous quiet period required before the network counts as idle
    pub idle_timeout: Duration,
    /// Upper bound on any idle-network wait
    pub fail_timeout: Duration,
    /// Sampling interval for the DOM-stability poller
    pub render_interval: Duration,
    pub element_wait: Duration,
    pub check_interval: Duration,
    pub retry_attempts: u32,
    pub response_timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(500),
            fail_timeout: Duration::from_millis(10000),
            render_interval: Duration::from_millis(50),
            element_wait: Duration::from_millis(3000),
            check_interval: Duration::from_millis(100),
            retry_attempts: 5,
            response_timeout: Duration::from_millis(10000),
        }
    }
}

impl WaitConfig {
    pub fn with_idle_timeout(mut self, ms: u64) -> Self {
        self.idle_timeout = Duration::from_millis(ms);
        self
    }

    pub fn with_fail_timeout(mut self, ms: u64) -> Self {
        self.fail_timeout = Duration::from_millis(ms);
        self
    }

    pub fn with_render_interval(mut self, ms: u64) -> Self {
        self.render_interval = Duration::from_millis(ms);
        self
    }

    pub fn with_element_wait(mut self, ms: u64) -> Self {
        self.element_wait = Duration::from_millis(ms);
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn fast() -> Self {
        Self {
            idle_timeout: Duration::from_millis(250),
            fail_timeout: Duration::from_millis(5000),
            render_interval: Duration::from_millis(25),
            element_wait: Duration::from_millis(2000),
            check_interval: Duration::from_millis(50),
            retry_attempts: 3,
            response_timeout: Duration::from_millis(5000),
        }
    }

    pub fn patient() -> Self {
        Self {
            idle_timeout: Duration::from_millis(1000),
            fail_timeout: Duration::from_millis(30000),
            render_interval: Duration::from_millis(150),
            element_wait: Duration::from_millis(7000),
            check_interval: Duration::from_millis(250),
            retry_attempts: 30,
            response_timeout: Duration::from_millis(30000),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport_width: Option<u32>,
    pub viewport_height: Option<u32>,
    /// Extra command line switches passed to the browser
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: Some(2000),
            viewport_height: Some(1200),
            args: vec![
                "--disable-infobars".to_string(),
                "--no-sandbox".to_string(),
                "--no-zygote".to_string(),
                "--allow-insecure-localhost".to_string(),
            ],
        }
    }
}
