//! Page-object base for test flows: every interaction first lets the page
//! settle, then waits for its target, then acts.

use settle_core::{
    retry, wait_until_html_rendered, HarnessError, NetworkMonitor, PageDriver, WaitConfig,
};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

pub struct PageSession<D: PageDriver> {
    driver: D,
    network: NetworkMonitor,
    config: WaitConfig,
    base_url: String,
}

impl<D: PageDriver> PageSession<D> {
    pub fn new(driver: D, network: NetworkMonitor, base_url: impl Into<String>) -> Self {
        Self {
            driver,
            network,
            config: WaitConfig::default(),
            base_url: base_url.into(),
        }
    }

    pub fn with_config(mut self, config: WaitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    pub async fn navigate(&self, path: &str) -> Result<(), HarnessError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "navigating");
        self.driver.goto(&url).await?;
        self.wait_until_rendered(self.config.render_interval).await
    }

    pub async fn wait_for_idle_network(&self) -> Result<(), HarnessError> {
        self.network
            .wait_for_idle(self.config.idle_timeout, self.config.fail_timeout)
            .await
    }

    pub async fn wait_until_rendered(&self, interval: Duration) -> Result<(), HarnessError> {
        wait_until_html_rendered(&self.driver, interval).await
    }

    pub async fn wait_for_selector_and_click(&self, selector: &str) -> Result<(), HarnessError> {
        self.settle_on(selector, false).await?;
        self.driver.click(selector).await
    }

    pub async fn wait_for_visible_selector_and_click(
        &self,
        selector: &str,
    ) -> Result<(), HarnessError> {
        self.settle_on(selector, true).await?;
        self.driver.click(selector).await
    }

    pub async fn wait_for_selector_and_type(
        &self,
        selector: &str,
        text: &str,
    ) -> Result<(), HarnessError> {
        self.settle_on(selector, false).await?;
        self.driver.type_text(selector, text).await
    }

    pub async fn wait_for_selector_and_select(
        &self,
        selector: &str,
        value: &str,
    ) -> Result<(), HarnessError> {
        self.settle_on(selector, false).await?;
        self.driver.select_value(selector, value).await
    }

    /// Click something that may race the render cycle, e.g. a modal button.
    pub async fn click_with_retry(&self, selector: &str) -> Result<(), HarnessError> {
        let attempts = self.config.retry_attempts;
        retry(
            &self.driver,
            || self.wait_for_selector_and_click(selector),
            attempts,
        )
        .await
        .ok_or_else(|| {
            HarnessError::element_not_found(selector).with_context(serde_json::json!({
                "selector": selector,
                "attempts": attempts,
            }))
        })
    }

    /// Text of the first match, empty when nothing matches.
    pub async fn element_text(&self, selector: &str) -> Result<String, HarnessError> {
        Ok(self.driver.text_content(selector).await?.unwrap_or_default())
    }

    pub async fn has_element(&self, selector: &str) -> Result<bool, HarnessError> {
        self.wait_until_rendered(self.config.render_interval).await?;
        Ok(self.driver.text_content(selector).await?.is_some())
    }

    /// Run `trigger` and capture the body of the first response whose URL
    /// contains `url_fragment`, once that response has finished loading.
    pub async fn intercept_response<F, Fut>(
        &self,
        trigger: F,
        url_fragment: &str,
    ) -> Result<String, HarnessError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), HarnessError>>,
    {
        let mut subscription = self.network.subscribe();
        trigger().await?;

        let response = subscription
            .next_loaded_response(
                |r| r.url.contains(url_fragment),
                self.config.response_timeout,
            )
            .await?;
        let body = self.driver.response_body(&response.id).await?;
        info!(url = %response.url, status = response.status, "intercepted response");
        Ok(body)
    }

    async fn settle_on(&self, selector: &str, visible: bool) -> Result<(), HarnessError> {
        self.wait_until_rendered(self.config.render_interval).await?;
        self.driver
            .wait_for_selector(selector, visible, self.config.element_wait)
            .await
    }
}
