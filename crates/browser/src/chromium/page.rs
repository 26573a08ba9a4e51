use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chromiumoxide::cdp::browser_protocol::network::{
    GetResponseBodyParams, RequestId as CdpRequestId,
};
use chromiumoxide::page::Page;
use serde_json::json;
use settle_core::{
    to_harness_error, DocumentSource, HarnessError, NetworkMonitor, PageDriver, RequestId,
};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

use super::events::network_events;
use crate::shared::js;

/// [`PageDriver`] over a chromiumoxide tab.
pub struct ChromiumPage {
    page: Page,
    check_interval: Duration,
}

impl ChromiumPage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            check_interval: Duration::from_millis(100),
        }
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn inner(&self) -> &Page {
        &self.page
    }

    /// Start a monitor that tracks this tab's requests until it is dropped.
    pub async fn network_monitor(&self) -> Result<NetworkMonitor, HarnessError> {
        let events = network_events(&self.page).await?;
        Ok(NetworkMonitor::spawn(events))
    }

    async fn eval(&self, script: String, action: &str) -> Result<serde_json::Value, HarnessError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| to_harness_error(e, action))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }
}

fn is_context_loss(message: &str) -> bool {
    message.contains("Cannot find context") || message.contains("Execution context was destroyed")
}

#[async_trait]
impl DocumentSource for ChromiumPage {
    async fn content(&self) -> Result<String, HarnessError> {
        self.page
            .content()
            .await
            .map_err(|e| to_harness_error(e, "Content"))
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), HarnessError> {
        self.page.goto(url).await.map_err(|e| {
            HarnessError::navigation_error(format!("Navigate to {} failed: {}", url, e))
        })?;
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        visible: bool,
        timeout: Duration,
    ) -> Result<(), HarnessError> {
        let start = Instant::now();
        let script = js::build_js_call(js::element::CHECK_ELEMENT_STATE, &[json!(selector)]);

        loop {
            match self.page.evaluate(script.clone()).await {
                Ok(result) => {
                    let state = result.value().cloned().unwrap_or_default();
                    let exists = state.get("exists").and_then(|v| v.as_bool()).unwrap_or(false);
                    let shown = state.get("visible").and_then(|v| v.as_bool()).unwrap_or(false);
                    if exists && (!visible || shown) {
                        debug!(selector, "element ready");
                        return Ok(());
                    }
                }
                // Page is navigating; keep polling
                Err(e) if is_context_loss(&e.to_string()) => {}
                Err(e) => return Err(to_harness_error(e, "WaitForSelector")),
            }

            if start.elapsed() > timeout {
                let hint = if visible { "not visible" } else { "not found" };
                return Err(HarnessError::element_not_found(selector).with_context(json!({
                    "selector": selector,
                    "timeout_ms": timeout.as_millis() as u64,
                    "state": hint,
                })));
            }

            sleep(self.check_interval).await;
        }
    }

    async fn click(&self, selector: &str) -> Result<(), HarnessError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| HarnessError::element_not_found(selector))?;
        element
            .click()
            .await
            .map_err(|e| to_harness_error(e, "Click"))?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), HarnessError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| HarnessError::element_not_found(selector))?;
        element
            .click()
            .await
            .map_err(|e| to_harness_error(e, "Focus"))?
            .type_str(text)
            .await
            .map_err(|e| to_harness_error(e, "Type"))?;
        Ok(())
    }

    async fn select_value(&self, selector: &str, value: &str) -> Result<(), HarnessError> {
        let script =
            js::build_js_call(js::element::SELECT_OPTION, &[json!(selector), json!(value)]);
        let result = self.eval(script, "Select").await?;
        if result.get("success").and_then(|v| v.as_bool()) == Some(true) {
            Ok(())
        } else {
            Err(HarnessError::element_not_found(selector))
        }
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>, HarnessError> {
        let script = js::build_js_call(js::element::TEXT_CONTENT, &[json!(selector)]);
        let value = self.eval(script, "TextContent").await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn response_body(&self, id: &RequestId) -> Result<String, HarnessError> {
        let response = self
            .page
            .execute(GetResponseBodyParams::new(CdpRequestId::new(id.as_str())))
            .await
            .map_err(|e| to_harness_error(e, "GetResponseBody"))?;

        let body = &response.result;
        if !body.base64_encoded {
            return Ok(body.body.clone());
        }
        let bytes = STANDARD.decode(&body.body).map_err(|e| {
            HarnessError::network_error(format!("Response body for {} is not base64: {}", id, e))
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
