use async_trait::async_trait;
use std::time::Duration;

use crate::error::HarnessError;
use crate::network::RequestId;

/// Anything that can hand out the current serialized document.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn content(&self) -> Result<String, HarnessError>;
}

/// Page-level capabilities the session helpers need from a browser driver.
#[async_trait]
pub trait PageDriver: DocumentSource {
    async fn goto(&self, url: &str) -> Result<(), HarnessError>;

    /// Resolve once `selector` matches (and is visible, if asked) or fail after `timeout`.
    async fn wait_for_selector(
        &self,
        selector: &str,
        visible: bool,
        timeout: Duration,
    ) -> Result<(), HarnessError>;

    async fn click(&self, selector: &str) -> Result<(), HarnessError>;

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), HarnessError>;

    async fn select_value(&self, selector: &str, value: &str) -> Result<(), HarnessError>;

    /// Text content of the first match, `None` when nothing matches.
    async fn text_content(&self, selector: &str) -> Result<Option<String>, HarnessError>;

    async fn response_body(&self, id: &RequestId) -> Result<String, HarnessError>;
}
