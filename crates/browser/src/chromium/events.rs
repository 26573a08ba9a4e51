use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    EventResponseReceived,
};
use chromiumoxide::page::Page;
use futures::stream::{self, BoxStream, StreamExt};
use settle_core::{to_harness_error, HarnessError, NetworkEvent, RequestId};

/// Merge the page's CDP network lifecycle events into one stream.
pub async fn network_events(page: &Page) -> Result<BoxStream<'static, NetworkEvent>, HarnessError> {
    page.execute(EnableParams::default())
        .await
        .map_err(|e| to_harness_error(e, "Network.enable"))?;

    let started = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(|e| to_harness_error(e, "Listen requestWillBeSent"))?
        .map(|e| NetworkEvent::RequestStarted {
            id: RequestId::new(e.request_id.inner().clone()),
            url: e.request.url.clone(),
        });

    let responded = page
        .event_listener::<EventResponseReceived>()
        .await
        .map_err(|e| to_harness_error(e, "Listen responseReceived"))?
        .map(|e| NetworkEvent::ResponseReceived {
            id: RequestId::new(e.request_id.inner().clone()),
            url: e.response.url.clone(),
            status: u16::try_from(e.response.status).unwrap_or(0),
        });

    let finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .map_err(|e| to_harness_error(e, "Listen loadingFinished"))?
        .map(|e| NetworkEvent::RequestFinished {
            id: RequestId::new(e.request_id.inner().clone()),
        });

    let failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(|e| to_harness_error(e, "Listen loadingFailed"))?
        .map(|e| NetworkEvent::RequestFailed {
            id: RequestId::new(e.request_id.inner().clone()),
            error: e.error_text.clone(),
        });

    Ok(stream::select_all(vec![
        started.boxed(),
        responded.boxed(),
        finished.boxed(),
        failed.boxed(),
    ])
    .boxed())
}
