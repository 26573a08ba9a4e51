//! Idle-network detection over a page's request lifecycle events.
//!
//! A [`NetworkMonitor`] is created once per page and listens for the whole
//! page lifetime. Every call to [`NetworkMonitor::wait_for_idle`] observes the
//! same pending-request state, so concurrent waiters settle together.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, instrument, warn};

use crate::error::HarnessError;

const EVENT_BUFFER: usize = 256;
const SETTLED_EARLY_LIMIT: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request lifecycle events emitted by a browser tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkEvent {
    RequestStarted { id: RequestId, url: String },
    ResponseReceived { id: RequestId, url: String, status: u16 },
    RequestFinished { id: RequestId },
    RequestFailed { id: RequestId, error: String },
}

impl NetworkEvent {
    pub fn request_id(&self) -> &RequestId {
        match self {
            NetworkEvent::RequestStarted { id, .. }
            | NetworkEvent::ResponseReceived { id, .. }
            | NetworkEvent::RequestFinished { id }
            | NetworkEvent::RequestFailed { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInfo {
    pub id: RequestId,
    pub url: String,
    pub status: u16,
}

#[derive(Debug, Clone, Copy, Default)]
struct Activity {
    pending: usize,
}

/// Long-lived listener over one page's network events.
pub struct NetworkMonitor {
    activity: watch::Receiver<Activity>,
    fanout: broadcast::Sender<NetworkEvent>,
    listener: JoinHandle<()>,
}

impl NetworkMonitor {
    /// Start listening. Must be called from within a tokio runtime.
    pub fn spawn<S>(events: S) -> Self
    where
        S: Stream<Item = NetworkEvent> + Send + 'static,
    {
        let (activity_tx, activity) = watch::channel(Activity::default());
        let (fanout, _) = broadcast::channel(EVENT_BUFFER);
        let listener = tokio::spawn(listen(Box::pin(events), activity_tx, fanout.clone()));

        Self {
            activity,
            fanout,
            listener,
        }
    }

    pub fn pending_requests(&self) -> usize {
        self.activity.borrow().pending
    }

    pub fn subscribe(&self) -> NetworkSubscription {
        NetworkSubscription {
            events: self.fanout.subscribe(),
        }
    }

    /// Resolve once no request has been pending for a full `idle_timeout`.
    ///
    /// Any request start restarts the quiet period. Fails once `fail_timeout`
    /// elapses, reporting how many requests were still pending.
    #[instrument(skip(self))]
    pub async fn wait_for_idle(
        &self,
        idle_timeout: Duration,
        fail_timeout: Duration,
    ) -> Result<(), HarnessError> {
        let mut activity = self.activity.clone();

        let settle = async move {
            loop {
                let pending = activity.borrow_and_update().pending;
                if pending > 0 {
                    if activity.changed().await.is_err() {
                        // Listener is gone with requests in flight; only the fail timer can end this.
                        std::future::pending::<()>().await;
                    }
                    continue;
                }

                let quiet = sleep(idle_timeout);
                tokio::pin!(quiet);
                tokio::select! {
                    _ = &mut quiet => return,
                    changed = activity.changed() => {
                        if changed.is_err() {
                            quiet.await;
                            return;
                        }
                        debug!("network activity interrupted quiet period");
                    }
                }
            }
        };

        match timeout(fail_timeout, settle).await {
            Ok(()) => {
                debug!("network idle");
                Ok(())
            }
            Err(_) => {
                let pending = self.pending_requests();
                warn!(pending, "network did not settle");
                Err(HarnessError::network_busy(fail_timeout, pending))
            }
        }
    }

    /// First response matching `predicate` observed after this call.
    pub async fn wait_for_response<F>(
        &self,
        predicate: F,
        wait: Duration,
    ) -> Result<ResponseInfo, HarnessError>
    where
        F: FnMut(&ResponseInfo) -> bool,
    {
        self.subscribe().next_response(predicate, wait).await
    }

    /// Resolve once `quiet` has passed since the latest response.
    ///
    /// At least one response has to arrive after the call.
    #[instrument(skip(self))]
    pub async fn wait_for_response_lull(
        &self,
        quiet: Duration,
        fail_timeout: Duration,
    ) -> Result<(), HarnessError> {
        let mut sub = self.subscribe();
        let lull = async move {
            if sub.recv_response(|_| true).await.is_none() {
                std::future::pending::<()>().await;
            }
            while let Ok(next) = timeout(quiet, sub.recv_response(|_| true)).await {
                if next.is_none() {
                    break;
                }
            }
        };

        timeout(fail_timeout, lull).await.map_err(|_| {
            HarnessError::network_error(format!(
                "No {}ms response lull within {}ms",
                quiet.as_millis(),
                fail_timeout.as_millis()
            ))
        })
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Receiver of every event the monitor sees from the moment of subscription.
pub struct NetworkSubscription {
    events: broadcast::Receiver<NetworkEvent>,
}

impl NetworkSubscription {
    pub async fn recv(&mut self) -> Option<NetworkEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "network subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub async fn next_response<F>(
        &mut self,
        predicate: F,
        wait: Duration,
    ) -> Result<ResponseInfo, HarnessError>
    where
        F: FnMut(&ResponseInfo) -> bool,
    {
        match timeout(wait, self.recv_response(predicate)).await {
            Ok(Some(response)) => Ok(response),
            Ok(None) => Err(HarnessError::network_error(
                "Network event stream closed before a matching response",
            )),
            Err(_) => Err(HarnessError::timeout_error(format!(
                "No matching response within {}ms",
                wait.as_millis()
            ))),
        }
    }

    /// Like [`NetworkSubscription::next_response`], but only resolves once the
    /// matched request has finished loading, so its body can be read.
    pub async fn next_loaded_response<F>(
        &mut self,
        mut predicate: F,
        wait: Duration,
    ) -> Result<ResponseInfo, HarnessError>
    where
        F: FnMut(&ResponseInfo) -> bool,
    {
        let loaded = async {
            // Finish events can overtake the response they belong to.
            let mut finished: HashSet<RequestId> = HashSet::new();
            let mut matched: Option<ResponseInfo> = None;

            while let Some(event) = self.recv().await {
                match event {
                    NetworkEvent::ResponseReceived { id, url, status } if matched.is_none() => {
                        let response = ResponseInfo { id, url, status };
                        if !predicate(&response) {
                            continue;
                        }
                        if finished.contains(&response.id) {
                            return Ok(response);
                        }
                        matched = Some(response);
                    }
                    NetworkEvent::RequestFinished { id } => {
                        if let Some(response) = matched.take_if(|m| m.id == id) {
                            return Ok(response);
                        }
                        finished.insert(id);
                    }
                    NetworkEvent::RequestFailed { id, error } => {
                        if let Some(response) = matched.take_if(|m| m.id == id) {
                            return Err(HarnessError::network_error(format!(
                                "Loading {} failed: {}",
                                response.url, error
                            ))
                            .with_context(serde_json::json!({
                                "request": id.as_str(),
                                "url": response.url,
                            })));
                        }
                    }
                    _ => {}
                }
            }

            Err(HarnessError::network_error(
                "Network event stream closed before a matching response finished loading",
            ))
        };

        timeout(wait, loaded).await.map_err(|_| {
            HarnessError::timeout_error(format!(
                "No matching response finished loading within {}ms",
                wait.as_millis()
            ))
        })?
    }

    async fn recv_response<F>(&mut self, mut predicate: F) -> Option<ResponseInfo>
    where
        F: FnMut(&ResponseInfo) -> bool,
    {
        while let Some(event) = self.recv().await {
            if let NetworkEvent::ResponseReceived { id, url, status } = event {
                let response = ResponseInfo { id, url, status };
                if predicate(&response) {
                    return Some(response);
                }
            }
        }
        None
    }
}

/// Requests in flight, plus completions that overtook their own start.
///
/// Event kinds may be delivered out of order relative to each other, so a
/// finish for an unknown id is remembered and cancels the matching start.
#[derive(Default)]
struct PendingRequests {
    in_flight: HashSet<RequestId>,
    settled_early: HashSet<RequestId>,
    settled_order: VecDeque<RequestId>,
}

impl PendingRequests {
    fn len(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns false when the start was already cancelled by an early completion.
    fn start(&mut self, id: &RequestId) -> bool {
        if self.settled_early.remove(id) {
            self.settled_order.retain(|settled| settled != id);
            return false;
        }
        self.in_flight.insert(id.clone());
        true
    }

    /// Returns true when `id` was in flight.
    fn settle(&mut self, id: &RequestId) -> bool {
        if self.in_flight.remove(id) {
            return true;
        }
        if self.settled_early.insert(id.clone()) {
            self.settled_order.push_back(id.clone());
            if self.settled_order.len() > SETTLED_EARLY_LIMIT {
                if let Some(oldest) = self.settled_order.pop_front() {
                    self.settled_early.remove(&oldest);
                }
            }
        }
        false
    }
}

async fn listen(
    mut events: Pin<Box<dyn Stream<Item = NetworkEvent> + Send>>,
    activity: watch::Sender<Activity>,
    fanout: broadcast::Sender<NetworkEvent>,
) {
    let mut pending = PendingRequests::default();

    while let Some(event) = events.next().await {
        match &event {
            NetworkEvent::RequestStarted { id, url } => {
                if pending.start(id) {
                    let count = pending.len();
                    debug!(request = %id, %url, pending = count, "request started");
                    activity.send_modify(|a| a.pending = count);
                } else {
                    debug!(request = %id, %url, "request already completed");
                }
            }
            NetworkEvent::RequestFinished { id } => {
                release(&mut pending, id, &activity);
            }
            NetworkEvent::RequestFailed { id, error } => {
                warn!(request = %id, %error, "request failed");
                release(&mut pending, id, &activity);
            }
            NetworkEvent::ResponseReceived { id, url, status } => {
                debug!(request = %id, %url, status, "response received");
            }
        }
        // No subscribers is fine.
        let _ = fanout.send(event);
    }

    debug!(pending = pending.len(), "network event stream ended");
}

fn release(pending: &mut PendingRequests, id: &RequestId, activity: &watch::Sender<Activity>) {
    if !pending.settle(id) {
        return;
    }
    let count = pending.len();
    if count == 0 {
        debug!(request = %id, "network went idle");
    }
    activity.send_modify(|a| a.pending = count);
}
