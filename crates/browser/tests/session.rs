use async_trait::async_trait;
use futures::channel::mpsc;
use settle_browser::PageSession;
use settle_core::{
    DocumentSource, ErrorCategory, HarnessError, NetworkEvent, NetworkMonitor, PageDriver,
    RequestId, WaitConfig,
};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

/// Driver that records every call and serves a fixed document.
#[derive(Default)]
struct RecordingDriver {
    calls: Mutex<Vec<String>>,
    /// How many selector waits fail before one succeeds
    missing_waits: Mutex<u32>,
    texts: Vec<(String, String)>,
}

impl RecordingDriver {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    /// Calls other than document samples.
    fn actions(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() != "content")
            .cloned()
            .collect()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl DocumentSource for RecordingDriver {
    async fn content(&self) -> Result<String, HarnessError> {
        self.record("content".to_string());
        Ok("<html><body>ready</body></html>".to_string())
    }
}

#[async_trait]
impl PageDriver for RecordingDriver {
    async fn goto(&self, url: &str) -> Result<(), HarnessError> {
        self.record(format!("goto {}", url));
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        visible: bool,
        _timeout: Duration,
    ) -> Result<(), HarnessError> {
        self.record(format!("wait {} visible={}", selector, visible));
        let mut missing = self.missing_waits.lock().unwrap();
        if *missing > 0 {
            *missing -= 1;
            return Err(HarnessError::element_not_found(selector));
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), HarnessError> {
        self.record(format!("click {}", selector));
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), HarnessError> {
        self.record(format!("type {} {}", selector, text));
        Ok(())
    }

    async fn select_value(&self, selector: &str, value: &str) -> Result<(), HarnessError> {
        self.record(format!("select {} {}", selector, value));
        Ok(())
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>, HarnessError> {
        Ok(self
            .texts
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, t)| t.clone()))
    }

    async fn response_body(&self, id: &RequestId) -> Result<String, HarnessError> {
        self.record(format!("body {}", id));
        Ok(format!("new-password-{}", id))
    }
}

fn session(driver: RecordingDriver) -> (mpsc::UnboundedSender<NetworkEvent>, PageSession<RecordingDriver>) {
    let (tx, rx) = mpsc::unbounded();
    let session = PageSession::new(driver, NetworkMonitor::spawn(rx), "http://frontend:3000");
    (tx, session)
}

#[tokio::test(start_paused = true)]
async fn navigate_prefixes_base_url_and_waits_for_render() {
    let (_tx, session) = session(RecordingDriver::default());

    session.navigate("/login").await.unwrap();

    assert_eq!(session.driver().actions(), vec!["goto http://frontend:3000/login"]);
    // Unchanged document settles after four samples.
    assert_eq!(session.driver().count("content"), 4);
}

#[tokio::test(start_paused = true)]
async fn interactions_wait_for_their_target_first() {
    let (_tx, session) = session(RecordingDriver::default());

    session
        .wait_for_selector_and_type("[data-test-subj='email-input']", "admin@example.com")
        .await
        .unwrap();
    session
        .wait_for_visible_selector_and_click("[data-test-subj='login-submit']")
        .await
        .unwrap();
    session
        .wait_for_selector_and_select("select[name='role']", "manager")
        .await
        .unwrap();

    assert_eq!(
        session.driver().actions(),
        vec![
            "wait [data-test-subj='email-input'] visible=false",
            "type [data-test-subj='email-input'] admin@example.com",
            "wait [data-test-subj='login-submit'] visible=true",
            "click [data-test-subj='login-submit']",
            "wait select[name='role'] visible=false",
            "select select[name='role'] manager",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn click_with_retry_outlasts_a_slow_modal() {
    let driver = RecordingDriver {
        missing_waits: Mutex::new(2),
        ..Default::default()
    };
    let (_tx, session) = session(driver);

    session
        .click_with_retry("[data-test-subj='confirmModalConfirmButton']")
        .await
        .unwrap();

    assert_eq!(session.driver().count("wait "), 3);
    assert_eq!(session.driver().count("click "), 1);
}

#[tokio::test(start_paused = true)]
async fn click_with_retry_gives_up_after_budget() {
    let driver = RecordingDriver {
        missing_waits: Mutex::new(u32::MAX),
        ..Default::default()
    };
    let (_tx, session) = session(driver);
    let session = session.with_config(WaitConfig::default().with_retry_attempts(3));

    let err = session
        .click_with_retry("[data-test-subj='confirmModalCancelButton']")
        .await
        .unwrap_err();

    assert_eq!(err.category, ErrorCategory::ElementNotFound);
    assert_eq!(session.driver().count("wait "), 3);
    assert_eq!(session.driver().count("click "), 0);
}

#[tokio::test(start_paused = true)]
async fn element_text_defaults_to_empty() {
    let driver = RecordingDriver {
        texts: vec![("[title='admin']".to_string(), "admin".to_string())],
        ..Default::default()
    };
    let (_tx, session) = session(driver);

    assert_eq!(session.element_text("[title='admin']").await.unwrap(), "admin");
    assert_eq!(session.element_text("[title='nobody']").await.unwrap(), "");
    assert!(session.has_element("[title='admin']").await.unwrap());
    assert!(!session.has_element("[title='nobody']").await.unwrap());
}

const RESET_URL: &str = "http://backend/api/admin/reset-user-password";

#[tokio::test(start_paused = true)]
async fn intercepts_the_body_of_a_matching_response() {
    let (tx, session) = session(RecordingDriver::default());

    let intercepted = session.intercept_response(
        || async {
            tx.unbounded_send(NetworkEvent::RequestStarted {
                id: RequestId::new("7"),
                url: RESET_URL.to_string(),
            })
            .unwrap();
            tx.unbounded_send(NetworkEvent::ResponseReceived {
                id: RequestId::new("7"),
                url: RESET_URL.to_string(),
                status: 200,
            })
            .unwrap();
            Ok(())
        },
        "reset-user-password",
    );

    let finish_later = async {
        sleep(Duration::from_millis(20)).await;
        // The response headers arrived but loading has not finished yet.
        assert!(session.driver().actions().is_empty());
        tx.unbounded_send(NetworkEvent::RequestFinished {
            id: RequestId::new("7"),
        })
        .unwrap();
    };

    let (body, ()) = tokio::join!(intercepted, finish_later);

    assert_eq!(body.unwrap(), "new-password-7");
    assert_eq!(session.driver().actions(), vec!["body 7"]);
}

#[tokio::test(start_paused = true)]
async fn failed_load_is_reported_without_reading_the_body() {
    let (tx, session) = session(RecordingDriver::default());

    let err = session
        .intercept_response(
            || async {
                tx.unbounded_send(NetworkEvent::ResponseReceived {
                    id: RequestId::new("9"),
                    url: RESET_URL.to_string(),
                    status: 200,
                })
                .unwrap();
                tx.unbounded_send(NetworkEvent::RequestFailed {
                    id: RequestId::new("9"),
                    error: "net::ERR_CONNECTION_RESET".to_string(),
                })
                .unwrap();
                Ok(())
            },
            "reset-user-password",
        )
        .await
        .unwrap_err();

    assert_eq!(err.category, ErrorCategory::Network);
    assert!(err.message.contains("ERR_CONNECTION_RESET"));
    assert!(session.driver().actions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn idle_network_uses_configured_timeouts() {
    let (tx, session) = session(RecordingDriver::default());
    let session = session.with_config(WaitConfig::default().with_fail_timeout(300));

    tx.unbounded_send(NetworkEvent::RequestStarted {
        id: RequestId::new("1"),
        url: "http://backend/api/notifications".to_string(),
    })
    .unwrap();

    let err = session.wait_for_idle_network().await.unwrap_err();
    assert_eq!(err.pending_requests(), Some(1));
    assert!(err.message.starts_with("After 300ms"));
}
