// SPDX-License-Identifier: Apache-2.0

//! Scripted transport for tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::{FetchRequest, FetchResponse, TileTransport};
use crate::error::FetchError;

type MockResult = Result<FetchResponse, FetchError>;

/// Mock transport answering from a script.
///
/// Responses are consumed first in, first out. Once the queue is empty the
/// fallback (if any) answers every request.
///
/// # Example
///
/// ```
/// use tilewatch_core::transport::{FetchRequest, MockTransport, TileTransport};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mock = MockTransport::new();
/// mock.push_payload(json!([{"id": "apicatalog"}]));
///
/// let response = mock.fetch(&FetchRequest::get("http://catalog/containers")).await.unwrap();
/// assert_eq!(response.payload[0]["id"], "apicatalog");
/// assert_eq!(mock.call_count(), 1);
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    fallback: Arc<Mutex<Option<MockResult>>>,
    calls: Arc<Mutex<Vec<FetchRequest>>>,
    in_flight: Arc<AtomicUsize>,
}

enum MockResponse {
    Immediate(MockResult),
    /// Held back until the paired sender fires or is dropped.
    Triggered {
        response: MockResult,
        trigger: oneshot::Receiver<()>,
    },
}

impl MockTransport {
    /// Create a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn push_response(&self, response: MockResult) {
        self.responses
            .lock()
            .push_back(MockResponse::Immediate(response));
    }

    /// Queue a 200 response carrying `payload`.
    pub fn push_payload(&self, payload: serde_json::Value) {
        self.push_response(Ok(FetchResponse::ok(payload)));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: FetchError) {
        self.push_response(Err(error));
    }

    /// Queue a response that is only returned once the sender fires.
    ///
    /// Dropping the sender releases the response too.
    pub fn push_with_trigger(&self, response: MockResult) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.responses.lock().push_back(MockResponse::Triggered {
            response,
            trigger: rx,
        });
        tx
    }

    /// Answer every request with `response` once the queue is empty.
    pub fn set_fallback(&self, response: MockResult) {
        *self.fallback.lock() = Some(response);
    }

    /// Requests seen so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<FetchRequest> {
        self.calls.lock().clone()
    }

    /// Number of requests seen so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of requests currently waiting for their response.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TileTransport for MockTransport {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        };

        self.calls.lock().push(request.clone());

        let next = self.responses.lock().pop_front();
        match next {
            Some(MockResponse::Immediate(response)) => response,
            Some(MockResponse::Triggered { response, trigger }) => {
                // Sent or dropped, either way the response is released.
                let _ = trigger.await;
                response
            }
            None => self.fallback.lock().clone().unwrap_or_else(|| {
                Err(FetchError::network(format!(
                    "No mock response configured for {}",
                    request.url
                )))
            }),
        }
    }
}

/// Decrements the in-flight counter even when the fetch future is dropped.
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_answers_in_order() {
        let mock = MockTransport::new();
        mock.push_payload(json!([{"id": "a"}]));
        mock.push_error(FetchError::status(503, "Service Unavailable"));

        let request = FetchRequest::get("http://localhost/containers");
        let first = mock.fetch(&request).await.expect("first is ok");
        assert_eq!(first.payload[0]["id"], "a");

        let second = mock.fetch(&request).await.expect_err("second fails");
        assert_eq!(second.http_status, Some(503));
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_without_script_fails() {
        let mock = MockTransport::new();
        let err = mock
            .fetch(&FetchRequest::get("http://localhost/x"))
            .await
            .expect_err("nothing configured");
        assert_eq!(err.http_status, None);
        assert!(err.message.contains("http://localhost/x"));
    }

    #[tokio::test]
    async fn test_mock_fallback_after_queue() {
        let mock = MockTransport::new();
        mock.push_payload(json!([]));
        mock.set_fallback(Err(FetchError::status(500, "boom")));

        let request = FetchRequest::get("http://localhost/containers");
        assert!(mock.fetch(&request).await.is_ok());
        for _ in 0..3 {
            assert!(mock.fetch(&request).await.is_err());
        }
        assert_eq!(mock.call_count(), 4);
    }

    #[tokio::test]
    async fn test_mock_trigger_holds_response() {
        let mock = MockTransport::new();
        let trigger = mock.push_with_trigger(Ok(FetchResponse::ok(json!([{"id": "held"}]))));

        let handle = {
            let mock = mock.clone();
            tokio::spawn(async move {
                mock.fetch(&FetchRequest::get("http://localhost/containers"))
                    .await
            })
        };

        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(mock.in_flight_count(), 1);
        assert!(!handle.is_finished());

        trigger.send(()).expect("receiver alive");
        let response = handle.await.expect("task joins").expect("response ok");
        assert_eq!(response.payload[0]["id"], "held");
        assert_eq!(mock.in_flight_count(), 0);
    }
}
