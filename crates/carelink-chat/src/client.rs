//! Request/response client for the care assistant server.
//!
//! One exchange per call, no retries: retry policy belongs to the session
//! controller. Network failures, non-success statuses, and malformed bodies
//! all surface as `CareError::ChatRequest` (or `CareError::Poll` for the
//! follow-up check, which the poller absorbs).

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use carelink_core::error::{CareError, Result};

use crate::wire::{ChatReply, ChatRequest, FollowupReply, FollowupRequest};

/// Client-side view of the assistant server.
///
/// Implementations perform single request/response exchanges; they never
/// retry and never touch the message log.
pub trait AssistantClient: Send + Sync {
    /// Request the session greeting (an exchange with an empty user message).
    fn greet(&self, user_id: &str) -> impl Future<Output = Result<String>> + Send;

    /// Send a non-empty user message and return the agent's reply.
    fn send(&self, user_id: &str, text: &str) -> impl Future<Output = Result<String>> + Send;

    /// Ask whether the agent has produced unsolicited messages for this user.
    fn check_followups(&self, user_id: &str) -> impl Future<Output = Result<Vec<String>>> + Send;
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// `AssistantClient` over HTTP, speaking the server's JSON contract.
pub struct HttpAssistantClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAssistantClient {
    /// Create a client for the given server base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CareError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    async fn exchange(&self, user_id: &str, message: &str) -> Result<String> {
        let url = format!("{}/chat", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&ChatRequest { message, user_id })
            .send()
            .await
            .map_err(|e| CareError::ChatRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CareError::ChatRequest(format!(
                "server returned {}",
                status
            )));
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| CareError::ChatRequest(format!("malformed response: {}", e)))?;
        Ok(reply.response)
    }
}

impl AssistantClient for HttpAssistantClient {
    async fn greet(&self, user_id: &str) -> Result<String> {
        tracing::debug!(user_id = %user_id, "Requesting greeting");
        self.exchange(user_id, "").await
    }

    async fn send(&self, user_id: &str, text: &str) -> Result<String> {
        self.exchange(user_id, text).await
    }

    async fn check_followups(&self, user_id: &str) -> Result<Vec<String>> {
        let url = format!("{}/check-followups", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&FollowupRequest { user_id })
            .send()
            .await
            .map_err(|e| CareError::Poll(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CareError::Poll(format!("server returned {}", status)));
        }

        let reply: FollowupReply = response
            .json()
            .await
            .map_err(|e| CareError::Poll(format!("malformed response: {}", e)))?;
        Ok(reply.followups)
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Scripted assistant client for tests.
///
/// Replies and follow-up batches are queued up front and consumed in order.
/// An optional per-poll delay simulates a slow server so cancellation can be
/// exercised. Sent user texts are recorded for assertions.
pub struct MockAssistantClient {
    greeting: String,
    replies: Mutex<VecDeque<Result<String>>>,
    followups: Mutex<VecDeque<Result<Vec<String>>>>,
    poll_delay: Option<Duration>,
    sent: Mutex<Vec<String>>,
    poll_count: AtomicUsize,
}

impl MockAssistantClient {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
            replies: Mutex::new(VecDeque::new()),
            followups: Mutex::new(VecDeque::new()),
            poll_delay: None,
            sent: Mutex::new(Vec::new()),
            poll_count: AtomicUsize::new(0),
        }
    }

    /// Queue the outcome of the next `send` call.
    pub fn push_reply(&self, reply: Result<String>) {
        self.replies.lock().expect("replies mutex poisoned").push_back(reply);
    }

    /// Queue the outcome of the next `check_followups` call.
    pub fn push_followups(&self, batch: Result<Vec<String>>) {
        self.followups
            .lock()
            .expect("followups mutex poisoned")
            .push_back(batch);
    }

    /// Delay every `check_followups` resolution by `delay`.
    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = Some(delay);
        self
    }

    /// User texts passed to `send`, in call order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().expect("sent mutex poisoned").clone()
    }

    /// Number of `check_followups` calls made so far.
    pub fn poll_count(&self) -> usize {
        self.poll_count.load(Ordering::Relaxed)
    }
}

impl AssistantClient for MockAssistantClient {
    async fn greet(&self, _user_id: &str) -> Result<String> {
        Ok(self.greeting.clone())
    }

    async fn send(&self, _user_id: &str, text: &str) -> Result<String> {
        self.sent
            .lock()
            .expect("sent mutex poisoned")
            .push(text.to_string());
        match self.replies.lock().expect("replies mutex poisoned").pop_front() {
            Some(reply) => reply,
            None => Ok("Okay.".to_string()),
        }
    }

    async fn check_followups(&self, _user_id: &str) -> Result<Vec<String>> {
        self.poll_count.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.poll_delay {
            tokio::time::sleep(delay).await;
        }
        match self
            .followups
            .lock()
            .expect("followups mutex poisoned")
            .pop_front()
        {
            Some(batch) => batch,
            None => Ok(Vec::new()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_greet_returns_greeting() {
        let client = MockAssistantClient::new("Hello u1");
        let text = client.greet("u1").await.unwrap();
        assert_eq!(text, "Hello u1");
    }

    #[tokio::test]
    async fn test_mock_send_consumes_scripted_replies_in_order() {
        let client = MockAssistantClient::new("hi");
        client.push_reply(Ok("first".to_string()));
        client.push_reply(Ok("second".to_string()));

        assert_eq!(client.send("u1", "a").await.unwrap(), "first");
        assert_eq!(client.send("u1", "b").await.unwrap(), "second");
        // Queue drained: default reply.
        assert_eq!(client.send("u1", "c").await.unwrap(), "Okay.");
    }

    #[tokio::test]
    async fn test_mock_send_records_texts() {
        let client = MockAssistantClient::new("hi");
        client.send("u1", "one").await.unwrap();
        client.send("u1", "two").await.unwrap();
        assert_eq!(client.sent_texts(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_mock_send_scripted_failure() {
        let client = MockAssistantClient::new("hi");
        client.push_reply(Err(CareError::ChatRequest("boom".to_string())));
        let err = client.send("u1", "msg").await.unwrap_err();
        assert!(matches!(err, CareError::ChatRequest(_)));
    }

    #[tokio::test]
    async fn test_mock_followups_default_empty() {
        let client = MockAssistantClient::new("hi");
        let batch = client.check_followups("u1").await.unwrap();
        assert!(batch.is_empty());
        assert_eq!(client.poll_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_followups_scripted() {
        let client = MockAssistantClient::new("hi");
        client.push_followups(Ok(vec!["a".to_string(), "b".to_string()]));
        let batch = client.check_followups("u1").await.unwrap();
        assert_eq!(batch, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_http_client_rejects_unreachable_server() {
        // Port 1 is never listening; the request itself must fail cleanly.
        let client =
            HttpAssistantClient::new("http://127.0.0.1:1", Duration::from_millis(200)).unwrap();
        let err = client.greet("u1").await.unwrap_err();
        assert!(matches!(err, CareError::ChatRequest(_)));

        let err = client.check_followups("u1").await.unwrap_err();
        assert!(matches!(err, CareError::Poll(_)));
    }
}
