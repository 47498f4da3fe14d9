//! Background poller for agent-initiated follow-up messages.
//!
//! Polls immediately on start and then on a fixed cadence. A failed poll is
//! logged and swallowed; the loop never terminates itself. `stop` is the
//! only cancellation primitive: it signals the task and awaits it, so after
//! `stop` returns no batch callback can fire, including for a poll that was
//! in flight when stop was called.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::client::AssistantClient;

/// Handle to a running follow-up polling task.
///
/// Exactly one poller exists per session; starting a poller for a new user
/// requires stopping the previous one first.
pub struct FollowupPoller {
    shutdown: Arc<Notify>,
    handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl FollowupPoller {
    /// Begin immediate-then-periodic polling for `user_id`.
    ///
    /// Every non-empty batch is handed to `on_batch` in server order. The
    /// callback runs on the polling task; it should do no more than hand the
    /// batch off (the session controller's callback appends to the shared
    /// message log under a brief lock).
    pub fn start<C, F>(client: Arc<C>, user_id: String, interval: Duration, on_batch: F) -> Self
    where
        C: AssistantClient + 'static,
        F: Fn(Vec<String>) + Send + Sync + 'static,
    {
        let shutdown = Arc::new(Notify::new());
        let shutdown_task = Arc::clone(&shutdown);

        let handle = tokio::spawn(async move {
            tracing::info!(user_id = %user_id, interval_secs = interval.as_secs(), "Follow-up polling started");
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = shutdown_task.notified() => {
                        tracing::debug!("Follow-up polling stopped");
                        return;
                    }
                    _ = ticker.tick() => {}
                }

                // The shutdown branch also covers a poll already in flight:
                // the request future is dropped, never delivering its batch.
                tokio::select! {
                    _ = shutdown_task.notified() => {
                        tracing::debug!("Follow-up polling stopped mid-poll");
                        return;
                    }
                    result = client.check_followups(&user_id) => match result {
                        Ok(batch) => {
                            if !batch.is_empty() {
                                tracing::debug!(count = batch.len(), "Follow-ups received");
                                on_batch(batch);
                            }
                        }
                        Err(e) => {
                            // Transient by policy: log and wait for the next tick.
                            tracing::warn!(error = %e, "Follow-up poll failed");
                        }
                    }
                }
            }
        });

        Self {
            shutdown,
            handle: tokio::sync::Mutex::new(Some(handle)),
        }
    }

    /// Stop polling.
    ///
    /// Signals the task and awaits its completion. When this returns, no
    /// further `on_batch` invocation can occur.
    pub async fn stop(&self) {
        self.shutdown.notify_one();
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "Follow-up poller task failed");
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockAssistantClient;
    use std::sync::Mutex;

    fn collector() -> (
        Arc<Mutex<Vec<String>>>,
        impl Fn(Vec<String>) + Send + Sync + 'static,
    ) {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&collected);
        let on_batch = move |batch: Vec<String>| {
            sink.lock().unwrap().extend(batch);
        };
        (collected, on_batch)
    }

    #[tokio::test]
    async fn test_polls_immediately_on_start() {
        let client = Arc::new(MockAssistantClient::new("hi"));
        client.push_followups(Ok(vec!["a".to_string(), "b".to_string()]));
        let (collected, on_batch) = collector();

        // A one-hour interval proves the first poll is not cadence-driven.
        let poller = FollowupPoller::start(
            Arc::clone(&client),
            "u1".to_string(),
            Duration::from_secs(3600),
            on_batch,
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        poller.stop().await;

        assert_eq!(*collected.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(client.poll_count(), 1);
    }

    #[tokio::test]
    async fn test_batch_order_preserved() {
        let client = Arc::new(MockAssistantClient::new("hi"));
        client.push_followups(Ok(vec![
            "Did you take your pills?".to_string(),
            "Remember to drink water".to_string(),
        ]));
        let (collected, on_batch) = collector();

        let poller = FollowupPoller::start(
            client,
            "u1".to_string(),
            Duration::from_secs(3600),
            on_batch,
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        poller.stop().await;

        let got = collected.lock().unwrap().clone();
        assert_eq!(
            got,
            vec!["Did you take your pills?", "Remember to drink water"]
        );
    }

    #[tokio::test]
    async fn test_empty_batch_not_delivered() {
        let client = Arc::new(MockAssistantClient::new("hi"));
        let (collected, on_batch) = collector();

        let poller = FollowupPoller::start(
            Arc::clone(&client),
            "u1".to_string(),
            Duration::from_millis(20),
            on_batch,
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        poller.stop().await;

        assert!(collected.lock().unwrap().is_empty());
        assert!(client.poll_count() >= 2);
    }

    #[tokio::test]
    async fn test_survives_failed_poll() {
        let client = Arc::new(MockAssistantClient::new("hi"));
        client.push_followups(Err(carelink_core::CareError::Poll(
            "temporary outage".to_string(),
        )));
        client.push_followups(Ok(vec!["x".to_string()]));
        let (collected, on_batch) = collector();

        let poller = FollowupPoller::start(
            Arc::clone(&client),
            "u1".to_string(),
            Duration::from_millis(25),
            on_batch,
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
        poller.stop().await;

        // The failure was swallowed and the next tick delivered.
        assert_eq!(*collected.lock().unwrap(), vec!["x"]);
        assert!(client.poll_count() >= 2);
    }

    #[tokio::test]
    async fn test_stop_prevents_in_flight_delivery() {
        // The server answers slowly; stop() arrives while the poll is in
        // flight. The delayed batch must never be delivered.
        let client = Arc::new(
            MockAssistantClient::new("hi").with_poll_delay(Duration::from_millis(400)),
        );
        client.push_followups(Ok(vec!["late".to_string()]));
        let (collected, on_batch) = collector();

        let poller = FollowupPoller::start(
            Arc::clone(&client),
            "u1".to_string(),
            Duration::from_millis(10),
            on_batch,
        );
        // Let the first poll start, then stop while it is mid-delay.
        tokio::time::sleep(Duration::from_millis(100)).await;
        poller.stop().await;
        assert!(collected.lock().unwrap().is_empty());

        // Even after the delay would have elapsed, nothing arrives.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(collected.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let client = Arc::new(MockAssistantClient::new("hi"));
        let (_collected, on_batch) = collector();

        let poller = FollowupPoller::start(
            client,
            "u1".to_string(),
            Duration::from_millis(20),
            on_batch,
        );
        poller.stop().await;
        poller.stop().await;
    }

    #[tokio::test]
    async fn test_no_polls_after_stop() {
        let client = Arc::new(MockAssistantClient::new("hi"));
        let (_collected, on_batch) = collector();

        let poller = FollowupPoller::start(
            Arc::clone(&client),
            "u1".to_string(),
            Duration::from_millis(20),
            on_batch,
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        poller.stop().await;
        let count_at_stop = client.poll_count();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(client.poll_count(), count_at_stop);
    }
}
