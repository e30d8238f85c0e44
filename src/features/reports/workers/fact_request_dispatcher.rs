use std::sync::Arc;
use std::time::Duration;

use crate::features::reports::services::FactRequestReceiver;
use crate::modules::measurement::{FactRequest, FactRequestSender};

/// Delay before the first retry; doubles on every further attempt
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Background worker delivering fact requests to the measurement service.
///
/// Runs until every [`FactRequestQueue`](crate::features::reports::services::FactRequestQueue)
/// handle is dropped. Delivery failures are logged and never reach the
/// caller that queued the request.
pub struct FactRequestDispatcher {
    receiver: FactRequestReceiver,
    sender: Arc<dyn FactRequestSender>,
    max_retries: u32,
    retry_delay: Duration,
}

impl FactRequestDispatcher {
    pub fn new(
        receiver: FactRequestReceiver,
        sender: Arc<dyn FactRequestSender>,
        max_retries: u32,
    ) -> Self {
        Self {
            receiver,
            sender,
            max_retries,
            retry_delay: RETRY_BASE_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Run the dispatcher in a background loop
    pub async fn run(mut self) {
        tracing::info!("Starting fact request dispatcher");

        while let Some(request) = self.receiver.recv().await {
            self.deliver(&request).await;
        }

        tracing::info!("Fact request queue closed, dispatcher stopped");
    }

    /// Returns whether the request was eventually accepted
    async fn deliver(&self, request: &FactRequest) -> bool {
        let mut delay = self.retry_delay;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }

            match self.sender.send(request).await {
                Ok(()) => {
                    tracing::debug!(
                        "Delivered fact request for report {} resource {}",
                        request.report_id,
                        request.resource_id
                    );
                    return true;
                }
                Err(e) => {
                    tracing::warn!(
                        "Fact request for report {} resource {} failed (attempt {}/{}): {}",
                        request.report_id,
                        request.resource_id,
                        attempt + 1,
                        self.max_retries + 1,
                        e
                    );
                }
            }
        }

        tracing::error!(
            "Giving up on fact request for report {} resource {}",
            request.report_id,
            request.resource_id
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppError;
    use crate::features::reports::services::FactRequestQueue;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Fails the first `failures` calls, then records what it receives
    struct FlakySender {
        failures: u32,
        calls: AtomicU32,
        delivered: Mutex<Vec<FactRequest>>,
    }

    impl FlakySender {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicU32::new(0),
                delivered: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl FactRequestSender for FlakySender {
        async fn send(&self, request: &FactRequest) -> Result<(), AppError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(AppError::DeliveryFailure("measurement service down".into()));
            }
            self.delivered.lock().unwrap().push(*request);
            Ok(())
        }
    }

    fn request() -> FactRequest {
        FactRequest {
            report_id: Uuid::new_v4(),
            resource_id: Uuid::new_v4(),
        }
    }

    fn dispatcher(sender: Arc<FlakySender>, max_retries: u32) -> FactRequestDispatcher {
        let (_queue, receiver) = FactRequestQueue::with_capacity(1);
        FactRequestDispatcher::new(receiver, sender, max_retries).with_retry_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_deliver_first_try() {
        let sender = FlakySender::new(0);
        let dispatcher = dispatcher(sender.clone(), 3);

        assert!(dispatcher.deliver(&request()).await);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deliver_retries_then_succeeds() {
        let sender = FlakySender::new(2);
        let dispatcher = dispatcher(sender.clone(), 3);

        assert!(dispatcher.deliver(&request()).await);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_deliver_gives_up_after_retries() {
        let sender = FlakySender::new(u32::MAX);
        let dispatcher = dispatcher(sender.clone(), 2);

        assert!(!dispatcher.deliver(&request()).await);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_drains_queue_until_closed() {
        let sender = FlakySender::new(1);
        let (queue, receiver) = FactRequestQueue::with_capacity(8);
        let dispatcher = FactRequestDispatcher::new(receiver, sender.clone(), 1)
            .with_retry_delay(Duration::ZERO);

        let sent: Vec<FactRequest> = (0..3).map(|_| request()).collect();
        for r in &sent {
            assert!(queue.enqueue(*r));
        }
        drop(queue);

        dispatcher.run().await;

        assert_eq!(*sender.delivered.lock().unwrap(), sent);
    }
}
