//! Bounded worker pool draining one delivery stream.
//!
//! A permit is taken before the next delivery is pulled, so at most `size`
//! deliveries are in flight. Anything beyond that stays with the broker,
//! held back by QoS and manual acknowledgement.
//!
//! Settlement rule: handler success acks, handler failure rejects without
//! requeue.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info_span, warn};

use crate::{Delivery, MessagingError, Result};

/// Processes one delivery. The pool settles the delivery from the result.
#[async_trait]
pub trait DeliveryHandler: Send + Sync + 'static {
    type Error: Display + Send;

    async fn handle(&self, delivery: &Delivery) -> std::result::Result<(), Self::Error>;
}

/// Fixed number of concurrent handler slots.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    size: usize,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    /// Creates a pool with `size` slots (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            permits: Arc::new(Semaphore::new(size)),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of free slots right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Runs until the stream ends or yields an error.
    ///
    /// Work already started is drained before returning. The result is always
    /// [`MessagingError::ChannelClosed`], which callers treat as fatal.
    pub async fn run<S, H>(&self, mut deliveries: S, handler: Arc<H>) -> Result<()>
    where
        S: Stream<Item = Result<Delivery>> + Unpin + Send,
        H: DeliveryHandler,
    {
        let mut in_flight = JoinSet::new();

        let reason = loop {
            let permit = match self.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break "worker pool closed".to_string(),
            };

            while let Some(finished) = in_flight.try_join_next() {
                log_join_failure(finished);
            }

            match deliveries.next().await {
                Some(Ok(delivery)) => {
                    let handler = handler.clone();
                    let span = info_span!(
                        "delivery",
                        message_type = %delivery.message_type(),
                        delivery_tag = delivery.delivery_tag,
                        redelivered = delivery.redelivered,
                    );
                    in_flight.spawn(
                        async move {
                            settle(handler.as_ref(), delivery).await;
                            drop(permit);
                        }
                        .instrument(span),
                    );
                }
                Some(Err(e)) => break e.to_string(),
                None => break "delivery stream ended".to_string(),
            }
        };

        debug!(in_flight = in_flight.len(), "Draining in-flight deliveries");
        while let Some(finished) = in_flight.join_next().await {
            log_join_failure(finished);
        }

        Err(MessagingError::ChannelClosed(reason))
    }
}

async fn settle<H: DeliveryHandler>(handler: &H, delivery: Delivery) {
    match handler.handle(&delivery).await {
        Ok(()) => {
            metrics::counter!("deliveries_total", "outcome" => "acked").increment(1);
            if let Err(e) = delivery.ack().await {
                error!(error = %e, "Failed to ack delivery");
            }
        }
        Err(e) => {
            warn!(
                error = %e,
                redelivered = delivery.redelivered,
                "Handler failed, rejecting delivery"
            );
            metrics::counter!("deliveries_total", "outcome" => "rejected").increment(1);
            if let Err(e) = delivery.reject(false).await {
                error!(error = %e, "Failed to reject delivery");
            }
        }
    }
}

fn log_join_failure(result: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Delivery task aborted");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures_util::stream;

    use super::*;
    use crate::{AckOutcome, AckProbe, Envelope};

    fn delivery(tag: u64, message_type: &str) -> (Delivery, AckProbe) {
        let envelope = Envelope::builder()
            .message_type(message_type)
            .exchange("test-exchange")
            .routing_key("test-key")
            .body(b"{}".to_vec())
            .build()
            .unwrap();
        let probe = AckProbe::new();
        (
            Delivery::from_envelope(&envelope, tag, Box::new(probe.clone())),
            probe,
        )
    }

    /// Sleeps a little and tracks how many calls overlap.
    #[derive(Default)]
    struct SlowHandler {
        running: AtomicUsize,
        peak: AtomicUsize,
        handled: AtomicUsize,
    }

    #[async_trait]
    impl DeliveryHandler for SlowHandler {
        type Error = String;

        async fn handle(&self, delivery: &Delivery) -> std::result::Result<(), String> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.handled.fetch_add(1, Ordering::SeqCst);

            if delivery.message_type() == "poison" {
                return Err("cannot handle poison".to_string());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_by_pool_size() {
        let (deliveries, probes): (Vec<_>, Vec<_>) = (0..8).map(|tag| delivery(tag, "ok")).unzip();
        let handler = Arc::new(SlowHandler::default());
        let pool = WorkerPool::new(2);

        let result = pool
            .run(stream::iter(deliveries.into_iter().map(Ok)), handler.clone())
            .await;

        assert!(matches!(result, Err(MessagingError::ChannelClosed(_))));
        assert_eq!(handler.handled.load(Ordering::SeqCst), 8);
        assert!(handler.peak.load(Ordering::SeqCst) <= 2);
        assert!(handler.peak.load(Ordering::SeqCst) >= 1);
        for probe in probes {
            assert_eq!(probe.outcome().await, Some(AckOutcome::Acked));
        }
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_failed_handler_rejects_without_requeue() {
        let (good, good_probe) = delivery(1, "ok");
        let (bad, bad_probe) = delivery(2, "poison");
        let handler = Arc::new(SlowHandler::default());

        let _ = WorkerPool::new(4)
            .run(stream::iter(vec![Ok(good), Ok(bad)]), handler)
            .await;

        assert_eq!(good_probe.outcome().await, Some(AckOutcome::Acked));
        assert_eq!(
            bad_probe.outcome().await,
            Some(AckOutcome::Rejected { requeue: false })
        );
    }

    #[tokio::test]
    async fn test_redelivered_message_is_settled_once() {
        let (mut again, ack) = delivery(7, "poison");
        again.redelivered = true;
        let handler = Arc::new(SlowHandler::default());

        let _ = WorkerPool::new(1)
            .run(stream::iter(vec![Ok(again)]), handler.clone())
            .await;

        assert_eq!(handler.handled.load(Ordering::SeqCst), 1);
        assert_eq!(
            ack.outcomes().await,
            vec![AckOutcome::Rejected { requeue: false }]
        );
    }

    #[tokio::test]
    async fn test_stream_error_closes_after_draining() {
        let (first, first_probe) = delivery(1, "ok");
        let (never_pulled, never_probe) = delivery(3, "ok");
        let items = vec![
            Ok(first),
            Err(MessagingError::Publish("connection reset".to_string())),
            Ok(never_pulled),
        ];
        let handler = Arc::new(SlowHandler::default());

        let result = WorkerPool::new(1).run(stream::iter(items), handler.clone()).await;

        match result {
            Err(MessagingError::ChannelClosed(reason)) => assert!(reason.contains("connection reset")),
            other => panic!("expected ChannelClosed, got {other:?}"),
        }
        assert_eq!(first_probe.outcome().await, Some(AckOutcome::Acked));
        assert_eq!(never_probe.outcome().await, None);
        assert_eq!(handler.handled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pool_has_at_least_one_slot() {
        assert_eq!(WorkerPool::new(0).size(), 1);
        assert_eq!(WorkerPool::new(24).available(), 24);
    }
}
