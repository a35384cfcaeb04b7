//! Broker-less publisher and acknowledgement probe.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AckOutcome, Acknowledge, Delivery, Envelope, MessagingError, Publisher, PublisherConfig,
    Result,
};

#[derive(Debug, Default)]
struct InMemoryPublisherState {
    published: Vec<Envelope>,
    fail_on_publish: bool,
}

/// Publisher that records envelopes instead of sending them.
///
/// Clones share the same record, so a test can keep one handle and give
/// another to the code under test.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPublisher {
    config: PublisherConfig,
    state: Arc<RwLock<InMemoryPublisherState>>,
}

impl InMemoryPublisher {
    pub fn new(config: PublisherConfig) -> Self {
        Self {
            config,
            state: Arc::default(),
        }
    }

    /// Makes every following publish fail until reset.
    pub async fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().await.fail_on_publish = fail;
    }

    /// Returns everything published so far.
    pub async fn published(&self) -> Vec<Envelope> {
        self.state.read().await.published.clone()
    }

    pub async fn published_count(&self) -> usize {
        self.state.read().await.published.len()
    }

    /// Removes and returns the recorded envelopes as deliveries, each with a
    /// probe to observe how it was settled.
    pub async fn drain_deliveries(&self) -> Vec<(Delivery, AckProbe)> {
        let envelopes = std::mem::take(&mut self.state.write().await.published);
        envelopes
            .iter()
            .enumerate()
            .map(|(tag, envelope)| {
                let probe = AckProbe::new();
                let delivery =
                    Delivery::from_envelope(envelope, tag as u64 + 1, Box::new(probe.clone()));
                (delivery, probe)
            })
            .collect()
    }
}

#[async_trait]
impl Publisher for InMemoryPublisher {
    fn config(&self) -> &PublisherConfig {
        &self.config
    }

    async fn publish(&self, body: Vec<u8>, content_type: &str) -> Result<()> {
        let mut state = self.state.write().await;

        if state.fail_on_publish {
            return Err(MessagingError::Publish("broker unavailable".to_string()));
        }

        let envelope = self.config.envelope(body, content_type)?;
        state.published.push(envelope);
        Ok(())
    }
}

/// Records how a delivery was settled.
#[derive(Debug, Clone, Default)]
pub struct AckProbe {
    outcomes: Arc<RwLock<Vec<AckOutcome>>>,
}

impl AckProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first settlement, if any.
    pub async fn outcome(&self) -> Option<AckOutcome> {
        self.outcomes.read().await.first().copied()
    }

    /// Every settlement attempt, in order.
    pub async fn outcomes(&self) -> Vec<AckOutcome> {
        self.outcomes.read().await.clone()
    }
}

#[async_trait]
impl Acknowledge for AckProbe {
    async fn ack(&self) -> Result<()> {
        self.outcomes.write().await.push(AckOutcome::Acked);
        Ok(())
    }

    async fn reject(&self, requeue: bool) -> Result<()> {
        self.outcomes
            .write()
            .await
            .push(AckOutcome::Rejected { requeue });
        Ok(())
    }
}
