//! Inbound message plus the handle used to settle it with the broker.

use async_trait::async_trait;
use lapin::acker::Acker;
use lapin::options::{BasicAckOptions, BasicRejectOptions};

use crate::{Envelope, Result};

/// How a delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Acked,
    Rejected { requeue: bool },
}

/// Settles a single delivery.
#[async_trait]
pub trait Acknowledge: Send + Sync {
    async fn ack(&self) -> Result<()>;

    async fn reject(&self, requeue: bool) -> Result<()>;
}

/// A message received from a queue.
pub struct Delivery {
    /// Value of the AMQP `type` property.
    pub message_type: Option<String>,
    pub message_id: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub delivery_tag: u64,
    pub redelivered: bool,
    acker: Box<dyn Acknowledge>,
}

impl Delivery {
    /// Builds a delivery carrying the properties of a published envelope.
    pub fn from_envelope(envelope: &Envelope, delivery_tag: u64, acker: Box<dyn Acknowledge>) -> Self {
        Self {
            message_type: Some(envelope.message_type.clone()),
            message_id: Some(envelope.message_id.to_string()),
            content_type: Some(envelope.content_type.clone()),
            body: envelope.body.clone(),
            delivery_tag,
            redelivered: false,
            acker,
        }
    }

    /// Type tag, or an empty string if the message carried none.
    pub fn message_type(&self) -> &str {
        self.message_type.as_deref().unwrap_or_default()
    }

    /// Positively acknowledges this delivery.
    pub async fn ack(&self) -> Result<()> {
        self.acker.ack().await
    }

    /// Rejects this delivery.
    pub async fn reject(&self, requeue: bool) -> Result<()> {
        self.acker.reject(requeue).await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("message_type", &self.message_type)
            .field("message_id", &self.message_id)
            .field("delivery_tag", &self.delivery_tag)
            .field("redelivered", &self.redelivered)
            .field("body_len", &self.body.len())
            .finish_non_exhaustive()
    }
}

struct LapinAcker(Acker);

#[async_trait]
impl Acknowledge for LapinAcker {
    async fn ack(&self) -> Result<()> {
        self.0.ack(BasicAckOptions::default()).await.map(|_| ())?;
        Ok(())
    }

    async fn reject(&self, requeue: bool) -> Result<()> {
        self.0
            .reject(BasicRejectOptions { requeue })
            .await
            .map(|_| ())?;
        Ok(())
    }
}

impl From<lapin::message::Delivery> for Delivery {
    fn from(delivery: lapin::message::Delivery) -> Self {
        let props = &delivery.properties;
        Self {
            message_type: props.kind().as_ref().map(|k| k.as_str().to_string()),
            message_id: props.message_id().as_ref().map(|id| id.as_str().to_string()),
            content_type: props.content_type().as_ref().map(|c| c.as_str().to_string()),
            delivery_tag: delivery.delivery_tag,
            redelivered: delivery.redelivered,
            body: delivery.data,
            acker: Box::new(LapinAcker(delivery.acker)),
        }
    }
}
