use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{MessagingError, Result};

/// A message as handed to the broker, with the properties consumers rely on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Freshly generated for every publish.
    pub message_id: Uuid,

    /// Type tag the consumer switches on (AMQP `type` property).
    pub message_type: String,

    pub exchange: String,

    pub routing_key: String,

    pub content_type: String,

    /// Publish time.
    pub timestamp: DateTime<Utc>,

    pub body: Vec<u8>,
}

impl Envelope {
    /// Creates a new envelope builder.
    pub fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::default()
    }
}

/// Builder for constructing envelopes.
#[derive(Debug, Default)]
pub struct EnvelopeBuilder {
    message_id: Option<Uuid>,
    message_type: Option<String>,
    exchange: Option<String>,
    routing_key: Option<String>,
    content_type: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    body: Vec<u8>,
}

impl EnvelopeBuilder {
    /// Sets the message ID. If not set, a new ID will be generated.
    pub fn message_id(mut self, id: Uuid) -> Self {
        self.message_id = Some(id);
        self
    }

    pub fn message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = Some(message_type.into());
        self
    }

    pub fn exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    pub fn routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = Some(routing_key.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the timestamp. If not set, the current time will be used.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the envelope.
    ///
    /// Returns an error if the message type, exchange or routing key is missing.
    pub fn build(self) -> Result<Envelope> {
        let missing = |field: &str| MessagingError::Publish(format!("envelope is missing {field}"));

        Ok(Envelope {
            message_id: self.message_id.unwrap_or_else(Uuid::new_v4),
            message_type: self.message_type.ok_or_else(|| missing("message_type"))?,
            exchange: self.exchange.ok_or_else(|| missing("exchange"))?,
            routing_key: self.routing_key.ok_or_else(|| missing("routing_key"))?,
            content_type: self
                .content_type
                .unwrap_or_else(|| crate::EVENT_CONTENT_TYPE.to_string()),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            body: self.body,
        })
    }
}
