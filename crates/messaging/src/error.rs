use thiserror::Error;

/// Errors that can occur when talking to the broker.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// Every connection attempt failed.
    #[error("cannot connect to broker after {attempts} attempts: {reason}")]
    CannotConnectBroker { attempts: usize, reason: String },

    /// An AMQP protocol or I/O error.
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    /// The consumer's delivery stream ended. Consumers treat this as fatal.
    #[error("consumer channel closed: {0}")]
    ChannelClosed(String),

    /// An event could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The message could not be handed to the broker.
    #[error("publish failed: {0}")]
    Publish(String),
}

/// Result type for messaging operations.
pub type Result<T> = std::result::Result<T, MessagingError>;
