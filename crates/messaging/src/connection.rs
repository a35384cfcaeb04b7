//! Broker connection with bounded, fixed-delay retry.
//!
//! Retrying only happens here, once, at startup. When the budget is spent the
//! caller gets [`MessagingError::CannotConnectBroker`] and is expected to exit.

use std::future::Future;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use lapin::{Connection, ConnectionProperties};
use tracing::{info, warn};

use crate::{MessagingError, Result};

/// How many times to redial the broker, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Total number of dial attempts, the first one included.
    pub fn attempts(&self) -> usize {
        self.max_retries + 1
    }

    fn backoff(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.max_retries)
    }
}

/// Runs `dial` until it succeeds or the policy is exhausted.
pub async fn retry_connect<T, E, F, Fut>(dial: F, policy: &RetryPolicy) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    dial.retry(policy.backoff())
        .notify(|err: &E, delay: Duration| {
            warn!(error = %err, delay = ?delay, "Broker connection failed, backing off");
        })
        .await
        .map_err(|err| MessagingError::CannotConnectBroker {
            attempts: policy.attempts(),
            reason: err.to_string(),
        })
}

/// Connects to the broker at `url`.
///
/// The returned connection is meant to be shared by every publisher and
/// consumer of the process.
pub async fn connect(url: &str, policy: &RetryPolicy) -> Result<Connection> {
    let connection = retry_connect(
        || Connection::connect(url, ConnectionProperties::default()),
        policy,
    )
    .await?;

    info!("Connected to broker");
    Ok(connection)
}
