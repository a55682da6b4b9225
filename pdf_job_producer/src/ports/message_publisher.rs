use async_trait::async_trait;
use common::helper::error_chain_fmt;

/// Acknowledgment returned by the broker once a message is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryAck {
    pub partition: i32,
    pub offset: i64,
}

/// Publishes messages to the queue the workers consume from
///
/// A single call is a single delivery attempt: retrying is up to the caller.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, key: &str, payload: &[u8])
        -> Result<DeliveryAck, MessagePublisherError>;
}

#[derive(thiserror::Error)]
pub enum MessagePublisherError {
    #[error("The broker refused the message: {0}")]
    BrokerError(String),
    #[error("The message was not acknowledged in time")]
    Timeout,
}

impl std::fmt::Debug for MessagePublisherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
