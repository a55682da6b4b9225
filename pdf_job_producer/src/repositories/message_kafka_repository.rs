use std::time::Duration;

use async_trait::async_trait;
use rdkafka::{
    error::KafkaError,
    producer::{FutureProducer, FutureRecord},
    types::RDKafkaErrorCode,
    util::Timeout,
    ClientConfig,
};
use tracing::info;

use crate::ports::message_publisher::{DeliveryAck, MessagePublisher, MessagePublisherError};

/// Message repository implemented with Kafka
///
/// Publishes messages to a single topic, each message being keyed (the job id for ex)
/// so that the broker can route it to a partition.
pub struct KafkaMessageRepository {
    producer: FutureProducer,
    topic: String,
    /// Maximum time to wait for the message to be queued and acknowledged by the broker
    delivery_timeout: Duration,
}

impl KafkaMessageRepository {
    /// Builds the Kafka producer
    ///
    /// No connection is opened yet: rdkafka connects lazily on the first message.
    ///
    /// # Arguments
    /// - `bootstrap_servers`: comma separated list of `host:port`
    /// - `topic`: topic to which every message is published
    /// - `delivery_timeout`: bound of a single publishing attempt
    pub fn try_new(
        bootstrap_servers: &str,
        topic: &str,
        delivery_timeout: Duration,
    ) -> Result<Self, KafkaError> {
        info!(
            "Creating Kafka producer for brokers: {}, topic: {}",
            bootstrap_servers, topic
        );

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set(
                "message.timeout.ms",
                delivery_timeout.as_millis().to_string(),
            )
            // Only one broker acknowledgment is needed
            .set("acks", "1")
            .create()?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
            delivery_timeout,
        })
    }
}

#[async_trait]
impl MessagePublisher for KafkaMessageRepository {
    #[tracing::instrument(name = "Publishing message to Kafka", skip(self, payload), fields(topic = %self.topic))]
    async fn publish(
        &self,
        key: &str,
        payload: &[u8],
    ) -> Result<DeliveryAck, MessagePublisherError> {
        let record = FutureRecord::to(&self.topic).key(key).payload(payload);

        match self
            .producer
            .send(record, Timeout::After(self.delivery_timeout))
            .await
        {
            Ok((partition, offset)) => {
                info!(partition, offset, "Message sent successfully: key={}", key);
                Ok(DeliveryAck { partition, offset })
            }
            Err((KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut), _)) => {
                Err(MessagePublisherError::Timeout)
            }
            Err((error, _message)) => Err(MessagePublisherError::BrokerError(error.to_string())),
        }
    }
}
