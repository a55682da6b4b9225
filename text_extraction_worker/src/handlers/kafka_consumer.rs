use rdkafka::{
    consumer::{CommitMode, Consumer, StreamConsumer},
    error::KafkaError,
    Message,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span};

use common::helper::error_chain_fmt;

use crate::handlers::handler_pdf_job::PdfJobHandler;

#[derive(thiserror::Error)]
pub enum KafkaRegisterHandlerError {
    #[error(transparent)]
    KafkaError(#[from] KafkaError),
}

impl std::fmt::Debug for KafkaRegisterHandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Subscribes to the pdf jobs topic and hands every consumed message to the pdf job handler
///
/// Messages are handled one by one: the handler only launches the extractions, so the
/// loop is never blocked by them. Once handled, the message offset is committed
/// whatever the outcome: a message that can not be parsed or is invalid is dropped and
/// never redelivered.
///
/// Stops pulling messages as soon as `cancel_token` is cancelled. The extractions that
/// were already launched keep running.
#[tracing::instrument(name = "Register message handler", skip(consumer, handler, cancel_token))]
pub async fn register_handler(
    consumer: &StreamConsumer,
    topic: &str,
    handler: &PdfJobHandler,
    cancel_token: CancellationToken,
) -> Result<(), KafkaRegisterHandlerError> {
    consumer.subscribe(&[topic])?;

    info!("📡 Starting consumer for topic: {}", topic);

    loop {
        let message = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                info!("Consumption cancelled, no more messages will be pulled");
                break;
            }
            received = consumer.recv() => match received {
                Ok(message) => message,
                Err(error) => {
                    error!(?error, "Failed to consume a kafka message on topic {}", topic);
                    continue;
                }
            },
        };

        let key = message
            .key()
            .map(|key| String::from_utf8_lossy(key).into_owned())
            .unwrap_or_default();

        info_span!(
            "Handling consumed message",
            topic,
            partition = message.partition(),
            offset = message.offset(),
            key = %key,
            message_id = %uuid::Uuid::new_v4(),
        )
        .in_scope(|| {
            info!(
                "Received message: key={}, partition={}, offset={}",
                key,
                message.partition(),
                message.offset()
            );

            // A message without payload is handled as a malformed one
            match handler.on_message(message.payload().unwrap_or_default()) {
                Ok(dispatched_job) => info!(
                    ?dispatched_job,
                    "Successfully processed message at offset {}",
                    message.offset()
                ),
                Err(error) => error!(?error, "Failed to handle message, dropping it"),
            }
        });

        if let Err(error) = consumer.commit_message(&message, CommitMode::Async) {
            error!(
                ?error,
                "Failed to commit message at offset {}",
                message.offset()
            );
        }
    }

    info!("Stream processing terminated");
    Ok(())
}
