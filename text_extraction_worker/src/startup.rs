use std::{future::Future, sync::Arc};

use rdkafka::{consumer::StreamConsumer, error::KafkaError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    adapters::tika_text_extractor::TikaTextExtractor,
    configuration::Settings,
    domain::services::{concurrency_limiter::ConcurrencyLimiter, drain_controller::DrainController},
    handlers::{
        handler_pdf_job::PdfJobHandler,
        kafka_consumer::{self, KafkaRegisterHandlerError},
    },
};

/// Holds the Kafka consumer and the pdf job handler it feeds
pub struct Application {
    consumer: StreamConsumer,
    topic: String,
    handler: PdfJobHandler,
    drain_controller: DrainController,
}

impl Application {
    #[tracing::instrument(name = "Building worker application")]
    pub async fn build(settings: Settings) -> Result<Self, ApplicationError> {
        // Does not connect yet, failing here means the configuration is invalid
        let consumer: StreamConsumer = settings.kafka.consumer_config().create()?;

        let text_extractor =
            TikaTextExtractor::try_new(&settings.tika.endpoint(), settings.tika.timeout())?;

        // Shared by every extraction task of every job
        let concurrency_limiter =
            ConcurrencyLimiter::new(settings.extraction.max_concurrent_extractions);
        let drain_controller = DrainController::new();

        let handler = PdfJobHandler::new(
            Arc::new(text_extractor),
            concurrency_limiter,
            drain_controller.clone(),
        );

        info!(
            tika = %settings.tika.endpoint(),
            max_concurrent_extractions = settings.extraction.max_concurrent_extractions,
            "🦄 Worker application built"
        );

        Ok(Self {
            consumer,
            topic: settings.kafka.topic,
            handler,
            drain_controller,
        })
    }

    /// Consumes pdf jobs until `cancel_token` is cancelled, then waits for the
    /// extractions in flight before returning
    ///
    /// self is moved in order for the application not to drop out of scope
    /// and move into a thread for ex
    pub async fn run_until_stopped(
        self,
        cancel_token: CancellationToken,
    ) -> Result<(), ApplicationError> {
        let consumption_result =
            kafka_consumer::register_handler(&self.consumer, &self.topic, &self.handler, cancel_token)
                .await;

        info!("Consumer stopped, waiting for in flight extractions");
        self.drain_controller.wait_all().await;
        info!("All text extractions completed");

        consumption_result?;

        info!("👋 Bye!");
        Ok(())
    }
}

/// Cancels `cancel_token` on the first shutdown signal, then calls `force_exit` on the next one
///
/// The first signal stops the consumption and lets the in flight extractions drain, a second
/// one gives up on them.
///
/// # Arguments
/// - `next_signal`: resolves on every shutdown signal, `shutdown_signal` for ex
/// - `force_exit`: ends the process, `std::process::exit` for ex
pub async fn handle_shutdown_signals<S, F>(
    mut next_signal: S,
    cancel_token: CancellationToken,
    force_exit: impl FnOnce(),
) where
    S: FnMut() -> F,
    F: Future<Output = ()>,
{
    next_signal().await;
    info!("Shutting down consumer...");
    cancel_token.cancel();

    next_signal().await;
    warn!(
        in_flight_extractions_abandoned = true,
        "Second shutdown signal received, exiting without waiting for the extractions"
    );
    force_exit();
}

/// Resolves when the process receives an interrupt or a terminate signal
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(?error, "Failed to listen to the interrupt signal");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(?error, "Failed to listen to the terminate signal");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationError {
    #[error(transparent)]
    KafkaError(#[from] KafkaError),
    #[error("Failed to build the Tika client: {0}")]
    TikaClientError(#[from] reqwest::Error),
    #[error(transparent)]
    KafkaRegisterHandlerError(#[from] KafkaRegisterHandlerError),
}
