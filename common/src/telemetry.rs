use tracing::subscriber::set_global_default;
use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter, Registry};

/// Builds the `tracing` subscriber shared by the producer and the worker.
///
/// Layers, from the innermost:
/// - `EnvFilter`: reads `RUST_LOG`, falls back to `fallback_env_filter` when it is not set
/// - `JsonStorageLayer`: stores span fields so children spans (an extraction task inside a
///   consumed message for ex) inherit the `job_id`, `partition`, `offset`...
/// - `BunyanFormattingLayer`: outputs one bunyan-compatible JSON record per event
///
/// # Arguments
/// - `name`: name of the app, written in every record
/// - `fallback_env_filter`: filter level for traces if RUST_LOG env variable has not been set
/// - `sink`: to what the traces will be outputted (`std::io::stdout`, `std::io::sink` in tests)
pub fn get_tracing_subscriber<Sink>(
    name: String,
    fallback_env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    // The Sink implements `MakeWriter` for all choices of the lifetime parameter `'a`
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_env_filter));

    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Registers a tracing Subscriber as the global default to process span data.
///
/// Also redirects all `log`'s events (emitted by rdkafka or reqwest for ex) to it.
///
/// It should only be called once per process
pub fn init_tracing_subscriber(subscriber: impl Subscriber + Send + Sync) {
    LogTracer::init().expect("Failed to set logger");

    set_global_default(subscriber).expect("Failed to set subscriber");
}
