use common::telemetry::{get_tracing_subscriber, init_tracing_subscriber};
use text_extraction_worker::{
    configuration::get_configuration,
    startup::{handle_shutdown_signals, shutdown_signal, Application},
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let tracing_subscriber = get_tracing_subscriber(
        "text_extraction_worker".into(),
        "info".into(),
        std::io::stdout,
    );
    init_tracing_subscriber(tracing_subscriber);

    // Panics if the configuration can't be read
    let configuration = get_configuration().expect("Failed to read configuration.");

    let application = match Application::build(configuration).await {
        Ok(application) => application,
        Err(error) => panic!("Failed to build application: {:?}", error),
    };

    // Stops pulling messages on SIGINT/SIGTERM, the in flight extractions are then drained.
    // A second signal exits right away.
    let cancel_token = CancellationToken::new();
    tokio::spawn(handle_shutdown_signals(
        shutdown_signal,
        cancel_token.clone(),
        || std::process::exit(1),
    ));

    application
        .run_until_stopped(cancel_token)
        .await
        .map_err(|error| std::io::Error::new(std::io::ErrorKind::Other, error))?;

    Ok(())
}
