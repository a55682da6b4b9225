use anyhow::Context;
use clap::Parser;
use common::telemetry::{get_tracing_subscriber, init_tracing_subscriber};
use pdf_job_producer::{
    cli::Cli,
    configuration::get_configuration,
    domain::pdf_selection::create_job_from_paths,
    repositories::message_kafka_repository::KafkaMessageRepository,
    use_cases::submit_pdf_job::submit_pdf_job,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let tracing_subscriber =
        get_tracing_subscriber("pdf_job_producer".into(), "info".into(), std::io::stdout);
    init_tracing_subscriber(tracing_subscriber);

    let cli = Cli::parse();

    let configuration = get_configuration().context("Failed to read configuration.")?;
    let submit_options = configuration.submission.submit_options();

    let job = create_job_from_paths(&cli.pdf_file_paths, &cli.output_path)
        .context("Failed to create pdf job")?;

    let message_repository = KafkaMessageRepository::try_new(
        &configuration.kafka.bootstrap_servers(),
        &configuration.kafka.topic,
        submit_options.attempt_timeout,
    )
    .context("Failed to create Kafka producer")?;

    // Ctrl-C interrupts the waits between two attempts
    let cancel_token = CancellationToken::new();
    let signal_cancel_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping submission");
            signal_cancel_token.cancel();
        }
    });

    let receipt = submit_pdf_job(&message_repository, &job, submit_options, &cancel_token)
        .await
        .context("Failed to send message")?;

    info!(
        attempts = receipt.attempts,
        partition = receipt.ack.partition,
        offset = receipt.ack.offset,
        "Successfully sent PDF job: {} ({} files: {:?}) -> output: {}",
        job.id,
        job.nb_files(),
        job.file_names,
        job.output_path.display()
    );

    Ok(())
}
