use std::time::Duration;

use rdkafka::ClientConfig;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub kafka: KafkaSettings,
    pub tika: TikaSettings,
    pub extraction: ExtractionSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaSettings {
    pub bootstrap_host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub bootstrap_port: u16,
    pub group_id: String,
    /// Topic from which the pdf jobs are consumed
    pub topic: String,
}

impl KafkaSettings {
    pub fn bootstrap_servers(&self) -> String {
        format!("{}:{}", self.bootstrap_host, self.bootstrap_port)
    }

    /// Client configuration of the consumer
    ///
    /// Offsets are committed by the consuming loop once a message has been handled,
    /// and a new consumer group starts from the oldest message.
    pub fn consumer_config(&self) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        client_config
            .set("group.id", &self.group_id)
            .set("bootstrap.servers", self.bootstrap_servers())
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "6000")
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest");

        client_config
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TikaSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
}

impl TikaSettings {
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionSettings {
    /// Maximum number of extractions running at the same time, all jobs included
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_concurrent_extractions: usize,
}

/// Extracts app settings from configuration files and env variables
///
/// `base.yaml` should contain shared settings for all environments.
/// A specific env file can be created for each environment: `develop.yaml`,`local.yaml` and `production.yaml`
/// The environment is set with the env var `APP_ENVIRONMENT`.
/// If `APP_ENVIRONMENT` is not set, `develop.yaml` is the default.
///
/// Settings are also taken from environment variables: with a prefix of APP and '__' as separator
/// For ex: `APP_TIKA__HOST=tika` would set `Settings.tika.host`
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    // Default to `develop` if unspecified.
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "develop".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT.");
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .set_default("kafka.bootstrap_host", "localhost")?
        .set_default("kafka.bootstrap_port", 9094_i64)?
        .set_default("kafka.group_id", "pdf-consumer-group")?
        .set_default("kafka.topic", "pdf-jobs")?
        .set_default("tika.host", "localhost")?
        .set_default("tika.port", 9998_i64)?
        .set_default("tika.timeout_secs", 60_i64)?
        .set_default("extraction.max_concurrent_extractions", 3_i64)?
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(false))
        .add_source(
            config::File::from(configuration_directory.join(environment_filename)).required(false),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

/// The possible runtime environment for our application.
pub enum Environment {
    Develop,
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Develop => "develop",
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "develop" => Ok(Self::Develop),
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `develop`, `local` or `production`.",
                other
            )),
        }
    }
}
