use std::time::Duration;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::use_cases::submit_pdf_job::SubmitOptions;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub kafka: KafkaSettings,
    pub submission: SubmissionSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaSettings {
    pub bootstrap_host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub bootstrap_port: u16,
    /// Topic on which the pdf jobs are published
    pub topic: String,
}

impl KafkaSettings {
    pub fn bootstrap_servers(&self) -> String {
        format!("{}:{}", self.bootstrap_host, self.bootstrap_port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_attempts: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub retry_delay_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub attempt_timeout_secs: u64,
}

impl SubmissionSettings {
    pub fn submit_options(&self) -> SubmitOptions {
        SubmitOptions {
            max_attempts: self.max_attempts,
            attempt_timeout: Duration::from_secs(self.attempt_timeout_secs),
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }
}

/// Extracts app settings from configuration files and env variables
///
/// `base.yaml` should contain shared settings for all environments.
/// A specific env file can be created for each environment: `develop.yaml`,`local.yaml` and `production.yaml`
/// The environment is set with the env var `APP_ENVIRONMENT`.
/// If `APP_ENVIRONMENT` is not set, `develop.yaml` is the default.
///
/// Settings are also taken from environment variables: with a prefix of APP and '__' as separator
/// For ex: `APP_KAFKA__BOOTSTRAP_HOST=kafka` would set `Settings.kafka.bootstrap_host`
///
/// Every setting has a default, so the producer can run without any configuration file.
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
        .set_default("kafka.bootstrap_port", 9092_i64)?
        .set_default("kafka.topic", "pdf-jobs")?
        .set_default("submission.max_attempts", 3_i64)?
        .set_default("submission.retry_delay_secs", 2_i64)?
        .set_default("submission.attempt_timeout_secs", 30_i64)?
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
