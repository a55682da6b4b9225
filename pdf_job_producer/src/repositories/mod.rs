pub mod message_kafka_repository;
