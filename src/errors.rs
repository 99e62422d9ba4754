//! Errors for AIS store
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AisStoreError {
    #[error("MQTT client error")]
    MqttClientError(#[from] rumqttc::ClientError),

    #[error("Serialization error")]
    SerdeError(#[from] serde_json::Error),

    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("IO error")]
    IoError(#[from] std::io::Error),

    #[error("Invalid MMSI")]
    InvalidMmsi(String),

    #[error("Invalid map scale: {0}")]
    InvalidScale(i64),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Unknown message type")]
    UnknownMessageType(String),

    #[error("Message insert affected no rows")]
    NothingInserted,

    #[error("Invalid raster file name: {0}")]
    InvalidRasterFile(String),

    #[error("Database migration error")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),
}
