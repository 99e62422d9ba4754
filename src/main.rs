//! AIS store service

use std::time::Duration;

use ais_store::{
    config::AppConfig,
    database::Database,
    errors::AisStoreError,
    mqtt::{MqttClient, MqttClientBuilder},
    service::AisService,
    tile_store::FsTileStore,
};
use tokio::signal;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<(), AisStoreError> {
    #[cfg(feature = "dotenvy")]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Environment variables override config/default
    let config = AppConfig::load()?;
    config.database.validate()?;

    let database = Database::connect(&config.database).await?;
    let service = AisService::new(database, FsTileStore::new(&config.tiles.directory));

    let mqtt_client = MqttClientBuilder::new(&config.mqtt)?
        .connect(&config.mqtt.topics)
        .await?;

    tokio::select! {
        result = run_ais_store(
            mqtt_client,
            &service,
            config.database.retention,
            config.database.sweep_interval,
        ) => {
            info!("AIS store completed: {:?}", result);
        }
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    Ok(())
}

async fn run_ais_store(
    mut mqtt_client: MqttClient,
    service: &AisService<FsTileStore>,
    retention: Duration,
    sweep_interval: Duration,
) -> Result<(), AisStoreError> {
    let mut sweep = tokio::time::interval(sweep_interval);

    loop {
        tokio::select! {
            batch = mqtt_client.recv() => {
                match batch {
                    Some(batch) => {
                        let outcome = service.insert_batch(&batch.payload).await;
                        debug!("Batch on {}: {}", batch.topic, serde_json::to_string(&outcome)?);
                    }
                    None => {
                        error!("MQTT event loop stopped");
                        break;
                    }
                }
            }
            _ = sweep.tick() => {
                let outcome = service.delete_old_messages(retention).await;
                debug!("Retention sweep deleted {} messages", outcome.deletions);
            }
        }
    }

    Ok(())
}
