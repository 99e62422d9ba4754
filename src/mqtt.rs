//! MQTT client delivering AIS message batches

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};

use crate::{config::MqttConfig, errors::AisStoreError};

/// A batch payload received on a subscribed topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub topic: String,
    /// JSON array of AIS messages
    pub payload: String,
}

/// MQTT client for receiving AIS data
pub struct MqttClientBuilder {
    client: AsyncClient,
    event_loop: EventLoop,
    tx: mpsc::Sender<Batch>,
    rx: mpsc::Receiver<Batch>,
}

pub struct MqttClient {
    _client: AsyncClient,
    rx: mpsc::Receiver<Batch>,
    _handle: tokio::task::JoinHandle<Result<(), AisStoreError>>,
}

impl MqttClientBuilder {
    /// Create a new MQTT client
    pub fn new(config: &MqttConfig) -> Result<Self, AisStoreError> {
        if config.uri.trim().is_empty() {
            return Err(AisStoreError::ConfigurationError {
                message: "MQTT URI cannot be empty".to_string(),
            });
        }
        let mut mqtt_options = MqttOptions::new(&config.client_id, &config.uri, config.port);

        if let Some(transport) = transport_for(&config.uri) {
            mqtt_options.set_transport(transport);
        }
        mqtt_options.set_keep_alive(Duration::from_secs(5));

        let (client, event_loop) = AsyncClient::new(mqtt_options, 100);

        let (tx, rx) = mpsc::channel(100);

        Ok(Self {
            client,
            event_loop,
            tx,
            rx,
        })
    }

    /// Connect to MQTT broker and subscribe to topics
    ///
    /// Subscriptions are made in the event loop on every connection
    /// acknowledgement.
    pub async fn connect(self, topics: &[String]) -> Result<MqttClient, AisStoreError> {
        let _handle = tokio::spawn(Self::process_events(
            self.tx,
            self.event_loop,
            self.client.clone(),
            topics.to_vec(),
        ));

        Ok(MqttClient {
            _client: self.client,
            rx: self.rx,
            _handle,
        })
    }

    async fn subscribe(client: AsyncClient, topics: &[String]) -> Result<(), AisStoreError> {
        for topic in topics.iter() {
            info!("Subscribing to topic: {}", topic);
            client.subscribe(topic, QoS::AtLeastOnce).await?;
        }
        Ok(())
    }

    /// Process MQTT events
    ///
    /// `rumqttc` reconnects after a lost connection but does not restore
    /// subscriptions, so topics are subscribed again on each `ConnAck`.
    /// A failed subscription ends the loop with an error.
    async fn process_events(
        tx: mpsc::Sender<Batch>,
        mut event_loop: EventLoop,
        client: AsyncClient,
        topics: Vec<String>,
    ) -> Result<(), AisStoreError> {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Connected to MQTT broker, subscribing to topics");
                    if let Err(e) = Self::subscribe(client.clone(), &topics).await {
                        error!("Failed to subscribe: {}", e);
                        break Err(e);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    match parse_payload(&publish.topic, &publish.payload) {
                        Ok(batch) => {
                            if tx.send(batch).await.is_err() {
                                info!("Receiver closed, stopping MQTT event loop");
                                break Ok(());
                            }
                        }
                        Err(e) => {
                            warn!("Dropping payload on {}: {}", publish.topic, e);
                        }
                    }
                }
                Err(e) => {
                    error!("MQTT Error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
                _ => continue,
            }
        }
    }
}

impl MqttClient {
    /// Receive next batch, None once the event loop has stopped
    pub async fn recv(&mut self) -> Option<Batch> {
        self.rx.recv().await
    }
}

/// Transport matching the URI scheme, None for plain TCP
fn transport_for(uri: &str) -> Option<Transport> {
    if uri.starts_with("wss://") {
        Some(Transport::wss_with_default_config())
    } else if uri.starts_with("ws://") {
        Some(Transport::Ws)
    } else {
        None
    }
}

/// Decode a publish payload as UTF-8 text
fn parse_payload(topic: &str, payload: &[u8]) -> Result<Batch, AisStoreError> {
    let payload = std::str::from_utf8(payload)
        .map_err(|e| AisStoreError::InvalidMessage(format!("payload is not UTF-8: {}", e)))?;
    Ok(Batch {
        topic: topic.to_string(),
        payload: payload.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_batch_payload() {
        let payload = r#"[{"Timestamp":"2020-11-18T00:00:00.000Z","MMSI":304858000,"MsgType":"position_report"}]"#;

        let batch = parse_payload("ais/dk", payload.as_bytes()).unwrap();

        assert_eq!(
            batch,
            Batch {
                topic: "ais/dk".to_string(),
                payload: payload.to_string(),
            }
        );
    }

    #[test]
    fn reject_binary_payload() {
        assert!(matches!(
            parse_payload("ais/dk", &[0xff, 0xfe, 0x00]),
            Err(AisStoreError::InvalidMessage(_))
        ));
    }

    #[test]
    fn transport_from_scheme() {
        assert!(matches!(
            transport_for("wss://broker.example.org:443/mqtt"),
            Some(Transport::Wss(_))
        ));
        assert!(matches!(transport_for("ws://localhost/mqtt"), Some(Transport::Ws)));
        assert!(transport_for("localhost").is_none());
    }

    #[tokio::test]
    async fn build_client() {
        let config = MqttConfig {
            uri: "wss://localhost:443/mqtt".to_string(),
            port: 443,
            topics: vec!["ais/dk".to_string()],
            client_id: "ais-store-test".to_string(),
        };
        assert!(MqttClientBuilder::new(&config).is_ok());

        let config = MqttConfig {
            uri: " ".to_string(),
            ..config
        };
        assert!(MqttClientBuilder::new(&config).is_err());
    }
}
