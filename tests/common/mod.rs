#![allow(dead_code)]

use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tempfile::TempDir;

use ais_store::{database::Database, models::FormattedMessage};

/// Seven messages received at 2020-11-18 00:00:00
pub const BATCH: &str = include_str!("../fixtures/batch.json");

pub async fn setup_test_db(dir: &TempDir) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("ais.db"))
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("Failed to open database")
}

/// Migrated database holding the reference vessels, ports and tiles
pub async fn seeded_database(dir: &TempDir) -> (Database, SqlitePool) {
    let pool = setup_test_db(dir).await;
    let db = Database::new(pool.clone())
        .await
        .expect("Failed to run migrations");

    sqlx::raw_sql(include_str!("../fixtures/reference.sql"))
        .execute(&pool)
        .await
        .expect("Failed to load reference data");

    (db, pool)
}

pub fn format(raw: &str) -> FormattedMessage {
    let raw: Value = serde_json::from_str(raw).expect("Invalid JSON");
    FormattedMessage::format(&raw).expect("Failed to format message")
}

pub async fn insert(db: &Database, raw: &str) -> i64 {
    db.insert_message(&format(raw))
        .await
        .expect("Failed to insert message")
}

pub async fn insert_batch(db: &Database, batch: &str) {
    let messages: Vec<Value> = serde_json::from_str(batch).expect("Invalid batch");
    for raw in &messages {
        let message = FormattedMessage::format(raw).expect("Failed to format message");
        db.insert_message(&message)
            .await
            .expect("Failed to insert message");
    }
}

pub fn position(mmsi: u32, timestamp: &str, latitude: f64, longitude: f64) -> String {
    format!(
        r#"{{"Timestamp":"{timestamp}","Class":"Class A","MMSI":{mmsi},"MsgType":"position_report","Position":{{"type":"Point","coordinates":[{latitude},{longitude}]}},"Status":"Under way using engine","RoT":25.7,"SoG":10.8,"CoG":94.3,"Heading":97}}"#
    )
}

pub fn static_data(mmsi: u32, timestamp: &str, imo: u32, name: &str, destination_id: Option<i64>) -> String {
    let destination = destination_id.map_or("null".to_string(), |id| id.to_string());
    format!(
        r#"{{"Timestamp":"{timestamp}","Class":"AtoN","MMSI":{mmsi},"MsgType":"static_data","IMO":{imo},"Name":"{name}","VesselType":"Yacht","Length":78,"Breadth":13,"DestinationId":{destination},"A":30,"B":30,"C":30,"D":30}}"#
    )
}
