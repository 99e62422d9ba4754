mod common;

use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};

use ais_store::{models::Mmsi, service::AisService, tile_store::FsTileStore};
use common::{seeded_database, BATCH};

async fn service(dir: &TempDir) -> AisService<FsTileStore> {
    let tiles = dir.path().join("tiles");
    std::fs::create_dir_all(&tiles).unwrap();
    std::fs::write(tiles.join("38G1.png"), b"tile").unwrap();

    let (db, _pool) = seeded_database(dir).await;
    AisService::new(db, FsTileStore::new(tiles))
}

fn to_json<T: serde::Serialize>(document: T) -> Value {
    serde_json::to_value(document).unwrap()
}

fn mmsi(value: u32) -> Mmsi {
    Mmsi::try_from(value).unwrap()
}

#[tokio::test]
async fn test_insert_batch() {
    let dir = tempdir().unwrap();
    let service = service(&dir).await;

    assert_eq!(to_json(service.insert_batch(BATCH).await), json!({"inserts": 7}));
}

#[tokio::test]
async fn test_insert_batch_rejects_invalid_payload() {
    let dir = tempdir().unwrap();
    let service = service(&dir).await;

    assert_eq!(to_json(service.insert_batch("Not JSON").await), json!(-1));
    assert_eq!(
        to_json(
            service
                .insert_batch(r#"{"Timestamp":"2020-11-18T00:00:00.000Z","MMSI":304858000,"MsgType":"position_report"}"#)
                .await
        ),
        json!(-1)
    );
}

#[tokio::test]
async fn test_insert_batch_counts_stored_messages() {
    let dir = tempdir().unwrap();
    let service = service(&dir).await;

    let batch = r#"[
        {"Timestamp":"2020-11-18T00:00:00.000Z","Class":"Class A","MMSI":304858000,"MsgType":"position_report","Position":{"type":"Point","coordinates":[55.218332,13.371672]}},
        {"Timestamp":"2020-11-18T00:00:00.000Z","Class":"Class A","MMSI":304858000,"MsgType":"voyage_report"},
        "not a message",
        {"Class":"Class A","MMSI":304858000,"MsgType":"position_report"}
    ]"#;
    assert_eq!(to_json(service.insert_batch(batch).await), json!({"inserts": 1}));
}

#[tokio::test]
async fn test_insert_message_status() {
    let dir = tempdir().unwrap();
    let service = service(&dir).await;

    let message = json!({
        "Timestamp": "2020-11-18T00:00:00.000Z",
        "Class": "AtoN",
        "MMSI": 319904000,
        "MsgType": "static_data",
        "IMO": 1000021,
        "Name": "Montkaj",
        "VesselType": "Yacht",
        "Length": 78,
        "Breadth": 13
    });
    assert_eq!(
        to_json(service.insert_message(&message).await),
        json!({"success": 1})
    );

    let unknown = json!({"Timestamp": "2020-11-18T00:00:00.000Z", "MMSI": 319904000, "MsgType": "unknown"});
    assert_eq!(
        to_json(service.insert_message(&unknown).await),
        json!({"success": 0})
    );

    assert_eq!(to_json(service.delete_all_messages().await), json!({"success": 1}));
}

#[tokio::test]
async fn test_recent_positions_document() {
    let dir = tempdir().unwrap();
    let service = service(&dir).await;
    service.insert_batch(BATCH).await;

    let document = to_json(service.recent_positions().await);
    let vessels = document["vessels"].as_array().unwrap();
    assert_eq!(vessels.len(), 5);
    assert_eq!(
        vessels[0],
        json!({"MMSI": 376503000, "lat": 54.519373, "long": 11.47914, "Name": "Cooler Bay", "IMO": 7818066})
    );
    assert_eq!(
        vessels[3],
        json!({"MMSI": 219005465, "lat": 54.572602, "long": 11.929218, "Name": null, "IMO": null})
    );
}

#[tokio::test]
async fn test_most_recent_position_document() {
    let dir = tempdir().unwrap();
    let service = service(&dir).await;
    service.insert_batch(BATCH).await;

    assert_eq!(
        to_json(service.most_recent_position(mmsi(304858000)).await),
        json!({"MMSI": 304858000, "lat": 55.218332, "long": 13.371672, "IMO": null})
    );
    assert_eq!(
        to_json(service.most_recent_position(mmsi(111111111)).await),
        json!({})
    );
}

#[tokio::test]
async fn test_vessel_documents() {
    let dir = tempdir().unwrap();
    let service = service(&dir).await;

    assert_eq!(service.vessel_imo(mmsi(257385000)).await, Some(8813972));
    assert_eq!(
        service.vessel_name(mmsi(257385000)).await,
        Some("Kegums".to_string())
    );
    assert_eq!(
        to_json(service.optional_vessel_data(mmsi(376503000)).await),
        json!({"Name": "Cooler Bay", "IMO": 7818066})
    );
    assert_eq!(
        to_json(service.vessel_information(mmsi(538007975), None, None).await),
        json!({"MMSI": 538007975, "lat": null, "long": null, "Name": "Leni Selmer", "IMO": 9474280})
    );
    assert_eq!(
        to_json(
            service
                .vessel_information(mmsi(538007975), None, Some("Ever Given"))
                .await
        ),
        json!({"MMSI": null, "lat": null, "long": null, "Name": null, "IMO": null})
    );
}

#[tokio::test]
async fn test_port_documents() {
    let dir = tempdir().unwrap();
    let service = service(&dir).await;
    service.insert_batch(BATCH).await;

    let document = to_json(service.matching_ports("Nysted", None).await);
    assert_eq!(
        document,
        json!({"ports": [{
            "Id": 4384,
            "Name": "Nysted",
            "Country": "Denmark",
            "lat": 54.665,
            "long": 11.7333,
            "MapView1_Id": 1,
            "MapView2_Id": 5428,
            "MapView3_Id": 54284
        }]})
    );

    let document = to_json(service.vessels_in_port_tile("Nysted", "Denmark").await);
    assert_eq!(document["vessels"][0]["MMSI"], json!(219005465));

    let document = to_json(service.vessels_in_port_tile("Nyborg", "Denmark").await);
    assert_eq!(document["ports"].as_array().unwrap().len(), 2);

    assert_eq!(
        to_json(service.vessels_headed_to_port("Atlantis", "Denmark").await),
        json!({"ports": []})
    );
}

#[tokio::test]
async fn test_vessels_headed_to_port_id_without_name() {
    let dir = tempdir().unwrap();
    let service = service(&dir).await;

    let batch = r#"[
        {"Timestamp":"2020-11-18T00:00:00.000Z","Class":"Class A","MMSI":219005465,"MsgType":"static_data","IMO":1234567,"Name":"Not Johann","DestinationId":4384},
        {"Timestamp":"2020-11-18T00:02:00.000Z","Class":"Class A","MMSI":219005465,"MsgType":"position_report","Position":{"type":"Point","coordinates":[56.218332,12.771672]}}
    ]"#;
    assert_eq!(to_json(service.insert_batch(batch).await), json!({"inserts": 2}));

    assert_eq!(
        to_json(service.vessels_headed_to_port_id(4384).await),
        json!({"vessels": [{"MMSI": 219005465, "lat": 56.218332, "long": 12.771672, "IMO": 1234567}]})
    );
}

#[tokio::test]
async fn test_position_history_document() {
    let dir = tempdir().unwrap();
    let service = service(&dir).await;
    service.insert_batch(BATCH).await;

    assert_eq!(
        to_json(service.position_history(mmsi(257385000)).await),
        json!({"MMSI": 257385000, "Positions": [{"lat": 55.219403, "long": 13.127725}], "IMO": null})
    );
    assert_eq!(
        to_json(service.position_history(mmsi(538007975)).await),
        json!({"MMSI": 538007975, "Positions": null, "IMO": null})
    );
}

#[tokio::test]
async fn test_tile_documents() {
    let dir = tempdir().unwrap();
    let service = service(&dir).await;
    service.insert_batch(BATCH).await;

    let document = to_json(service.recent_positions_in_tile(5428).await);
    assert_eq!(document["vessels"].as_array().unwrap().len(), 2);
    assert_eq!(
        to_json(service.recent_positions_in_tile(999).await),
        json!({"vessels": []})
    );

    let document = to_json(service.contained_tiles(5428).await);
    let tiles = document["tiles"].as_array().unwrap();
    assert_eq!(tiles.len(), 4);
    assert_eq!(tiles[0]["Id"], json!(54281));
    assert_eq!(tiles[0]["LongitudeW"], json!(11.0));
    assert_eq!(tiles[0]["LatitudeN"], json!(55.0));
    assert_eq!(tiles[0]["ContainerMapView_Id"], json!(5428));
}

#[tokio::test]
async fn test_tile_image() {
    let dir = tempdir().unwrap();
    let service = service(&dir).await;

    assert_eq!(to_json(service.tile_image(5428).await), json!("dGlsZQ=="));
    // Raster file missing from the store
    assert_eq!(to_json(service.tile_image(54281).await), json!(-1));
    // Unknown tile
    assert_eq!(to_json(service.tile_image(999).await), json!(-1));
}

#[tokio::test]
async fn test_delete_old_messages_document() {
    let dir = tempdir().unwrap();
    let service = service(&dir).await;
    service.insert_batch(BATCH).await;

    assert_eq!(
        to_json(
            service
                .delete_old_messages(std::time::Duration::from_secs(300))
                .await
        ),
        json!({"deletions": 7})
    );
    assert_eq!(
        to_json(service.recent_positions().await),
        json!({"vessels": []})
    );
}
