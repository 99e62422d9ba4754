//! Service layer answering every request with a document.
//!
//! Errors never reach the caller: malformed input yields `-1`, database
//! failures are logged and answered with a failure status or an empty
//! document.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::{
    database::Database,
    documents::{
        BatchOutcome, Deletions, InsertStatus, Lookup, PortLookup, PositionDocument,
        PositionHistory, Ports, TileImage, Tiles, VesselDocument, VesselIdentity, Vessels,
    },
    errors::AisStoreError,
    models::{FormattedMessage, Mmsi},
    tile_store::TileStore,
};

/// Number of positions in a position history
pub const POSITION_HISTORY_LENGTH: u32 = 5;

pub struct AisService<S> {
    database: Database,
    tiles: S,
}

impl<S: TileStore> AisService<S> {
    pub fn new(database: Database, tiles: S) -> Self {
        Self { database, tiles }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Insert a JSON array of messages, counting the stored ones
    pub async fn insert_batch(&self, payload: &str) -> BatchOutcome {
        let messages = match serde_json::from_str::<Value>(payload) {
            Ok(Value::Array(messages)) => messages,
            Ok(_) => {
                warn!("Batch payload is not a JSON array");
                return BatchOutcome::Rejected;
            }
            Err(e) => {
                warn!("Batch payload is not valid JSON: {}", e);
                return BatchOutcome::Rejected;
            }
        };

        let mut inserts = 0;
        for message in &messages {
            if self.insert_message(message).await.success {
                inserts += 1;
            }
        }
        info!("Inserted {} of {} messages", inserts, messages.len());
        BatchOutcome::Inserted(inserts)
    }

    /// Format and store a single message
    pub async fn insert_message(&self, raw: &Value) -> InsertStatus {
        match self.try_insert(raw).await {
            Ok(_) => InsertStatus::SUCCESS,
            Err(e) => {
                error!("Failed to insert message: {}", e);
                InsertStatus::FAILURE
            }
        }
    }

    async fn try_insert(&self, raw: &Value) -> Result<i64, AisStoreError> {
        let message = FormattedMessage::format(raw)?;
        self.database.insert_message(&message).await
    }

    pub async fn delete_all_messages(&self) -> InsertStatus {
        match self.database.delete_all_messages().await {
            Ok(_) => InsertStatus::SUCCESS,
            Err(e) => {
                error!("Failed to delete messages: {}", e);
                InsertStatus::FAILURE
            }
        }
    }

    pub async fn delete_old_messages(&self, retention: std::time::Duration) -> Deletions {
        let deletions = self
            .database
            .delete_old_messages(retention)
            .await
            .unwrap_or_else(|e| {
                error!("Failed to delete old messages: {}", e);
                0
            });
        Deletions { deletions }
    }

    pub async fn vessel_imo(&self, mmsi: Mmsi) -> Option<u32> {
        logged(self.database.vessel_imo(mmsi).await, "vessel IMO")
    }

    pub async fn vessel_name(&self, mmsi: Mmsi) -> Option<String> {
        logged(self.database.vessel_name(mmsi).await, "vessel name")
    }

    pub async fn optional_vessel_data(&self, mmsi: Mmsi) -> VesselIdentity {
        logged(
            self.database.optional_vessel_data(mmsi).await,
            "vessel identity",
        )
    }

    pub async fn recent_positions(&self) -> Vessels<VesselDocument> {
        Vessels {
            vessels: logged(self.database.recent_positions().await, "recent positions"),
        }
    }

    pub async fn most_recent_position(&self, mmsi: Mmsi) -> Lookup<PositionDocument> {
        logged(
            self.database.most_recent_position(mmsi).await,
            "most recent position",
        )
        .into()
    }

    pub async fn vessel_information(
        &self,
        mmsi: Mmsi,
        imo: Option<u32>,
        name: Option<&str>,
    ) -> VesselDocument {
        logged(
            self.database.vessel_information(mmsi, imo, name).await,
            "vessel information",
        )
    }

    pub async fn recent_positions_in_tile(&self, tile_id: i64) -> Vessels<VesselDocument> {
        Vessels {
            vessels: logged(
                self.database.recent_positions_in_tile(tile_id).await,
                "positions in tile",
            ),
        }
    }

    pub async fn matching_ports(&self, name: &str, country: Option<&str>) -> Ports {
        Ports {
            ports: logged(
                self.database.matching_ports(name, country).await,
                "matching ports",
            ),
        }
    }

    pub async fn vessels_in_port_tile(&self, name: &str, country: &str) -> PortLookup {
        logged(
            self.database.vessels_in_port_tile(name, country).await,
            "vessels in port tile",
        )
    }

    pub async fn position_history(&self, mmsi: Mmsi) -> PositionHistory {
        match self
            .database
            .position_history(mmsi, POSITION_HISTORY_LENGTH)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                error!("Failed to query position history: {}", e);
                PositionHistory::empty(mmsi)
            }
        }
    }

    /// Vessels headed to a port, as position documents
    pub async fn vessels_headed_to_port_id(&self, port_id: i64) -> Vessels<PositionDocument> {
        let vessels: Vec<VesselDocument> = logged(
            self.database.vessels_headed_to_port_id(port_id).await,
            "vessels headed to port",
        );
        Vessels {
            vessels: vessels
                .into_iter()
                .map(VesselDocument::into_position)
                .collect(),
        }
    }

    pub async fn vessels_headed_to_port(&self, name: &str, country: &str) -> PortLookup {
        logged(
            self.database.vessels_headed_to_port(name, country).await,
            "vessels headed to port",
        )
    }

    pub async fn contained_tiles(&self, tile_id: i64) -> Tiles {
        Tiles {
            tiles: logged(
                self.database.contained_tiles(tile_id).await,
                "contained tiles",
            ),
        }
    }

    /// Base64 encoded raster image of a tile
    pub async fn tile_image(&self, tile_id: i64) -> TileImage {
        match self.read_tile_image(tile_id).await {
            Ok(Some(data)) => TileImage::Encoded(BASE64.encode(data)),
            Ok(None) => TileImage::Unavailable,
            Err(e) => {
                error!("Failed to read image of tile {}: {}", tile_id, e);
                TileImage::Unavailable
            }
        }
    }

    async fn read_tile_image(&self, tile_id: i64) -> Result<Option<Vec<u8>>, AisStoreError> {
        let Some(raster_file) = self.database.tile_raster_file(tile_id).await? else {
            return Ok(None);
        };
        Ok(Some(self.tiles.read(&raster_file).await?))
    }
}

/// Unwrap a query result, logging a failure and substituting the empty value
fn logged<T: Default>(result: Result<T, AisStoreError>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        error!("Failed to query {}: {}", what, e);
        T::default()
    })
}
