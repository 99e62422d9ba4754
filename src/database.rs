// src/database.rs
//! Database access for AIS messages and reference data

mod models;
mod types;

use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::{
    config::DatabaseConfig,
    documents::{
        Coordinates, PortDocument, PortLookup, PositionDocument, PositionHistory, TileDocument,
        VesselDocument, VesselIdentity,
    },
    errors::AisStoreError,
    models::{
        format_timestamp, AisMessageType, FormattedMessage, Mmsi, PositionReport, StaticData,
    },
    tiles::{resolve_tile, Scale},
};
use models::{IdentityRow, MapViewRow, PortRow, PositionRow};
use types::map_view_column;

pub use types::ActivityPolicy;

/// Latest position report of every MMSI, as rows of `ranked m` with
/// `m.recency = 1` for the latest one
const RANKED_POSITIONS: &str = "
    WITH ranked AS (
        SELECT m.id, m.mmsi, m.timestamp, m.vessel_imo,
               p.latitude, p.longitude, p.last_static_data_id,
               p.map_view1_id, p.map_view2_id, p.map_view3_id,
               ROW_NUMBER() OVER (
                   PARTITION BY m.mmsi ORDER BY m.timestamp DESC, m.id DESC
               ) AS recency
        FROM ais_message m
        JOIN position_report p ON p.ais_message_id = m.id
    )
    SELECT m.mmsi, m.latitude, m.longitude
    FROM ranked m";

const LATEST_POSITION_OF_MMSI: &str = "
    SELECT m.mmsi, p.latitude, p.longitude
    FROM ais_message m
    JOIN position_report p ON p.ais_message_id = m.id
    WHERE m.mmsi = ?1
    ORDER BY m.timestamp DESC, m.id DESC
    LIMIT ?2";

const PORT_COLUMNS: &str = "id, name, country, latitude, longitude, \
    map_view1_id, map_view2_id, map_view3_id";

const MAP_VIEW_COLUMNS: &str = "id, name, longitude_w, latitude_s, longitude_e, latitude_n, \
    scale, raster_file, image_width, image_height, actual_longitude_w, actual_latitude_s, \
    actual_longitude_e, actual_latitude_n, container_map_view_id";

/// AIS message store
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    policy: ActivityPolicy,
}

impl Database {
    /// Open the database named in the configuration, creating it if needed
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AisStoreError> {
        info!("Opening database at {}", config.url);
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool)
            .await?
            .with_activity_policy(config.activity_policy))
    }

    /// Use an existing pool, running pending migrations
    pub async fn new(pool: SqlitePool) -> Result<Self, AisStoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool,
            policy: ActivityPolicy::default(),
        })
    }

    pub fn with_activity_policy(mut self, policy: ActivityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn activity_policy(&self) -> ActivityPolicy {
        self.policy
    }

    /// Store one formatted message, returning the id of its `ais_message` row.
    ///
    /// The base row and the position report or static data row are written
    /// in one transaction.
    pub async fn insert_message(&self, message: &FormattedMessage) -> Result<i64, AisStoreError> {
        let base = &message.message;
        let mmsi = base
            .mmsi
            .ok_or_else(|| AisStoreError::InvalidMessage("missing MMSI".to_string()))?;
        let timestamp = base
            .timestamp
            .as_ref()
            .map(format_timestamp)
            .ok_or_else(|| AisStoreError::InvalidMessage("missing Timestamp".to_string()))?;

        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("INSERT INTO ais_message (timestamp, mmsi, class) VALUES (?1, ?2, ?3)")
                .bind(&timestamp)
                .bind(mmsi)
                .bind(&base.class)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AisStoreError::NothingInserted);
        }
        let id = result.last_insert_rowid();

        match &message.message_type {
            AisMessageType::PositionReport(report) => {
                Self::insert_position_report(&mut tx, id, mmsi, report).await?;
            }
            AisMessageType::StaticData(data) => {
                Self::insert_static_data(&mut tx, id, base.imo, data).await?;
            }
        }

        tx.commit().await?;
        debug!("Stored message {} from MMSI {}", id, mmsi.value());
        Ok(id)
    }

    async fn insert_position_report(
        conn: &mut SqliteConnection,
        id: i64,
        mmsi: Mmsi,
        report: &PositionReport,
    ) -> Result<(), AisStoreError> {
        let mut map_views = [None; 3];
        if let Some(position) = &report.position {
            for (slot, scale) in map_views.iter_mut().zip(Scale::ALL) {
                *slot =
                    Self::find_tile(conn, scale, position.longitude(), position.latitude()).await?;
            }
        }

        let last_static_data_id: Option<i64> = sqlx::query_scalar(
            "SELECT s.ais_message_id
             FROM static_data s
             JOIN ais_message m ON m.id = s.ais_message_id
             WHERE m.mmsi = ?1
             ORDER BY m.timestamp DESC, m.id DESC
             LIMIT 1",
        )
        .bind(mmsi)
        .fetch_optional(&mut *conn)
        .await?;

        sqlx::query(
            "INSERT INTO position_report (
                ais_message_id, navigational_status, longitude, latitude,
                rate_of_turn, speed_over_ground, course_over_ground, heading,
                last_static_data_id, map_view1_id, map_view2_id, map_view3_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(id)
        .bind(&report.status)
        .bind(report.position.as_ref().map(|p| p.longitude()))
        .bind(report.position.as_ref().map(|p| p.latitude()))
        .bind(report.rate_of_turn)
        .bind(report.speed_over_ground)
        .bind(report.course_over_ground)
        .bind(report.heading)
        .bind(last_static_data_id)
        .bind(map_views[0])
        .bind(map_views[1])
        .bind(map_views[2])
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn insert_static_data(
        conn: &mut SqliteConnection,
        id: i64,
        imo: Option<u32>,
        data: &StaticData,
    ) -> Result<(), AisStoreError> {
        if let Some(imo) = imo {
            let known = sqlx::query(
                "UPDATE ais_message SET vessel_imo = ?1
                 WHERE id = ?2 AND EXISTS (SELECT 1 FROM vessel WHERE imo = ?1)",
            )
            .bind(imo)
            .bind(id)
            .execute(&mut *conn)
            .await?;
            if known.rows_affected() > 0 {
                debug!("Message {} matched vessel IMO {}", id, imo);
            }
        }

        sqlx::query(
            "INSERT INTO static_data (
                ais_message_id, ais_imo, call_sign, name, vessel_type, cargo_type,
                length, breadth, draught, ais_destination, eta, destination_port_id
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                (SELECT id FROM port WHERE id = ?12)
            )",
        )
        .bind(id)
        .bind(imo)
        .bind(&data.call_sign)
        .bind(&data.name)
        .bind(&data.vessel_type)
        .bind(&data.cargo_type)
        .bind(data.length)
        .bind(data.breadth)
        .bind(data.draught)
        .bind(&data.destination)
        .bind(data.eta.as_ref().map(format_timestamp))
        .bind(data.destination_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Id of the stored tile whose bounds match the computed ones exactly
    async fn find_tile(
        conn: &mut SqliteConnection,
        scale: Scale,
        longitude: f64,
        latitude: f64,
    ) -> Result<Option<i64>, AisStoreError> {
        let bounds = resolve_tile(scale, longitude, latitude);
        let id = sqlx::query_scalar(
            "SELECT id FROM map_view
             WHERE scale = ?1 AND longitude_w = ?2 AND longitude_e = ?3
               AND latitude_n = ?4 AND latitude_s = ?5
             LIMIT 1",
        )
        .bind(scale.value())
        .bind(bounds.west)
        .bind(bounds.east)
        .bind(bounds.north)
        .bind(bounds.south)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(id)
    }

    /// Delete every AIS message together with its position or static data
    pub async fn delete_all_messages(&self) -> Result<u64, AisStoreError> {
        let result = sqlx::query("DELETE FROM ais_message")
            .execute(&self.pool)
            .await?;
        info!("Deleted all {} AIS messages", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Delete messages with a timestamp before `cutoff`
    pub async fn delete_messages_older_than(
        &self,
        cutoff: NaiveDateTime,
    ) -> Result<u64, AisStoreError> {
        let result = sqlx::query("DELETE FROM ais_message WHERE timestamp < ?1")
            .bind(format_timestamp(&cutoff))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete messages that fell out of the retention window
    pub async fn delete_old_messages(&self, retention: Duration) -> Result<u64, AisStoreError> {
        let retention = chrono::Duration::from_std(retention).map_err(|e| {
            AisStoreError::ConfigurationError {
                message: format!("Retention out of range: {}", e),
            }
        })?;
        let cutoff = Utc::now().naive_utc() - retention;
        let deletions = self.delete_messages_older_than(cutoff).await?;
        if deletions > 0 {
            info!("Deleted {} messages older than {}", deletions, cutoff);
        }
        Ok(deletions)
    }

    /// IMO of the vessel in the permanent vessel table
    pub async fn vessel_imo(&self, mmsi: Mmsi) -> Result<Option<u32>, AisStoreError> {
        let mut conn = self.pool.acquire().await?;
        let vessel = Self::permanent_identity(&mut conn, mmsi).await?;
        Ok(vessel.and_then(|v| v.imo))
    }

    /// Name of the vessel in the permanent vessel table
    pub async fn vessel_name(&self, mmsi: Mmsi) -> Result<Option<String>, AisStoreError> {
        let mut conn = self.pool.acquire().await?;
        let vessel = Self::permanent_identity(&mut conn, mmsi).await?;
        Ok(vessel.and_then(|v| v.name))
    }

    /// Name and IMO from received static data, falling back to the
    /// permanent vessel table
    pub async fn optional_vessel_data(&self, mmsi: Mmsi) -> Result<VesselIdentity, AisStoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::identity(&mut conn, mmsi).await
    }

    async fn permanent_identity(
        conn: &mut SqliteConnection,
        mmsi: Mmsi,
    ) -> Result<Option<IdentityRow>, AisStoreError> {
        let row = sqlx::query_as("SELECT name, imo FROM vessel WHERE mmsi = ?1 LIMIT 1")
            .bind(mmsi)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Last non-null Name and IMO of the received static data
    async fn transient_identity(
        conn: &mut SqliteConnection,
        mmsi: Mmsi,
    ) -> Result<VesselIdentity, AisStoreError> {
        let rows: Vec<IdentityRow> = sqlx::query_as(
            "SELECT s.name, s.ais_imo AS imo
             FROM static_data s
             JOIN ais_message m ON m.id = s.ais_message_id
             WHERE m.mmsi = ?1
             ORDER BY m.timestamp, m.id",
        )
        .bind(mmsi)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .fold(VesselIdentity::default(), |identity, row| VesselIdentity {
                name: row.name.or(identity.name),
                imo: row.imo.or(identity.imo),
            }))
    }

    async fn identity(
        conn: &mut SqliteConnection,
        mmsi: Mmsi,
    ) -> Result<VesselIdentity, AisStoreError> {
        let mut identity = Self::transient_identity(conn, mmsi).await?;
        if identity.name.is_none() || identity.imo.is_none() {
            if let Some(vessel) = Self::permanent_identity(conn, mmsi).await? {
                identity.name = identity.name.or(vessel.name);
                identity.imo = identity.imo.or(vessel.imo);
            }
        }
        Ok(identity)
    }

    /// Most recent IMO matched to one of the vessel's messages
    async fn resolved_imo(
        conn: &mut SqliteConnection,
        mmsi: Mmsi,
    ) -> Result<Option<u32>, AisStoreError> {
        let imo = sqlx::query_scalar(
            "SELECT vessel_imo FROM ais_message
             WHERE mmsi = ?1 AND vessel_imo IS NOT NULL
             ORDER BY timestamp DESC, id DESC
             LIMIT 1",
        )
        .bind(mmsi)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(imo)
    }

    /// Vessel document for a position row, or the placeholder without one
    async fn vessel_document(
        conn: &mut SqliteConnection,
        row: Option<PositionRow>,
    ) -> Result<VesselDocument, AisStoreError> {
        let Some(row) = row else {
            return Ok(VesselDocument::default());
        };
        let identity = Self::identity(conn, row.mmsi).await?;
        Ok(VesselDocument {
            mmsi: Some(row.mmsi),
            lat: row.latitude,
            long: row.longitude,
            name: identity.name,
            imo: identity.imo,
        })
    }

    async fn vessel_documents(
        conn: &mut SqliteConnection,
        rows: Vec<PositionRow>,
    ) -> Result<Vec<VesselDocument>, AisStoreError> {
        let mut vessels = Vec::with_capacity(rows.len());
        for row in rows {
            vessels.push(Self::vessel_document(conn, Some(row)).await?);
        }
        Ok(vessels)
    }

    async fn latest_positions(
        conn: &mut SqliteConnection,
        mmsi: Mmsi,
        limit: u32,
    ) -> Result<Vec<PositionRow>, AisStoreError> {
        let rows = sqlx::query_as(LATEST_POSITION_OF_MMSI)
            .bind(mmsi)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    /// Latest position of every vessel, newest first
    pub async fn recent_positions(&self) -> Result<Vec<VesselDocument>, AisStoreError> {
        let mut conn = self.pool.acquire().await?;
        let query =
            format!("{RANKED_POSITIONS} WHERE m.recency = 1 ORDER BY m.timestamp DESC, m.id DESC");
        let rows = sqlx::query_as(&query).fetch_all(&mut *conn).await?;
        Self::vessel_documents(&mut conn, rows).await
    }

    /// Latest position of a vessel, None if it has not reported one
    pub async fn most_recent_position(
        &self,
        mmsi: Mmsi,
    ) -> Result<Option<PositionDocument>, AisStoreError> {
        let mut conn = self.pool.acquire().await?;
        let Some(row) = Self::latest_positions(&mut conn, mmsi, 1).await?.pop() else {
            return Ok(None);
        };
        let imo = Self::resolved_imo(&mut conn, mmsi).await?;
        Ok(Some(PositionDocument {
            mmsi: Some(row.mmsi),
            lat: row.latitude,
            long: row.longitude,
            imo,
        }))
    }

    /// Latest position and identity of a vessel.
    ///
    /// When `imo` or `name` is given, the vessel must have been reported
    /// with that value, otherwise the placeholder document is returned.
    pub async fn vessel_information(
        &self,
        mmsi: Mmsi,
        imo: Option<u32>,
        name: Option<&str>,
    ) -> Result<VesselDocument, AisStoreError> {
        let mut conn = self.pool.acquire().await?;
        let position = Self::latest_positions(&mut conn, mmsi, 1).await?.pop();

        let imo = match imo {
            Some(imo) => {
                let matched: Option<i64> = sqlx::query_scalar(
                    "SELECT id FROM ais_message WHERE mmsi = ?1 AND vessel_imo = ?2 LIMIT 1",
                )
                .bind(mmsi)
                .bind(imo)
                .fetch_optional(&mut *conn)
                .await?;
                if matched.is_none() {
                    return Ok(VesselDocument::default());
                }
                Some(imo)
            }
            None => match Self::resolved_imo(&mut conn, mmsi).await? {
                Some(imo) => Some(imo),
                None => Self::permanent_identity(&mut conn, mmsi)
                    .await?
                    .and_then(|v| v.imo),
            },
        };

        let name = match name {
            Some(name) => {
                let matched: Option<i64> = sqlx::query_scalar(
                    "SELECT s.ais_message_id
                     FROM static_data s
                     JOIN ais_message m ON m.id = s.ais_message_id
                     WHERE m.mmsi = ?1 AND s.name = ?2
                     LIMIT 1",
                )
                .bind(mmsi)
                .bind(name)
                .fetch_optional(&mut *conn)
                .await?;
                if matched.is_none() {
                    return Ok(VesselDocument::default());
                }
                Some(name.to_string())
            }
            None => match Self::transient_identity(&mut conn, mmsi).await?.name {
                Some(name) => Some(name),
                None => Self::permanent_identity(&mut conn, mmsi)
                    .await?
                    .and_then(|v| v.name),
            },
        };

        Ok(VesselDocument {
            mmsi: Some(mmsi),
            lat: position.as_ref().and_then(|p| p.latitude),
            long: position.as_ref().and_then(|p| p.longitude),
            name,
            imo,
        })
    }

    /// Vessels whose latest position lies in the tile
    pub async fn recent_positions_in_tile(
        &self,
        tile_id: i64,
    ) -> Result<Vec<VesselDocument>, AisStoreError> {
        let mut conn = self.pool.acquire().await?;
        let scale: Option<i64> = sqlx::query_scalar("SELECT scale FROM map_view WHERE id = ?1")
            .bind(tile_id)
            .fetch_optional(&mut *conn)
            .await?;
        let Some(scale) = scale else {
            debug!("No tile with id {}", tile_id);
            return Ok(Vec::new());
        };
        let column = map_view_column(Scale::try_from(scale)?);

        let query = format!(
            "{RANKED_POSITIONS} WHERE m.recency = 1 AND m.{column} = ?1 AND {} \
             ORDER BY m.timestamp DESC, m.id DESC",
            self.policy.message_condition()
        );
        let rows = sqlx::query_as(&query)
            .bind(tile_id)
            .fetch_all(&mut *conn)
            .await?;
        Self::vessel_documents(&mut conn, rows).await
    }

    /// Ports with the given name, optionally restricted to one country
    pub async fn matching_ports(
        &self,
        name: &str,
        country: Option<&str>,
    ) -> Result<Vec<PortDocument>, AisStoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::find_ports(&mut conn, name, country).await
    }

    async fn find_ports(
        conn: &mut SqliteConnection,
        name: &str,
        country: Option<&str>,
    ) -> Result<Vec<PortDocument>, AisStoreError> {
        let query = format!(
            "SELECT {PORT_COLUMNS} FROM port
             WHERE name = ?1 AND (?2 IS NULL OR country = ?2)
             ORDER BY id"
        );
        let rows: Vec<PortRow> = sqlx::query_as(&query)
            .bind(name)
            .bind(country)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.into_iter().map(PortDocument::from).collect())
    }

    /// Vessels in the scale 3 tile of a port
    pub async fn vessels_in_port_tile(
        &self,
        name: &str,
        country: &str,
    ) -> Result<PortLookup, AisStoreError> {
        let mut ports = self.matching_ports(name, Some(country)).await?;
        if ports.len() != 1 {
            return Ok(PortLookup::Ports(ports));
        }
        let port = ports.remove(0);
        let vessels = match port.map_view3_id {
            Some(tile_id) => self.recent_positions_in_tile(tile_id).await?,
            None => Vec::new(),
        };
        Ok(PortLookup::Vessels(vessels))
    }

    /// Most recent positions of a vessel, newest first
    pub async fn position_history(
        &self,
        mmsi: Mmsi,
        limit: u32,
    ) -> Result<PositionHistory, AisStoreError> {
        let mut conn = self.pool.acquire().await?;
        let rows = Self::latest_positions(&mut conn, mmsi, limit).await?;
        if rows.is_empty() {
            return Ok(PositionHistory::empty(mmsi));
        }
        let identity = Self::transient_identity(&mut conn, mmsi).await?;
        Ok(PositionHistory {
            mmsi,
            positions: Some(
                rows.into_iter()
                    .map(|row| Coordinates {
                        lat: row.latitude,
                        long: row.longitude,
                    })
                    .collect(),
            ),
            imo: identity.imo,
        })
    }

    /// Vessels whose static data preceding their latest position names the port
    pub async fn vessels_headed_to_port_id(
        &self,
        port_id: i64,
    ) -> Result<Vec<VesselDocument>, AisStoreError> {
        let mut conn = self.pool.acquire().await?;
        let query = format!(
            "{RANKED_POSITIONS}
             JOIN static_data s ON s.ais_message_id = m.last_static_data_id
             WHERE m.recency = 1 AND s.destination_port_id = ?1 AND {}
             ORDER BY m.timestamp DESC, m.id DESC",
            self.policy.message_condition()
        );
        let rows = sqlx::query_as(&query)
            .bind(port_id)
            .fetch_all(&mut *conn)
            .await?;
        Self::vessel_documents(&mut conn, rows).await
    }

    /// Vessels headed to a port given by name and country
    pub async fn vessels_headed_to_port(
        &self,
        name: &str,
        country: &str,
    ) -> Result<PortLookup, AisStoreError> {
        let mut ports = self.matching_ports(name, Some(country)).await?;
        if ports.len() != 1 {
            return Ok(PortLookup::Ports(ports));
        }
        let port = ports.remove(0);
        let vessels = match port.id {
            Some(port_id) => self.vessels_headed_to_port_id(port_id).await?,
            None => Vec::new(),
        };
        Ok(PortLookup::Vessels(vessels))
    }

    /// Tiles directly contained in the tile
    pub async fn contained_tiles(&self, tile_id: i64) -> Result<Vec<TileDocument>, AisStoreError> {
        let mut conn = self.pool.acquire().await?;
        let query = format!(
            "SELECT {MAP_VIEW_COLUMNS} FROM map_view WHERE container_map_view_id = ?1 ORDER BY id"
        );
        let rows: Vec<MapViewRow> = sqlx::query_as(&query)
            .bind(tile_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.into_iter().map(TileDocument::from).collect())
    }

    /// Raster file name of a tile
    pub async fn tile_raster_file(&self, tile_id: i64) -> Result<Option<String>, AisStoreError> {
        let mut conn = self.pool.acquire().await?;
        let raster_file: Option<Option<String>> =
            sqlx::query_scalar("SELECT raster_file FROM map_view WHERE id = ?1")
                .bind(tile_id)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(raster_file.flatten())
    }
}
