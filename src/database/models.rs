// src/database/models.rs
use crate::{
    documents::{PortDocument, TileDocument},
    models::Mmsi,
};

/// Latest known position of a vessel
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PositionRow {
    pub mmsi: Mmsi,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Name and IMO carried by one static data message
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct IdentityRow {
    pub name: Option<String>,
    pub imo: Option<u32>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PortRow {
    id: i64,
    name: String,
    country: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    map_view1_id: Option<i64>,
    map_view2_id: Option<i64>,
    map_view3_id: Option<i64>,
}

impl From<PortRow> for PortDocument {
    fn from(row: PortRow) -> Self {
        PortDocument {
            id: Some(row.id),
            name: Some(row.name),
            country: Some(row.country),
            lat: row.latitude,
            long: row.longitude,
            map_view1_id: row.map_view1_id,
            map_view2_id: row.map_view2_id,
            map_view3_id: row.map_view3_id,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MapViewRow {
    id: i64,
    name: Option<String>,
    longitude_w: f64,
    latitude_s: f64,
    longitude_e: f64,
    latitude_n: f64,
    scale: u8,
    raster_file: Option<String>,
    image_width: Option<i64>,
    image_height: Option<i64>,
    actual_longitude_w: Option<f64>,
    actual_latitude_s: Option<f64>,
    actual_longitude_e: Option<f64>,
    actual_latitude_n: Option<f64>,
    container_map_view_id: Option<i64>,
}

impl From<MapViewRow> for TileDocument {
    fn from(row: MapViewRow) -> Self {
        TileDocument {
            id: Some(row.id),
            name: row.name,
            longitude_w: Some(row.longitude_w),
            latitude_s: Some(row.latitude_s),
            longitude_e: Some(row.longitude_e),
            latitude_n: Some(row.latitude_n),
            scale: Some(row.scale),
            raster_file: row.raster_file,
            image_width: row.image_width,
            image_height: row.image_height,
            actual_longitude_w: row.actual_longitude_w,
            actual_latitude_s: row.actual_latitude_s,
            actual_longitude_e: row.actual_longitude_e,
            actual_latitude_n: row.actual_latitude_n,
            container_map_view_id: row.container_map_view_id,
        }
    }
}
