//! Response documents.
//!
//! Every query answers with one of these shapes, serialized to JSON with the
//! field names clients already use (`MMSI`, `lat`, `long`, ...). Missing
//! values are always JSON `null`.

use serde::{Serialize, Serializer};

use crate::models::Mmsi;

/// Vessel position with resolved identity
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct VesselDocument {
    #[serde(rename = "MMSI")]
    pub mmsi: Option<Mmsi>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "IMO")]
    pub imo: Option<u32>,
}

impl VesselDocument {
    /// Drop the name, leaving a position document
    pub fn into_position(self) -> PositionDocument {
        PositionDocument {
            mmsi: self.mmsi,
            lat: self.lat,
            long: self.long,
            imo: self.imo,
        }
    }
}

/// Vessel position with IMO only
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PositionDocument {
    #[serde(rename = "MMSI")]
    pub mmsi: Option<Mmsi>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    #[serde(rename = "IMO")]
    pub imo: Option<u32>,
}

/// Name and IMO of a vessel
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct VesselIdentity {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "IMO")]
    pub imo: Option<u32>,
}

/// Latitude and longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: Option<f64>,
    pub long: Option<f64>,
}

/// Recent positions of one vessel, newest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionHistory {
    #[serde(rename = "MMSI")]
    pub mmsi: Mmsi,
    /// None when the vessel has no position reports
    #[serde(rename = "Positions")]
    pub positions: Option<Vec<Coordinates>>,
    #[serde(rename = "IMO")]
    pub imo: Option<u32>,
}

impl PositionHistory {
    pub fn empty(mmsi: Mmsi) -> Self {
        Self {
            mmsi,
            positions: None,
            imo: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PortDocument {
    #[serde(rename = "Id")]
    pub id: Option<i64>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Country")]
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    #[serde(rename = "MapView1_Id")]
    pub map_view1_id: Option<i64>,
    #[serde(rename = "MapView2_Id")]
    pub map_view2_id: Option<i64>,
    #[serde(rename = "MapView3_Id")]
    pub map_view3_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct TileDocument {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub longitude_w: Option<f64>,
    pub latitude_s: Option<f64>,
    pub longitude_e: Option<f64>,
    pub latitude_n: Option<f64>,
    pub scale: Option<u8>,
    pub raster_file: Option<String>,
    pub image_width: Option<i64>,
    pub image_height: Option<i64>,
    pub actual_longitude_w: Option<f64>,
    pub actual_latitude_s: Option<f64>,
    pub actual_longitude_e: Option<f64>,
    pub actual_latitude_n: Option<f64>,
    #[serde(rename = "ContainerMapView_Id")]
    pub container_map_view_id: Option<i64>,
}

/// `{"vessels": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vessels<T> {
    pub vessels: Vec<T>,
}

/// `{"ports": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ports {
    pub ports: Vec<PortDocument>,
}

/// `{"tiles": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tiles {
    pub tiles: Vec<TileDocument>,
}

impl<T> Default for Vessels<T> {
    fn default() -> Self {
        Self {
            vessels: Vec::new(),
        }
    }
}

/// Answer to a query addressed by port name.
///
/// A unique port yields the vessels, otherwise the candidate ports are
/// returned so the caller can pick one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortLookup {
    Ports(Vec<PortDocument>),
    Vessels(Vec<VesselDocument>),
}

impl Default for PortLookup {
    fn default() -> Self {
        PortLookup::Ports(Vec::new())
    }
}

/// A single document, serialized as `{}` when absent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Lookup<T> {
    Found(T),
    Empty {},
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(document) => Lookup::Found(document),
            None => Lookup::Empty {},
        }
    }
}

/// `{"success": 1}` or `{"success": 0}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InsertStatus {
    #[serde(serialize_with = "bool_as_int")]
    pub success: bool,
}

impl InsertStatus {
    pub const SUCCESS: InsertStatus = InsertStatus { success: true };
    pub const FAILURE: InsertStatus = InsertStatus { success: false };
}

/// `{"deletions": n}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deletions {
    pub deletions: u64,
}

/// Result of a batch insert, `{"inserts": n}` or `-1` for a rejected payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Inserted(usize),
    Rejected,
}

impl Serialize for BatchOutcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Inserts {
            inserts: usize,
        }

        match self {
            BatchOutcome::Inserted(inserts) => Inserts { inserts: *inserts }.serialize(serializer),
            BatchOutcome::Rejected => serializer.serialize_i8(-1),
        }
    }
}

/// Base64 encoded tile raster, or `-1` when it cannot be served
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileImage {
    Encoded(String),
    Unavailable,
}

impl Serialize for TileImage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            TileImage::Encoded(data) => serializer.serialize_str(data),
            TileImage::Unavailable => serializer.serialize_i8(-1),
        }
    }
}

fn bool_as_int<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u8(u8::from(*value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholder_vessel_is_all_null() {
        let document = serde_json::to_value(VesselDocument::default()).unwrap();
        assert_eq!(
            document,
            json!({"MMSI": null, "lat": null, "long": null, "Name": null, "IMO": null})
        );
    }

    #[test]
    fn placeholder_port_is_all_null() {
        let document = serde_json::to_value(PortDocument::default()).unwrap();
        assert_eq!(
            document,
            json!({
                "Id": null,
                "Name": null,
                "Country": null,
                "lat": null,
                "long": null,
                "MapView1_Id": null,
                "MapView2_Id": null,
                "MapView3_Id": null
            })
        );
    }

    #[test]
    fn placeholder_tile_is_all_null() {
        let document = serde_json::to_value(TileDocument::default()).unwrap();
        let keys = [
            "Id",
            "Name",
            "LongitudeW",
            "LatitudeS",
            "LongitudeE",
            "LatitudeN",
            "Scale",
            "RasterFile",
            "ImageWidth",
            "ImageHeight",
            "ActualLongitudeW",
            "ActualLatitudeS",
            "ActualLongitudeE",
            "ActualLatitudeN",
            "ContainerMapView_Id",
        ];
        let object = document.as_object().unwrap();
        assert_eq!(object.len(), keys.len());
        for key in keys {
            assert_eq!(object.get(key), Some(&serde_json::Value::Null), "missing {key}");
        }
    }

    #[test]
    fn vessel_without_name() {
        let vessel = VesselDocument {
            mmsi: Some(Mmsi::try_from(219005465).unwrap()),
            lat: Some(56.218332),
            long: Some(12.771672),
            name: Some("Not Johann".to_string()),
            imo: Some(1234567),
        };
        let document = serde_json::to_value(vessel.into_position()).unwrap();
        assert_eq!(
            document,
            json!({"MMSI": 219005465, "lat": 56.218332, "long": 12.771672, "IMO": 1234567})
        );
    }

    #[test]
    fn status_documents() {
        assert_eq!(
            serde_json::to_value(InsertStatus::SUCCESS).unwrap(),
            json!({"success": 1})
        );
        assert_eq!(
            serde_json::to_value(InsertStatus::FAILURE).unwrap(),
            json!({"success": 0})
        );
        assert_eq!(
            serde_json::to_value(BatchOutcome::Inserted(7)).unwrap(),
            json!({"inserts": 7})
        );
        assert_eq!(serde_json::to_value(BatchOutcome::Rejected).unwrap(), json!(-1));
        assert_eq!(serde_json::to_value(TileImage::Unavailable).unwrap(), json!(-1));
        assert_eq!(
            serde_json::to_value(Deletions { deletions: 3 }).unwrap(),
            json!({"deletions": 3})
        );
    }

    #[test]
    fn port_lookup_shapes() {
        let ports = PortLookup::Ports(vec![PortDocument::default()]);
        let document = serde_json::to_value(ports).unwrap();
        assert!(document["ports"].is_array());

        let vessels = PortLookup::Vessels(Vec::new());
        assert_eq!(serde_json::to_value(vessels).unwrap(), json!({"vessels": []}));
    }

    #[test]
    fn missing_lookup_is_empty_object() {
        let lookup: Lookup<PositionDocument> = None.into();
        assert_eq!(serde_json::to_value(lookup).unwrap(), json!({}));

        let lookup: Lookup<PositionDocument> = Some(PositionDocument::default()).into();
        assert_eq!(
            serde_json::to_value(lookup).unwrap(),
            json!({"MMSI": null, "lat": null, "long": null, "IMO": null})
        );
    }

    #[test]
    fn empty_history() {
        let history = PositionHistory::empty(Mmsi::try_from(333).unwrap());
        assert_eq!(
            serde_json::to_value(history).unwrap(),
            json!({"MMSI": 333, "Positions": null, "IMO": null})
        );
    }
}
