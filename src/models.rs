//! Data models.
//!
//! Incoming AIS messages are loosely typed JSON objects. The structs in this
//! module give them a fixed shape: every field is optional, values that
//! cannot be coerced into the expected type become `None`, and the
//! sentinels `"Unknown"` and `"Unknown value"` are read as missing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AisStoreError;
use serde_helpers::*;

/// Storage format of timestamps
pub const STORAGE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Maritime Mobile Service Identity (MMSI)
///
/// A unique nine-digit number for identifying vessels in AIS messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Mmsi(u32);

impl TryFrom<u32> for Mmsi {
    type Error = AisStoreError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value > 999_999_999 {
            return Err(AisStoreError::InvalidMmsi(value.to_string()));
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Mmsi {
    type Error = AisStoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parsed = value
            .parse::<u32>()
            .map_err(|_| AisStoreError::InvalidMmsi(value.to_string()))?;
        Self::try_from(parsed)
    }
}

impl Mmsi {
    /// Get the raw MMSI value
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Kind of an AIS message, given in field `MsgType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    PositionReport,
    StaticData,
}

impl MessageKind {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "position_report" => Some(MessageKind::PositionReport),
            "static_data" => Some(MessageKind::StaticData),
            _ => None,
        }
    }
}

/// Fields common to every AIS message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AisMessage {
    /// Time of the message, without sub-second precision
    #[serde(rename = "Timestamp", default, with = "storage_time")]
    pub timestamp: Option<NaiveDateTime>,
    /// Transponder class, e.g. "Class A" or "AtoN"
    #[serde(rename = "Class", default, deserialize_with = "known_string")]
    pub class: Option<String>,
    #[serde(rename = "MMSI", default, deserialize_with = "lenient_mmsi")]
    pub mmsi: Option<Mmsi>,
    /// IMO number as reported by the vessel
    #[serde(rename = "IMO", default, deserialize_with = "lenient_u32")]
    pub imo: Option<u32>,
    #[serde(rename = "MsgType", default, deserialize_with = "lenient_kind")]
    pub msg_type: Option<MessageKind>,
}

/// Reported position, `coordinates` is `[latitude, longitude]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl Position {
    pub fn latitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// Position report fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PositionReport {
    /// None unless the value is an object with `type` and `coordinates`
    #[serde(rename = "Position", default, deserialize_with = "lenient_position")]
    pub position: Option<Position>,
    /// Navigational status, e.g. "Under way using engine"
    #[serde(rename = "Status", default, deserialize_with = "known_string")]
    pub status: Option<String>,
    /// Rate of turn, degrees per minute
    #[serde(rename = "RoT", default, deserialize_with = "lenient_f64")]
    pub rate_of_turn: Option<f64>,
    /// Speed over ground in knots
    #[serde(rename = "SoG", default, deserialize_with = "lenient_f64")]
    pub speed_over_ground: Option<f64>,
    /// Course over ground in degrees
    #[serde(rename = "CoG", default, deserialize_with = "lenient_f64")]
    pub course_over_ground: Option<f64>,
    /// Heading in degrees
    #[serde(rename = "Heading", default, deserialize_with = "lenient_i32")]
    pub heading: Option<i32>,
}

/// Static data fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StaticData {
    #[serde(rename = "CallSign", default, deserialize_with = "known_string")]
    pub call_sign: Option<String>,
    #[serde(rename = "Name", default, deserialize_with = "known_string")]
    pub name: Option<String>,
    #[serde(rename = "VesselType", default, deserialize_with = "known_string")]
    pub vessel_type: Option<String>,
    #[serde(rename = "CargoType", default, deserialize_with = "known_string")]
    pub cargo_type: Option<String>,
    /// Length in metres
    #[serde(rename = "Length", default, deserialize_with = "lenient_i32")]
    pub length: Option<i32>,
    /// Breadth in metres
    #[serde(rename = "Breadth", default, deserialize_with = "lenient_i32")]
    pub breadth: Option<i32>,
    /// Maximum present static draught in metres
    #[serde(rename = "Draught", default, deserialize_with = "lenient_f64")]
    pub draught: Option<f64>,
    /// Destination as typed in by the crew
    #[serde(rename = "Destination", default, deserialize_with = "known_string")]
    pub destination: Option<String>,
    /// Port id the destination was matched to
    #[serde(rename = "DestinationId", default, deserialize_with = "lenient_i64")]
    pub destination_id: Option<i64>,
    /// Estimated time of arrival
    #[serde(rename = "ETA", default, with = "storage_time")]
    pub eta: Option<NaiveDateTime>,
}

impl AisMessage {
    /// Format the common fields of a raw message
    pub fn format(raw: &Value) -> Result<Self, AisStoreError> {
        Ok(Self::deserialize(raw)?)
    }
}

impl PositionReport {
    /// Format the position report fields of a raw message
    pub fn format(raw: &Value) -> Result<Self, AisStoreError> {
        Ok(Self::deserialize(raw)?)
    }
}

impl StaticData {
    /// Format the static data fields of a raw message
    pub fn format(raw: &Value) -> Result<Self, AisStoreError> {
        Ok(Self::deserialize(raw)?)
    }
}

/// Type specific part of an AIS message
#[derive(Debug, Clone, PartialEq)]
pub enum AisMessageType {
    PositionReport(PositionReport),
    StaticData(StaticData),
}

/// A formatted AIS message, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedMessage {
    pub message: AisMessage,
    pub message_type: AisMessageType,
}

impl FormattedMessage {
    /// Format a raw message into its fixed shape.
    ///
    /// Fails if `raw` is not a JSON object or `MsgType` does not name a
    /// known message kind.
    pub fn format(raw: &Value) -> Result<Self, AisStoreError> {
        if !raw.is_object() {
            return Err(AisStoreError::InvalidMessage(
                "message is not a JSON object".to_string(),
            ));
        }
        let message = AisMessage::format(raw)?;
        let message_type = match message.msg_type {
            Some(MessageKind::PositionReport) => {
                AisMessageType::PositionReport(PositionReport::format(raw)?)
            }
            Some(MessageKind::StaticData) => AisMessageType::StaticData(StaticData::format(raw)?),
            None => {
                let given = raw.get("MsgType").map(Value::to_string).unwrap_or_default();
                return Err(AisStoreError::UnknownMessageType(given));
            }
        };
        Ok(Self {
            message,
            message_type,
        })
    }

    /// Flat JSON document with every field of the message kind present
    pub fn to_document(&self) -> Result<Value, AisStoreError> {
        let mut document = into_object(serde_json::to_value(&self.message)?);
        let details = match &self.message_type {
            AisMessageType::PositionReport(report) => serde_json::to_value(report)?,
            AisMessageType::StaticData(data) => serde_json::to_value(data)?,
        };
        document.extend(into_object(details));
        Ok(Value::Object(document))
    }
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Parse an ISO-8601 timestamp, dropping sub-second precision.
///
/// Timestamps with an offset keep their wall-clock time. Also accepts the
/// storage format, so parsing a formatted timestamp yields itself.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    let parsed = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(parsed.with_nanosecond(0).unwrap_or(parsed))
}

/// Render a timestamp in storage format
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(STORAGE_TIME_FORMAT).to_string()
}

fn is_unknown(value: &str) -> bool {
    value == "Unknown" || value == "Unknown value"
}

/// Custom deserializers
///
/// All of these accept any JSON value and never fail: values of the wrong
/// shape are read as `None`.
mod serde_helpers {
    use super::{is_unknown, MessageKind, Mmsi, Position};
    use serde::{self, Deserialize, Deserializer};
    use serde_json::Value;

    pub fn known_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) if is_unknown(&s) => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(coerce_f64(&value))
    }

    pub fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(coerce_i64(&value))
    }

    pub fn lenient_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(coerce_i64(&value).and_then(|v| i32::try_from(v).ok()))
    }

    pub fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(coerce_i64(&value).and_then(|v| u32::try_from(v).ok()))
    }

    pub fn lenient_mmsi<'de, D>(deserializer: D) -> Result<Option<Mmsi>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(coerce_i64(&value)
            .and_then(|v| u32::try_from(v).ok())
            .and_then(|v| Mmsi::try_from(v).ok()))
    }

    pub fn lenient_kind<'de, D>(deserializer: D) -> Result<Option<MessageKind>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().and_then(MessageKind::parse))
    }

    pub fn lenient_position<'de, D>(deserializer: D) -> Result<Option<Position>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(coerce_position(&value))
    }

    fn coerce_f64(value: &Value) -> Option<f64> {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        number.is_finite().then_some(number)
    }

    fn coerce_i64(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    fn coerce_position(value: &Value) -> Option<Position> {
        let object = value.as_object()?;
        let kind = object.get("type")?.as_str()?.to_string();
        match object.get("coordinates")?.as_array()?.as_slice() {
            [latitude, longitude] => Some(Position {
                kind,
                coordinates: [latitude.as_f64()?, longitude.as_f64()?],
            }),
            _ => None,
        }
    }

    /// Optional timestamps, written in storage format
    pub mod storage_time {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};
        use serde_json::Value;

        use super::super::{format_timestamp, parse_timestamp};

        pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(timestamp) => serializer.serialize_str(&format_timestamp(timestamp)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = Value::deserialize(deserializer)?;
            Ok(value.as_str().and_then(parse_timestamp))
        }
    }
}
