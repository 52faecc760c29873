use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{self, CodecError};
use crate::error::FartMapError;

/// Maximum length of a note, enforced when an event is submitted.
pub const NOTE_MAX_CHARS: usize = 120;

/// Display names longer than this are cut down at submission.
pub const DISPLAY_NAME_MAX_CHARS: usize = 40;

/// Label shown for events without a display name.
pub const ANONYMOUS_LABEL: &str = "Anonymous";

// --- Geo Types ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Planar distance in degrees. Not geodesic: a degree of longitude
    /// shrinks towards the poles.
    pub fn degree_distance(&self, other: &GeoPoint) -> f64 {
        let d_lat = self.lat - other.lat;
        let d_lng = self.lng - other.lng;
        (d_lat * d_lat + d_lng * d_lng).sqrt()
    }
}

/// Visible map viewport. `west > east` describes a box crossing the
/// antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self, FartMapError> {
        if south > north {
            return Err(FartMapError::Validation(format!(
                "bounding box south ({south}) is above north ({north})"
            )));
        }
        codec::check_range(south, west)?;
        codec::check_range(north, east)?;
        Ok(Self {
            south,
            west,
            north,
            east,
        })
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        if point.lat < self.south || point.lat > self.north {
            return false;
        }
        if self.west <= self.east {
            point.lng >= self.west && point.lng <= self.east
        } else {
            point.lng >= self.west || point.lng <= self.east
        }
    }
}

impl FromStr for BoundingBox {
    type Err = FartMapError;

    /// Parses `south,west,north,east`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| FartMapError::Validation(format!("invalid bounding box: {s:?}")))?;
        match parts.as_slice() {
            [south, west, north, east] => Self::new(*south, *west, *north, *east),
            _ => Err(FartMapError::Validation(format!(
                "bounding box needs 4 values (south,west,north,east), got {}",
                parts.len()
            ))),
        }
    }
}

// --- Enums ---

/// How the client obtained its position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    #[default]
    Gps,
    Ip,
}

impl std::fmt::Display for LocationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationSource::Gps => write!(f, "gps"),
            LocationSource::Ip => write!(f, "ip"),
        }
    }
}

impl FromStr for LocationSource {
    type Err = FartMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gps" => Ok(LocationSource::Gps),
            "ip" => Ok(LocationSource::Ip),
            other => Err(FartMapError::Validation(format!("unknown location source: {other}"))),
        }
    }
}

// --- Events ---

/// A decoded event as served to readers. Coordinates are privacy-rounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub source: LocationSource,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Event {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(ANONYMOUS_LABEL)
    }
}

/// Request body for a new event. Accepts the short field names older
/// clients send (`lat`, `lng`, `ts`, `username`, `description`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubmission {
    #[serde(default, alias = "lat", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lng", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<LocationSource>,
    #[serde(default, alias = "ts", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, alias = "username", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, alias = "description", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl EventSubmission {
    /// Check coordinates and normalise optional fields. `now` fills a
    /// missing timestamp.
    pub fn validate(self, now: DateTime<Utc>) -> Result<Event, FartMapError> {
        let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
            return Err(FartMapError::Validation(
                "latitude and longitude are required numbers".to_string(),
            ));
        };
        codec::check_range(latitude, longitude).map_err(|e| match e {
            CodecError::OutOfRange { lat, lng } => FartMapError::Validation(format!(
                "coordinates ({lat}, {lng}) are outside [-90,90]x[-180,180]"
            )),
            other => other.into(),
        })?;

        if let Some(accuracy) = self.accuracy {
            if !accuracy.is_finite() || accuracy < 0.0 {
                return Err(FartMapError::Validation(format!(
                    "accuracy must be a non-negative number of meters, got {accuracy}"
                )));
            }
        }

        Ok(Event {
            latitude,
            longitude,
            accuracy: self.accuracy,
            source: self.source.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or(now),
            device_id: non_blank(self.device_id),
            display_name: non_blank(self.display_name)
                .map(|n| truncate_chars(&n, DISPLAY_NAME_MAX_CHARS)),
            note: non_blank(self.note).map(|n| truncate_chars(&n, NOTE_MAX_CHARS)),
        })
    }
}

/// One record as persisted. Coordinates are written only as the encoded
/// pair; raw floats are read for records that predate encoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    #[serde(default, alias = "hexLat", skip_serializing_if = "Option::is_none")]
    pub encoded_lat: Option<String>,
    #[serde(default, alias = "hexLng", skip_serializing_if = "Option::is_none")]
    pub encoded_lng: Option<String>,
    #[serde(default, alias = "lat", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lng", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<LocationSource>,
    #[serde(default, alias = "ts", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, alias = "username", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, alias = "description", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StoredEvent {
    pub fn encode(event: &Event) -> Result<Self, FartMapError> {
        let encoded = codec::encode(event.latitude, event.longitude)?;
        Ok(Self {
            encoded_lat: Some(encoded.lat),
            encoded_lng: Some(encoded.lng),
            latitude: None,
            longitude: None,
            accuracy: event.accuracy,
            source: Some(event.source),
            timestamp: Some(event.timestamp),
            device_id: event.device_id.clone(),
            display_name: event.display_name.clone(),
            note: event.note.clone(),
        })
    }

    /// Decode into the public, privacy-rounded form. The encoded pair wins
    /// over raw floats when both are present.
    pub fn decode(&self) -> Result<Event, FartMapError> {
        let (latitude, longitude) = match (
            &self.encoded_lat,
            &self.encoded_lng,
            self.latitude,
            self.longitude,
        ) {
            (Some(hex_lat), Some(hex_lng), _, _) => codec::decode_rounded(hex_lat, hex_lng)?,
            (_, _, Some(lat), Some(lng)) => {
                codec::check_range(lat, lng)?;
                (codec::round_for_display(lat), codec::round_for_display(lng))
            }
            _ => return Err(FartMapError::MissingCoordinates),
        };
        let timestamp = self.timestamp.ok_or(FartMapError::MissingTimestamp)?;

        Ok(Event {
            latitude,
            longitude,
            accuracy: self.accuracy,
            source: self.source.unwrap_or_default(),
            timestamp,
            device_id: self.device_id.clone(),
            display_name: self.display_name.clone(),
            note: self.note.clone(),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
