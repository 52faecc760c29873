//! Fixed-point hexadecimal coordinate encoding.
//!
//! Coordinates are scaled by 10^5 (about one meter), rounded to the nearest
//! integer and rendered as lowercase hex. Negative values keep their sign as
//! a leading `-` in front of the hex magnitude; no +90/+180 offset is applied,
//! so data written with an offset convention will not decode correctly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed-point scale applied before hex rendering.
pub const COORDINATE_SCALE: f64 = 1e5;

/// Decimal places kept in coordinates handed back to callers (~10 m).
pub const DISPLAY_DECIMALS: i32 = 4;

pub const LAT_RANGE: (f64, f64) = (-90.0, 90.0);
pub const LNG_RANGE: (f64, f64) = (-180.0, 180.0);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Invalid hex coordinate: {0:?}")]
    InvalidHex(String),

    #[error("Coordinates out of range: ({lat}, {lng})")]
    OutOfRange { lat: f64, lng: f64 },
}

/// A latitude/longitude pair in its stored, hex-encoded form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedCoordinates {
    pub lat: String,
    pub lng: String,
}

/// Reject non-finite values and anything outside [-90,90]×[-180,180].
pub fn check_range(lat: f64, lng: f64) -> Result<(), CodecError> {
    let lat_ok = lat.is_finite() && (LAT_RANGE.0..=LAT_RANGE.1).contains(&lat);
    let lng_ok = lng.is_finite() && (LNG_RANGE.0..=LNG_RANGE.1).contains(&lng);
    if lat_ok && lng_ok {
        Ok(())
    } else {
        Err(CodecError::OutOfRange { lat, lng })
    }
}

pub fn encode(lat: f64, lng: f64) -> Result<EncodedCoordinates, CodecError> {
    check_range(lat, lng)?;
    Ok(EncodedCoordinates {
        lat: encode_component(lat),
        lng: encode_component(lng),
    })
}

/// Decode at full stored precision. Round-trips [`encode`] within 1e-5 degrees.
pub fn decode(hex_lat: &str, hex_lng: &str) -> Result<(f64, f64), CodecError> {
    let lat = decode_component(hex_lat)?;
    let lng = decode_component(hex_lng)?;
    check_range(lat, lng)?;
    Ok((lat, lng))
}

/// Decode and then drop to [`DISPLAY_DECIMALS`] places. This is what the
/// read path serves.
pub fn decode_rounded(hex_lat: &str, hex_lng: &str) -> Result<(f64, f64), CodecError> {
    let (lat, lng) = decode(hex_lat, hex_lng)?;
    Ok((round_for_display(lat), round_for_display(lng)))
}

pub fn round_for_display(value: f64) -> f64 {
    let factor = 10f64.powi(DISPLAY_DECIMALS);
    (value * factor).round() / factor
}

fn encode_component(value: f64) -> String {
    let fixed = (value * COORDINATE_SCALE).round() as i64;
    if fixed < 0 {
        format!("-{:x}", fixed.unsigned_abs())
    } else {
        format!("{fixed:x}")
    }
}

fn decode_component(text: &str) -> Result<f64, CodecError> {
    let trimmed = text.trim();
    let fixed = i64::from_str_radix(trimmed, 16)
        .map_err(|_| CodecError::InvalidHex(text.to_string()))?;
    Ok(fixed as f64 / COORDINATE_SCALE)
}
