//! Encoded polyline format (precision 5) as emitted by OSRM with
//! `geometries=polyline`.
//!
//! Each coordinate is stored as the delta from the previous one, zig-zag
//! encoded and split into 5-bit chunks offset by 63 so the result is
//! printable ASCII. Latitude comes first in every pair.

use thiserror::Error;

use crate::models::Coordinate;

const FACTOR: f64 = 1e5;
const CHUNK_OFFSET: i64 = 63;
const CONTINUATION: i64 = 0x20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolylineError {
    #[error("invalid character {byte:#04x} at position {position}")]
    InvalidByte { position: usize, byte: u8 },
    #[error("polyline ends in the middle of a value")]
    Truncated,
    #[error("value starting at position {0} does not fit in 64 bits")]
    Overflow(usize),
}

pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut coordinates = Vec::with_capacity(bytes.len() / 4);
    let mut index = 0;
    let mut lat = 0i64;
    let mut lon = 0i64;

    while index < bytes.len() {
        lat = accumulate(lat, bytes, &mut index)?;
        lon = accumulate(lon, bytes, &mut index)?;
        coordinates.push(Coordinate {
            lat: lat as f64 / FACTOR,
            lon: lon as f64 / FACTOR,
        });
    }

    Ok(coordinates)
}

pub fn encode(path: &[Coordinate]) -> String {
    let mut out = String::with_capacity(path.len() * 8);
    let mut prev_lat = 0i64;
    let mut prev_lon = 0i64;

    for coord in path {
        let lat = (coord.lat * FACTOR).round() as i64;
        let lon = (coord.lon * FACTOR).round() as i64;
        push_value(&mut out, lat - prev_lat);
        push_value(&mut out, lon - prev_lon);
        prev_lat = lat;
        prev_lon = lon;
    }

    out
}

/// Adds the next delta to a running coordinate, rejecting sums that leave `i64`.
fn accumulate(current: i64, bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let start = *index;
    let delta = next_value(bytes, index)?;
    current
        .checked_add(delta)
        .ok_or(PolylineError::Overflow(start))
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let start = *index;
    let mut result = 0i64;
    let mut shift = 0u32;

    loop {
        let byte = *bytes.get(*index).ok_or(PolylineError::Truncated)?;
        let chunk = i64::from(byte) - CHUNK_OFFSET;
        if !(0..64).contains(&chunk) {
            return Err(PolylineError::InvalidByte {
                position: *index,
                byte,
            });
        }
        if shift > 60 {
            return Err(PolylineError::Overflow(start));
        }
        *index += 1;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < CONTINUATION {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

fn push_value(out: &mut String, delta: i64) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };
    while value >= CONTINUATION {
        out.push(char::from(((CONTINUATION | (value & 0x1f)) + CHUNK_OFFSET) as u8));
        value >>= 5;
    }
    out.push(char::from((value + CHUNK_OFFSET) as u8));
}
