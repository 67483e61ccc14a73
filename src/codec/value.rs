//! # Bus Value Codec
//!
//! Requests on the KNX bus carry no indication of how their payload bytes
//! should be interpreted; that knowledge is part of the group definition and
//! is expressed as a datatype tag in the range 1-15. This module converts
//! between raw payloads (as returned by a group read) and typed values, and
//! packs typed values into the length-prefixed frame a group write expects.
//!
//! Payload indexing is 0-based on the bytes following the acknowledgment
//! header; index 0 is a reserved marker byte and true data starts at index 1
//! for the multi-byte tags.

use crate::error::KnxMuxError;
use bytes::{BufMut, BytesMut};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// The datatype tags assignable to a bus group.
///
/// Each variant fixes one decode rule and, where the protocol defines one,
/// one encode rule. The discriminants are the on-wire tag numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    /// 1-bit switch state.
    Switching = 1,
    /// Signed 3-bit dimming step.
    Dimming = 2,
    /// Time of day.
    Time = 3,
    /// Calendar date.
    Date = 4,
    /// 2-octet float with 4-bit exponent and 11-bit mantissa.
    Value = 5,
    /// 8-bit scaling value.
    Scaling = 6,
    /// 1-bit drive control.
    DriveControl = 7,
    /// 2-bit priority.
    Priority = 8,
    /// 32-bit IEEE-754 float.
    FloatValue = 9,
    /// 16-bit counter.
    Counter16 = 10,
    /// 32-bit counter.
    Counter32 = 11,
    /// Access control blob.
    Access = 12,
    /// Single character code.
    Character = 13,
    /// 8-bit counter.
    Counter8 = 14,
    /// 14-byte text.
    Text = 15,
}

/// How a decoded value should be presented to an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Number,
    Text,
}

impl DataType {
    /// The on-wire tag number.
    pub fn tag(&self) -> u8 {
        *self as u8
    }

    /// Presentation kind of values carried by this tag.
    ///
    /// Tag 13 decodes to an integer character code yet is classified as
    /// text; this matches the gateway's documented contract and is kept
    /// as-is (see the regression test).
    pub fn value_kind(&self) -> ValueKind {
        match self {
            DataType::Access | DataType::Character | DataType::Text => ValueKind::Text,
            _ => ValueKind::Number,
        }
    }
}

impl TryFrom<u8> for DataType {
    type Error = KnxMuxError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(DataType::Switching),
            2 => Ok(DataType::Dimming),
            3 => Ok(DataType::Time),
            4 => Ok(DataType::Date),
            5 => Ok(DataType::Value),
            6 => Ok(DataType::Scaling),
            7 => Ok(DataType::DriveControl),
            8 => Ok(DataType::Priority),
            9 => Ok(DataType::FloatValue),
            10 => Ok(DataType::Counter16),
            11 => Ok(DataType::Counter32),
            12 => Ok(DataType::Access),
            13 => Ok(DataType::Character),
            14 => Ok(DataType::Counter8),
            15 => Ok(DataType::Text),
            other => Err(KnxMuxError::UnknownDataType(other)),
        }
    }
}

/// A decoded (or to-be-encoded) application value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BusValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// The length-prefixed wire envelope of an encoded value.
///
/// `length` counts the payload bytes that follow the 2-byte prefix; the
/// whole envelope is the data part of a group write command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub length: u16,
    pub payload: Vec<u8>,
}

impl RawFrame {
    pub fn new(payload: Vec<u8>) -> Self {
        RawFrame {
            length: payload.len() as u16,
            payload,
        }
    }

    /// Serializes the envelope: big-endian length, then the payload.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(2 + self.payload.len());
        buf.put_u16(self.length);
        buf.put_slice(&self.payload);
        buf.to_vec()
    }
}

fn need(payload: &[u8], expected: usize) -> Result<(), KnxMuxError> {
    if payload.len() < expected {
        return Err(KnxMuxError::TruncatedPayload {
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

/// Decodes a raw group-read payload according to its datatype tag.
pub fn decode(tag: DataType, payload: &[u8]) -> Result<BusValue, KnxMuxError> {
    match tag {
        DataType::Switching | DataType::DriveControl => {
            need(payload, 1)?;
            Ok(BusValue::Integer((payload[0] & 0x01) as i64))
        }
        DataType::Dimming => {
            need(payload, 1)?;
            let magnitude = (payload[0] & 0x07) as i64;
            if payload[0] & 0x08 != 0 {
                Ok(BusValue::Integer(-magnitude))
            } else {
                Ok(BusValue::Integer(magnitude))
            }
        }
        DataType::Priority => {
            need(payload, 1)?;
            Ok(BusValue::Integer((payload[0] & 0x03) as i64))
        }
        DataType::Time => {
            need(payload, 4)?;
            let seconds = (payload[1] & 0x1f) as i64 * 3600
                + (payload[2] & 0x3f) as i64 * 60
                + (payload[3] & 0x3f) as i64;
            Ok(BusValue::Integer(seconds))
        }
        DataType::Date => {
            need(payload, 4)?;
            let day = (payload[1] & 0x1f) as u32;
            let month = (payload[2] & 0x0f) as u32;
            let mut year = payload[3] as i32;
            if year < 90 {
                year += 100;
            }
            year += 1900;
            let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
                KnxMuxError::InvalidDate(format!("{year:04}/{month:02}/{day:02}"))
            })?;
            let midnight = date.and_time(NaiveTime::MIN);
            Ok(BusValue::Integer(midnight.and_utc().timestamp()))
        }
        DataType::Value => {
            need(payload, 3)?;
            let exponent = (payload[1] & 0x78) >> 3;
            let mut mantissa = (((payload[1] & 0x07) as i32) << 8) | payload[2] as i32;
            if payload[1] & 0x80 != 0 {
                mantissa -= 2048;
            }
            Ok(BusValue::Float(
                mantissa as f64 * 0.01 * f64::powi(2.0, exponent as i32),
            ))
        }
        DataType::Scaling | DataType::Counter8 => {
            need(payload, 2)?;
            Ok(BusValue::Integer(payload[1] as i64))
        }
        DataType::FloatValue => {
            need(payload, 5)?;
            // Float bytes travel in host order; the gateway memcpys them.
            let bits = [payload[1], payload[2], payload[3], payload[4]];
            Ok(BusValue::Float(f32::from_ne_bytes(bits) as f64))
        }
        DataType::Counter16 => {
            need(payload, 3)?;
            Ok(BusValue::Integer(
                (((payload[1] as u16) << 8) | payload[2] as u16) as i64,
            ))
        }
        DataType::Counter32 => {
            need(payload, 5)?;
            let value = ((payload[1] as u32) << 24)
                | ((payload[2] as u32) << 16)
                | ((payload[3] as u32) << 8)
                | payload[4] as u32;
            Ok(BusValue::Integer(value as i64))
        }
        DataType::Access => {
            need(payload, 5)?;
            // Legacy access composite: hex of byte 4, then six decimal
            // nibbles with byte 3's high nibble appearing twice. Kept
            // bit-for-bit; pinned by regression test.
            let mut text = format!("{:x}", payload[4]);
            let _ = write!(
                text,
                "{}{}{}{}{}{}",
                (payload[1] & 0xf0) >> 4,
                payload[2] & 0x0f,
                (payload[3] & 0xf0) >> 4,
                payload[4] & 0x0f,
                (payload[3] & 0xf0) >> 4,
                payload[3] & 0x0f,
            );
            Ok(BusValue::Text(text))
        }
        DataType::Character => {
            need(payload, 2)?;
            Ok(BusValue::Integer(payload[1] as i64))
        }
        DataType::Text => {
            need(payload, 1)?;
            Ok(BusValue::Text(
                String::from_utf8_lossy(&payload[1..]).into_owned(),
            ))
        }
    }
}

/// Encodes an application value into the wire envelope for a group write.
///
/// Tags 5 and 12 have no defined encoding and fail with `NotSupported`.
pub fn encode(tag: DataType, value: &BusValue) -> Result<RawFrame, KnxMuxError> {
    match tag {
        DataType::Switching | DataType::DriveControl => {
            let v = expect_integer(tag, value)?;
            Ok(RawFrame::new(vec![(v & 0x01) as u8]))
        }
        DataType::Dimming => {
            let v = expect_integer(tag, value)?;
            Ok(RawFrame::new(vec![(v & 0x07) as u8]))
        }
        DataType::Priority => {
            let v = expect_integer(tag, value)?;
            Ok(RawFrame::new(vec![(v & 0x03) as u8]))
        }
        DataType::Scaling | DataType::Character | DataType::Counter8 => {
            let v = expect_integer(tag, value)?;
            Ok(RawFrame::new(vec![0, (v & 0xff) as u8]))
        }
        DataType::Counter16 => {
            let v = expect_integer(tag, value)? as u16;
            let mut payload = vec![0u8];
            payload.extend_from_slice(&v.to_be_bytes());
            Ok(RawFrame::new(payload))
        }
        DataType::Counter32 => {
            let v = expect_integer(tag, value)? as u32;
            let mut payload = vec![0u8];
            payload.extend_from_slice(&v.to_be_bytes());
            Ok(RawFrame::new(payload))
        }
        DataType::FloatValue => {
            let v = match value {
                BusValue::Float(f) => *f as f32,
                BusValue::Integer(i) => *i as f32,
                BusValue::Text(_) => {
                    return Err(KnxMuxError::InvalidValue(
                        "float tag cannot encode text".into(),
                    ))
                }
            };
            let mut payload = vec![0u8];
            // Same host-order convention as the decode path.
            payload.extend_from_slice(&v.to_ne_bytes());
            Ok(RawFrame::new(payload))
        }
        DataType::Time => {
            let (hours, minutes, seconds) = match value {
                BusValue::Text(text) => parse_clock(text)?,
                BusValue::Integer(total) => {
                    let total = *total;
                    ((total / 3600) as u8, ((total % 3600) / 60) as u8, (total % 60) as u8)
                }
                BusValue::Float(_) => {
                    return Err(KnxMuxError::InvalidValue(
                        "time tag cannot encode a float".into(),
                    ))
                }
            };
            Ok(RawFrame::new(vec![
                0,
                hours & 0x1f,
                minutes & 0x3f,
                seconds & 0x3f,
            ]))
        }
        DataType::Date => {
            let (year, month, day) = match value {
                BusValue::Text(text) => parse_calendar(text)?,
                BusValue::Integer(epoch) => {
                    let dt = DateTime::from_timestamp(*epoch, 0).ok_or_else(|| {
                        KnxMuxError::InvalidDate(format!("epoch {epoch} out of range"))
                    })?;
                    let date = dt.naive_utc().date();
                    if date.year() < 1990 {
                        return Err(KnxMuxError::InvalidDate(format!(
                            "{} predates 1990",
                            date.year()
                        )));
                    }
                    (date.year(), date.month() as u8, date.day() as u8)
                }
                BusValue::Float(_) => {
                    return Err(KnxMuxError::InvalidValue(
                        "date tag cannot encode a float".into(),
                    ))
                }
            };
            let mut offset = year - 1900;
            if offset >= 100 {
                offset -= 100;
            }
            Ok(RawFrame::new(vec![
                0,
                day & 0x1f,
                month & 0x0f,
                offset as u8,
            ]))
        }
        DataType::Text => match value {
            BusValue::Text(text) => Ok(RawFrame::new(text.as_bytes().to_vec())),
            _ => Err(KnxMuxError::InvalidValue("text tag expects text".into())),
        },
        DataType::Value => Err(KnxMuxError::NotSupported(
            "encoding of 2-octet float values",
        )),
        DataType::Access => Err(KnxMuxError::NotSupported(
            "encoding of access control values",
        )),
    }
}

fn expect_integer(tag: DataType, value: &BusValue) -> Result<i64, KnxMuxError> {
    match value {
        BusValue::Integer(v) => Ok(*v),
        other => Err(KnxMuxError::InvalidValue(format!(
            "tag {} expects an integer, got {other:?}",
            tag.tag()
        ))),
    }
}

fn parse_clock(text: &str) -> Result<(u8, u8, u8), KnxMuxError> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != 3 {
        return Err(KnxMuxError::InvalidValue(format!(
            "expected HH:MM:SS, got {text:?}"
        )));
    }
    let mut fields = [0u8; 3];
    for (slot, part) in fields.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| KnxMuxError::InvalidValue(format!("bad time component {part:?}")))?;
    }
    Ok((fields[0], fields[1], fields[2]))
}

fn parse_calendar(text: &str) -> Result<(i32, u8, u8), KnxMuxError> {
    let parts: Vec<&str> = text.split('/').collect();
    if parts.len() != 3 {
        return Err(KnxMuxError::InvalidValue(format!(
            "expected YYYY/MM/DD, got {text:?}"
        )));
    }
    let year: i32 = parts[0]
        .parse()
        .map_err(|_| KnxMuxError::InvalidValue(format!("bad year {:?}", parts[0])))?;
    if year <= 1990 {
        // The bus calendar starts in 1990; the textual form must be later.
        return Err(KnxMuxError::InvalidDate(text.to_string()));
    }
    let month: u8 = parts[1]
        .parse()
        .map_err(|_| KnxMuxError::InvalidValue(format!("bad month {:?}", parts[1])))?;
    let day: u8 = parts[2]
        .parse()
        .map_err(|_| KnxMuxError::InvalidValue(format!("bad day {:?}", parts[2])))?;
    Ok((year, month, day))
}
