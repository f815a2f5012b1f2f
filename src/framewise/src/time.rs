//! Canonical binary form of timestamps.
//!
//! | Offset | Size | Field                                                  |
//! |--------|------|--------------------------------------------------------|
//! | 0      | 1    | Version: `1`, or `2` if the offset has a seconds part  |
//! | 1      | 8    | Seconds since `0001-01-01T00:00:00Z`                   |
//! | 9      | 4    | Nanoseconds within the second                          |
//! | 13     | 2    | Zone offset in minutes east of UTC; `-1` is UTC itself |
//! | 15     | 1    | Seconds part of the zone offset (version 2 only)       |
//!
//! All multi-byte quantities are big-endian and signed, except for the
//! nanoseconds.

use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

use crate::binary::{BinaryMarshal, BinaryUnmarshal};

const VERSION_V1: u8 = 1;
const VERSION_V2: u8 = 2;

const V1_LEN: usize = 15;
const V2_LEN: usize = V1_LEN + 1;

// Seconds between 0001-01-01 and 1970-01-01 in the proleptic
// Gregorian calendar.
const UNIX_TO_INTERNAL: i64 = (1969 * 365 + 1969 / 4 - 1969 / 100 + 1969 / 400) * 86_400;

const NANOS_PER_SEC: u32 = 1_000_000_000;

// Offset marker for timestamps in UTC proper.
const UTC_OFFSET: i16 = -1;

/// Errors when converting timestamps to or from their binary form.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    /// No data was given to decode.
    #[error("timestamp data is empty")]
    NoData,

    /// The version byte is not one we understand.
    #[error("unsupported timestamp version {0}")]
    UnsupportedVersion(u8),

    /// The data does not have the length its version requires.
    #[error("invalid timestamp length {0}")]
    InvalidLength(usize),

    /// The zone offset can't be represented in the binary form.
    #[error("unexpected zone offset of {0} seconds")]
    UnexpectedOffset(i32),

    /// The decoded instant is outside the supported range.
    #[error("timestamp out of range")]
    OutOfRange,
}

mod private {
    pub trait Sealed {}
}

/// Timestamp types with a canonical binary form.
///
/// Implemented for [`DateTime<Utc>`] and [`DateTime<FixedOffset>`].
pub trait Timestamp:
    private::Sealed
    + BinaryMarshal<Error = TimeError>
    + BinaryUnmarshal<Error = TimeError>
    + Sized
{
    /// Decodes a new timestamp from its binary form.
    fn decode_binary(data: &[u8]) -> Result<Self, TimeError>;
}

fn encode(unix_secs: i64, nanos: u32, offset: Option<i32>) -> Result<Vec<u8>, TimeError> {
    // Leap seconds are folded into the following second.
    let (unix_secs, nanos) = if nanos >= NANOS_PER_SEC {
        (unix_secs + 1, nanos - NANOS_PER_SEC)
    } else {
        (unix_secs, nanos)
    };

    let (version, offset_min, offset_sec) = match offset {
        None => (VERSION_V1, UTC_OFFSET, 0),
        Some(offset) => {
            let minutes = offset / 60;
            if minutes == i32::from(UTC_OFFSET) {
                return Err(TimeError::UnexpectedOffset(offset));
            }
            let minutes =
                i16::try_from(minutes).map_err(|_| TimeError::UnexpectedOffset(offset))?;

            match offset % 60 {
                0 => (VERSION_V1, minutes, 0),
                sec => (VERSION_V2, minutes, sec as i8),
            }
        }
    };

    let mut out = vec![0; if version == VERSION_V2 { V2_LEN } else { V1_LEN }];
    out[0] = version;
    BigEndian::write_i64(&mut out[1..9], unix_secs + UNIX_TO_INTERNAL);
    BigEndian::write_u32(&mut out[9..13], nanos);
    BigEndian::write_i16(&mut out[13..15], offset_min);
    if version == VERSION_V2 {
        out[15] = offset_sec as u8;
    }

    Ok(out)
}

// Returns the instant and the zone offset in seconds, `None` for UTC.
fn decode(data: &[u8]) -> Result<(DateTime<Utc>, Option<i32>), TimeError> {
    let (&version, _) = data.split_first().ok_or(TimeError::NoData)?;
    let want = match version {
        VERSION_V1 => V1_LEN,
        VERSION_V2 => V2_LEN,
        v => return Err(TimeError::UnsupportedVersion(v)),
    };
    if data.len() != want {
        return Err(TimeError::InvalidLength(data.len()));
    }

    let secs = BigEndian::read_i64(&data[1..9]);
    let nanos = BigEndian::read_u32(&data[9..13]);
    let offset_min = BigEndian::read_i16(&data[13..15]);

    let offset = if offset_min == UTC_OFFSET {
        None
    } else {
        let mut offset = i32::from(offset_min) * 60;
        if version == VERSION_V2 {
            offset += i32::from(data[15] as i8);
        }
        Some(offset)
    };

    let unix_secs = secs
        .checked_sub(UNIX_TO_INTERNAL)
        .ok_or(TimeError::OutOfRange)?;
    if nanos >= NANOS_PER_SEC {
        return Err(TimeError::OutOfRange);
    }
    let instant = DateTime::<Utc>::from_timestamp(unix_secs, nanos).ok_or(TimeError::OutOfRange)?;

    Ok((instant, offset))
}

impl private::Sealed for DateTime<Utc> {}

impl Timestamp for DateTime<Utc> {
    fn decode_binary(data: &[u8]) -> Result<Self, TimeError> {
        decode(data).map(|(instant, _)| instant)
    }
}

impl BinaryMarshal for DateTime<Utc> {
    type Error = TimeError;

    fn marshal_binary(&self) -> Result<Vec<u8>, Self::Error> {
        encode(self.timestamp(), self.timestamp_subsec_nanos(), None)
    }
}

impl BinaryUnmarshal for DateTime<Utc> {
    type Error = TimeError;

    fn unmarshal_binary(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        *self = Self::decode_binary(data)?;
        Ok(())
    }
}

impl private::Sealed for DateTime<FixedOffset> {}

impl Timestamp for DateTime<FixedOffset> {
    fn decode_binary(data: &[u8]) -> Result<Self, TimeError> {
        let (instant, offset) = decode(data)?;
        let offset = offset.unwrap_or(0);
        let zone = FixedOffset::east_opt(offset).ok_or(TimeError::UnexpectedOffset(offset))?;

        Ok(instant.with_timezone(&zone))
    }
}

impl BinaryMarshal for DateTime<FixedOffset> {
    type Error = TimeError;

    fn marshal_binary(&self) -> Result<Vec<u8>, Self::Error> {
        encode(
            self.timestamp(),
            self.timestamp_subsec_nanos(),
            Some(self.offset().local_minus_utc()),
        )
    }
}

impl BinaryUnmarshal for DateTime<FixedOffset> {
    type Error = TimeError;

    fn unmarshal_binary(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        *self = Self::decode_binary(data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn unix_epoch_layout() {
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        let data = epoch.marshal_binary().unwrap();

        assert_eq!(data.len(), V1_LEN);
        assert_eq!(data[0], VERSION_V1);
        assert_eq!(BigEndian::read_i64(&data[1..9]), 62_135_596_800);
        assert_eq!(&data[9..13], &[0, 0, 0, 0]);
        assert_eq!(&data[13..15], &[0xFF, 0xFF]);
    }

    #[test]
    fn whole_minute_offset_uses_v1() {
        let zone = FixedOffset::east_opt(2 * 3600).unwrap();
        let t = zone.with_ymd_and_hms(2024, 2, 29, 12, 30, 0).unwrap();
        let data = t.marshal_binary().unwrap();

        assert_eq!(data[0], VERSION_V1);
        assert_eq!(BigEndian::read_i16(&data[13..15]), 120);
        assert_eq!(DateTime::<FixedOffset>::decode_binary(&data).unwrap(), t);
    }

    #[test]
    fn odd_offset_uses_v2() {
        let zone = FixedOffset::west_opt(3600 + 30 * 60 + 15).unwrap();
        let t = zone.with_ymd_and_hms(1901, 12, 13, 20, 45, 52).unwrap();
        let data = t.marshal_binary().unwrap();

        assert_eq!(data.len(), V2_LEN);
        assert_eq!(data[0], VERSION_V2);

        let back = DateTime::<FixedOffset>::decode_binary(&data).unwrap();
        assert_eq!(back, t);
        assert_eq!(back.offset(), t.offset());
    }

    #[test]
    fn offset_of_minus_one_minute_is_rejected() {
        let zone = FixedOffset::west_opt(60).unwrap();
        let t = zone.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(t.marshal_binary(), Err(TimeError::UnexpectedOffset(-60)));
    }

    #[test]
    fn malformed_input() {
        assert_eq!(
            DateTime::<Utc>::decode_binary(&[]),
            Err(TimeError::NoData)
        );
        assert_eq!(
            DateTime::<Utc>::decode_binary(&[7; V1_LEN]),
            Err(TimeError::UnsupportedVersion(7))
        );
        assert_eq!(
            DateTime::<Utc>::decode_binary(&[VERSION_V1; 3]),
            Err(TimeError::InvalidLength(3))
        );
    }

    #[test]
    fn utc_decodes_into_fixed_offset_zero() {
        let t = Utc.with_ymd_and_hms(2023, 7, 1, 8, 0, 0).unwrap();
        let data = t.marshal_binary().unwrap();

        let fixed = DateTime::<FixedOffset>::decode_binary(&data).unwrap();
        assert_eq!(fixed.offset().local_minus_utc(), 0);
        assert_eq!(fixed, t);
    }
}
