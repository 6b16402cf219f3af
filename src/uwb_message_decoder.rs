//! [nom] parsers for the binary payloads the DWM1001-DEV sends back.
//!
//! These only see payload bytes that have already been read off the wire;
//! lengths are checked against the declared object length before any
//! parser runs, so a parser failure here means the payload itself is bad.

use crate::dwm_codes::{
    ANCHOR_LENGTH, DWM_LOC_GET_RETURN_TYPE, DWM_POSITION_RETURN_TYPE, POSITION_LENGTH,
};
use crate::dwm_error::FramingError;
use crate::position::{Anchor, LocationReport, Position};
use crate::tag_config::{MeasurementMode, Role, TagConfiguration, UwbMode};

use nom::{
    bits::{bits, complete::take},
    combinator::{all_consuming, map, opt},
    multi::length_count,
    number::complete::{le_i32, le_u16, le_u32, le_u8},
    sequence::tuple,
    Finish, IResult,
};

type BitInput<'a> = (&'a [u8], usize);

/// x, y, z then the quality factor.
pub fn parse_position(input: &[u8]) -> IResult<&[u8], Position> {
    map(tuple((le_i32, le_i32, le_i32, le_u8)), |(x, y, z, qf)| Position {
        x,
        y,
        z,
        qf,
    })(input)
}

/// One 20 byte anchor record.
pub fn parse_anchor(input: &[u8]) -> IResult<&[u8], Anchor> {
    map(
        tuple((le_u16, le_u32, le_u8, parse_position)),
        |(address, distance, quality_factor, position)| Anchor {
            address,
            distance,
            quality_factor,
            position,
        },
    )(input)
}

/// A count byte, that many anchors, then the tag's own position if the
/// location engine has one.
fn parse_anchor_block(input: &[u8]) -> IResult<&[u8], LocationReport> {
    map(
        all_consuming(tuple((length_count(le_u8, parse_anchor), opt(parse_position)))),
        |(anchors, position)| LocationReport {
            position,
            anchors: anchors.into_iter().collect(),
        },
    )(input)
}

fn flag(input: BitInput) -> IResult<BitInput, bool> {
    map(take(1usize), |bit: u8| bit == 1)(input)
}

fn two_bits(input: BitInput) -> IResult<BitInput, u8> {
    take(2usize)(input)
}

fn parse_config_bits(input: BitInput) -> IResult<BitInput, TagConfiguration> {
    map(
        tuple((
            // byte 0
            flag,
            flag,
            take::<_, u8, _, _>(1usize),
            flag,
            flag,
            flag,
            two_bits,
            // byte 1
            take::<_, u8, _, _>(2usize),
            flag,
            flag,
            flag,
            flag,
            two_bits,
        )),
        |(
            low_power_enabled,
            location_engine_enabled,
            _reserved,
            led_enabled,
            ble_enabled,
            firmware_update_enabled,
            uwb_mode,
            _reserved_1,
            anchor,
            initiator,
            bridge,
            accelerometer_enabled,
            measurement_mode,
        )| TagConfiguration {
            low_power_enabled,
            location_engine_enabled,
            led_enabled,
            ble_enabled,
            firmware_update_enabled,
            accelerometer_enabled,
            initiator,
            bridge,
            role: if anchor { Role::Anchor } else { Role::Tag },
            // two bits always fit
            uwb_mode: UwbMode::new(uwb_mode).unwrap_or(UwbMode::OFF),
            measurement_mode: MeasurementMode::new(measurement_mode)
                .unwrap_or(MeasurementMode::TWR),
        },
    )(input)
}

/// The 2 byte configuration bitfield, most significant bit first.
pub fn parse_tag_config(input: &[u8]) -> IResult<&[u8], TagConfiguration> {
    bits(parse_config_bits)(input)
}

/// Decodes a lone 13 byte position payload.
pub fn decode_position(payload: &[u8]) -> Result<Position, FramingError> {
    if payload.len() != POSITION_LENGTH {
        return Err(FramingError::LengthMismatch {
            declared: payload.len(),
            expected: POSITION_LENGTH,
        });
    }
    match all_consuming(parse_position)(payload).finish() {
        Ok((_remaining, position)) => Ok(position),
        Err(_) => Err(FramingError::Malformed),
    }
}

/// The payload length a location-with-anchors response must have for the
/// count byte it starts with, without and with the trailing tag position.
fn anchor_block_lengths(anchor_count: u8) -> (usize, usize) {
    let without = 1 + anchor_count as usize * ANCHOR_LENGTH;
    (without, without + POSITION_LENGTH)
}

/// Decodes the payload of a "location get" response according to its
/// object type.
pub fn decode_location(object_type: u8, payload: &[u8]) -> Result<LocationReport, FramingError> {
    match object_type {
        DWM_POSITION_RETURN_TYPE => Ok(LocationReport {
            position: Some(decode_position(payload)?),
            anchors: Default::default(),
        }),
        DWM_LOC_GET_RETURN_TYPE => {
            let anchor_count = *payload.first().ok_or(FramingError::LengthMismatch {
                declared: 0,
                expected: 1,
            })?;
            let (without, with) = anchor_block_lengths(anchor_count);
            if payload.len() != without && payload.len() != with {
                return Err(FramingError::LengthMismatch {
                    declared: payload.len(),
                    expected: without,
                });
            }
            match parse_anchor_block(payload).finish() {
                Ok((_remaining, report)) => Ok(report),
                Err(_) => Err(FramingError::Malformed),
            }
        }
        other => Err(FramingError::UnknownObjectType(other)),
    }
}
