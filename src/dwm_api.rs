//! The DWM1001-DEV UART API: each call writes one command and consumes the
//! complete response before returning.
//!
//! Every response starts with a 3 byte header:
//!
//! ```text
//! [0x40, length, error_code]
//! ```
//!
//! Calls that return data follow it with `[object_type, object_length]` and
//! `object_length` payload bytes. A non-zero error code ends the response,
//! so nothing more is read.
//!
//! The connection is anything that is [Read] + [Write], normally a
//! [serial2::SerialPort] opened with a read timeout. The request/response
//! protocol is half duplex, so a connection must never be shared by two
//! calls in flight; the caller holds it exclusively (`&mut`) for the length
//! of each call. Errors are returned as-is and nothing is retried here, a
//! half consumed response followed by a fresh command would leave the
//! stream out of step.

use crate::dwm_codes::*;
use crate::dwm_error::{DwmError, FramingError};
use crate::position::{LocationReport, Position};
use crate::tag_config::TagConfiguration;
use crate::uwb_message_decoder::{decode_location, decode_position};

use log::debug;
use std::io::{self, ErrorKind, Read, Write};

/// The leading 3 bytes of every response, already validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResponseHeader {
    length: u8,
}

/// Fills `buf` completely or fails. A connection that runs dry is a short
/// read; one that times out is a [DwmError::Timeout].
fn read_exactly<C: Read>(conn: &mut C, buf: &mut [u8]) -> Result<(), DwmError> {
    let mut filled = 0;
    while filled < buf.len() {
        match conn.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(FramingError::ShortRead {
                    expected: buf.len(),
                    received: filled,
                }
                .into())
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                return Err(DwmError::Timeout {
                    expected: buf.len(),
                    received: filled,
                })
            }
            Err(e) => return Err(DwmError::Io(e)),
        }
    }
    Ok(())
}

fn send_command<C: Write>(conn: &mut C, frame: &[u8]) -> Result<(), DwmError> {
    debug!("dwm <- {:02x?}", frame);
    conn.write_all(frame).map_err(map_write_error)?;
    conn.flush().map_err(map_write_error)
}

fn map_write_error(e: io::Error) -> DwmError {
    match e.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => DwmError::Timeout {
            expected: 0,
            received: 0,
        },
        _ => DwmError::Io(e),
    }
}

/// Reads and checks the 3 byte header. Returns early on a device error
/// without touching the rest of the stream.
fn read_header<C: Read>(conn: &mut C) -> Result<ResponseHeader, DwmError> {
    let mut raw = [0; HEADER_LENGTH];
    read_exactly(conn, &mut raw)?;
    debug!("dwm -> header {:02x?}", raw);

    let [return_byte, length, error_code] = raw;
    if return_byte != DWM_RETURN_BYTE {
        return Err(FramingError::UnexpectedReturnType {
            expected: DWM_RETURN_BYTE,
            found: return_byte,
        }
        .into());
    }
    match DeviceErrorCode::from_byte(error_code) {
        Some(DeviceErrorCode::NoError) => Ok(ResponseHeader { length }),
        Some(code) => Err(DwmError::Protocol(code)),
        None => Err(FramingError::UnknownErrorCode(error_code).into()),
    }
}

/// Reads `(object_type, object_length)` and then exactly that many bytes.
fn read_object<C: Read>(conn: &mut C) -> Result<(u8, Vec<u8>), DwmError> {
    let mut raw = [0; OBJECT_HEADER_LENGTH];
    read_exactly(conn, &mut raw)?;
    let [object_type, object_length] = raw;

    let mut payload = vec![0; object_length as usize];
    read_exactly(conn, &mut payload)?;
    debug!("dwm -> object {:#04x} {:02x?}", object_type, payload);
    Ok((object_type, payload))
}

/// A call that only answers with a header.
fn set_call<C: Read + Write>(conn: &mut C, frame: &[u8]) -> Result<(), DwmError> {
    send_command(conn, frame)?;
    read_header(conn).map(|_| ())
}

/// `dwm_loc_get`: the tag position and the anchors it is ranging to.
///
/// The answer is either a bare position (`0x41`) or a count byte followed by
/// that many 20 byte anchor records and, when the location engine has a
/// fix, the tag's own 13 byte position (`0x49`).
pub fn get_location<C: Read + Write>(conn: &mut C) -> Result<LocationReport, DwmError> {
    send_command(conn, &DWM_LOC_GET_MSG)?;
    read_header(conn)?;
    let (object_type, payload) = read_object(conn)?;
    Ok(decode_location(object_type, &payload)?)
}

/// `dwm_pos_get`: only the position from the location engine.
pub fn get_position<C: Read + Write>(conn: &mut C) -> Result<Position, DwmError> {
    send_command(conn, &DWM_POS_GET_MSG)?;
    read_header(conn)?;
    let (object_type, payload) = read_object(conn)?;
    if object_type != DWM_POSITION_RETURN_TYPE {
        return Err(FramingError::UnexpectedReturnType {
            expected: DWM_POSITION_RETURN_TYPE,
            found: object_type,
        }
        .into());
    }
    Ok(decode_position(&payload)?)
}

/// `dwm_cfg_get`: the board configuration.
pub fn get_config<C: Read + Write>(conn: &mut C) -> Result<TagConfiguration, DwmError> {
    send_command(conn, &DWM_CFG_GET_MSG)?;
    let header = read_header(conn)?;
    if header.length as usize != CONFIG_LENGTH {
        return Err(FramingError::LengthMismatch {
            declared: header.length as usize,
            expected: CONFIG_LENGTH,
        }
        .into());
    }
    let mut raw = [0; CONFIG_LENGTH];
    read_exactly(conn, &mut raw)?;
    debug!("dwm -> config {:08b} {:08b}", raw[0], raw[1]);
    Ok(TagConfiguration::from_bytes(&raw)?)
}

/// Configures the board as a tag. The board keeps running on its old
/// configuration until the next [reset].
pub fn set_tag_config<C: Read + Write>(
    conn: &mut C,
    config: &TagConfiguration,
) -> Result<(), DwmError> {
    let mut frame = [0; DWM_CFG_TAG_MSG.len() + CONFIG_LENGTH];
    frame[..DWM_CFG_TAG_MSG.len()].copy_from_slice(&DWM_CFG_TAG_MSG);
    frame[DWM_CFG_TAG_MSG.len()..].copy_from_slice(&config.to_bytes());
    set_call(conn, &frame)
}

/// Reboots the board. Returns as soon as the board acknowledges; waiting for
/// it to come back up is up to the caller.
pub fn reset<C: Read + Write>(conn: &mut C) -> Result<(), DwmError> {
    set_call(conn, &DWM_RESET_MSG)
}

/// Asks for the configuration and reports whether a DWM1001-DEV answered.
/// Used to tell the UWB board apart from other serial devices; whatever is
/// left in the input buffer afterwards should be discarded by the caller.
pub fn probe<C: Read + Write>(conn: &mut C) -> bool {
    match get_config(conn) {
        Ok(config) => {
            debug!("probe answered with {:?}", config);
            true
        }
        Err(e) => {
            debug!("probe failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::position::Anchor;
    use crate::tag_config::{Role, UwbMode};
    use std::collections::VecDeque;

    /// Serves canned response bytes and records what was written.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedConnection {
        pub(crate) incoming: VecDeque<u8>,
        pub(crate) written: Vec<u8>,
        pub(crate) time_out_when_empty: bool,
    }

    impl ScriptedConnection {
        pub(crate) fn new(response: &[u8]) -> Self {
            Self {
                incoming: response.iter().copied().collect(),
                ..Default::default()
            }
        }

        pub(crate) fn remaining(&self) -> usize {
            self.incoming.len()
        }
    }

    impl Read for ScriptedConnection {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.incoming.is_empty() && self.time_out_when_empty {
                return Err(io::Error::new(ErrorKind::TimedOut, "no answer"));
            }
            // hand out at most 4 bytes at a time, like a slow UART
            let n = buf.len().min(self.incoming.len()).min(4);
            for slot in buf.iter_mut().take(n) {
                *slot = self.incoming.pop_front().unwrap_or_default();
            }
            Ok(n)
        }
    }

    impl Write for ScriptedConnection {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn location_response(object_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0x40, 0x01, 0x00, object_type, payload.len() as u8];
        bytes.extend_from_slice(payload);
        bytes
    }

    const BUSY: [u8; 3] = [0x40, 0x02, 0x04];

    #[test]
    fn location_position_only() {
        let mut response = vec![0x40, 0x0D, 0x00, 0x41, 0x0D];
        response.extend_from_slice(&[
            0xE8, 0x03, 0x00, 0x00, 0x0C, 0xFE, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 87,
        ]);
        let mut conn = ScriptedConnection::new(&response);

        let report = get_location(&mut conn).unwrap();

        assert_eq!(conn.written, DWM_LOC_GET_MSG);
        assert_eq!(
            report.position,
            Some(Position {
                x: 1000,
                y: -500,
                z: 0,
                qf: 87
            })
        );
        assert!(report.anchors.is_empty());
        assert_eq!(conn.remaining(), 0);
    }

    #[test]
    fn location_with_three_anchors() {
        let anchors: Vec<Anchor> = [0x1A01u16, 0x1A02, 0x1A03]
            .iter()
            .enumerate()
            .map(|(i, &address)| Anchor {
                address,
                distance: 1000 * (3 - i as u32),
                quality_factor: 100,
                position: Position {
                    x: i as i32 * 5000,
                    y: 0,
                    z: 2000,
                    qf: 100,
                },
            })
            .collect();
        let mut payload = vec![3];
        for a in &anchors {
            payload.extend_from_slice(&a.to_bytes());
        }
        let mut conn = ScriptedConnection::new(&location_response(0x49, &payload));

        let report = get_location(&mut conn).unwrap();

        assert_eq!(report.anchors.len(), 3);
        assert_eq!(
            report.anchors.addresses().collect::<Vec<_>>(),
            vec![0x1A01, 0x1A02, 0x1A03]
        );
        assert_eq!(report.anchors.get(0x1A02), Some(&anchors[1]));
        assert_eq!(report.position, None);
    }

    #[test]
    fn location_with_anchors_and_fix() {
        let tag = Position {
            x: -250,
            y: 3000,
            z: 0,
            qf: 70,
        };
        let mut payload = vec![0];
        payload.extend_from_slice(&tag.to_bytes());
        let mut conn = ScriptedConnection::new(&location_response(0x49, &payload));
        let report = get_location(&mut conn).unwrap();
        assert_eq!(report.position, Some(tag));
        assert!(report.anchors.is_empty());
    }

    #[test]
    fn busy_stops_every_call_at_the_header() {
        // trailing bytes must be left alone
        let tail = [0x41, 0x0D, 1, 2, 3];
        let mut response = BUSY.to_vec();
        response.extend_from_slice(&tail);

        let mut conn = ScriptedConnection::new(&response);
        let err = get_location(&mut conn).unwrap_err();
        assert_eq!(err.device_code(), Some(DeviceErrorCode::Busy));
        assert_eq!(conn.remaining(), tail.len());

        let mut conn = ScriptedConnection::new(&response);
        let err = get_config(&mut conn).unwrap_err();
        assert_eq!(err.device_code(), Some(DeviceErrorCode::Busy));
        assert!(err.to_string().contains("busy"));
        assert_eq!(conn.remaining(), tail.len());

        let mut conn = ScriptedConnection::new(&response);
        let err = set_tag_config(&mut conn, &TagConfiguration::default()).unwrap_err();
        assert_eq!(err.device_code(), Some(DeviceErrorCode::Busy));
        assert_eq!(conn.remaining(), tail.len());

        let mut conn = ScriptedConnection::new(&response);
        let err = reset(&mut conn).unwrap_err();
        assert_eq!(err.device_code(), Some(DeviceErrorCode::Busy));
        assert_eq!(conn.remaining(), tail.len());

        let mut conn = ScriptedConnection::new(&response);
        let err = get_position(&mut conn).unwrap_err();
        assert_eq!(err.device_code(), Some(DeviceErrorCode::Busy));
        assert_eq!(conn.remaining(), tail.len());
    }

    #[test]
    fn other_error_codes() {
        for (byte, code) in [
            (1, DeviceErrorCode::UnknownCommand),
            (2, DeviceErrorCode::InternalError),
            (3, DeviceErrorCode::InvalidParameter),
        ] {
            let mut conn = ScriptedConnection::new(&[0x40, 0x01, byte]);
            assert_eq!(reset(&mut conn).unwrap_err().device_code(), Some(code));
        }

        let mut conn = ScriptedConnection::new(&[0x40, 0x01, 0x09]);
        assert!(matches!(
            reset(&mut conn),
            Err(DwmError::Framing(FramingError::UnknownErrorCode(9)))
        ));
    }

    #[test]
    fn short_position_is_a_framing_error() {
        let mut response = vec![0x40, 0x01, 0x00, 0x41, 0x0D];
        response.extend_from_slice(&[0; 10]);
        let mut conn = ScriptedConnection::new(&response);
        assert!(matches!(
            get_location(&mut conn),
            Err(DwmError::Framing(FramingError::ShortRead {
                expected: 13,
                received: 10
            }))
        ));
    }

    #[test]
    fn position_object_with_wrong_length() {
        let mut conn = ScriptedConnection::new(&location_response(0x41, &[0; 12]));
        let err = get_location(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            DwmError::Framing(FramingError::LengthMismatch { .. })
        ));
        assert!(err.to_string().contains("malformed length"));
    }

    #[test]
    fn anchor_count_disagrees_with_object_length() {
        let mut payload = vec![2];
        payload.extend_from_slice(&[0; 20]);
        let mut conn = ScriptedConnection::new(&location_response(0x49, &payload));
        assert!(matches!(
            get_location(&mut conn),
            Err(DwmError::Framing(FramingError::LengthMismatch {
                declared: 21,
                expected: 41
            }))
        ));
    }

    #[test]
    fn timeout_is_surfaced() {
        let mut conn = ScriptedConnection::new(&[0x40]);
        conn.time_out_when_empty = true;
        assert!(matches!(
            get_config(&mut conn),
            Err(DwmError::Timeout {
                expected: 3,
                received: 1
            })
        ));
    }

    #[test]
    fn silent_device_is_a_short_read() {
        let mut conn = ScriptedConnection::new(&[]);
        assert!(matches!(
            reset(&mut conn),
            Err(DwmError::Framing(FramingError::ShortRead {
                expected: 3,
                received: 0
            }))
        ));
    }

    #[test]
    fn bad_return_byte() {
        let mut conn = ScriptedConnection::new(&[0x01, 0x00, 0x00]);
        assert!(matches!(
            reset(&mut conn),
            Err(DwmError::Framing(FramingError::UnexpectedReturnType {
                expected: 0x40,
                found: 0x01
            }))
        ));
    }

    #[test]
    fn config_get() {
        let mut conn = ScriptedConnection::new(&[0x40, 0x02, 0x00, 0b0101_1110, 0b0010_0100]);
        let config = get_config(&mut conn).unwrap();
        assert_eq!(conn.written, DWM_CFG_GET_MSG);
        assert_eq!(config.role, Role::Anchor);
        assert_eq!(config.uwb_mode, UwbMode::ACTIVE);
        assert!(config.location_engine_enabled);
        assert!(config.accelerometer_enabled);
    }

    #[test]
    fn config_get_wrong_length() {
        let mut conn = ScriptedConnection::new(&[0x40, 0x03, 0x00, 0, 0, 0]);
        assert!(matches!(
            get_config(&mut conn),
            Err(DwmError::Framing(FramingError::LengthMismatch {
                declared: 3,
                expected: 2
            }))
        ));
    }

    #[test]
    fn set_tag_config_frame() {
        let mut conn = ScriptedConnection::new(&[0x40, 0x01, 0x00]);
        set_tag_config(&mut conn, &TagConfiguration::default()).unwrap();
        assert_eq!(conn.written, vec![0x03, 0x04, 0b0101_1110, 0b0000_0100]);
    }

    #[test]
    fn reset_frame() {
        let mut conn = ScriptedConnection::new(&[0x40, 0x01, 0x00]);
        reset(&mut conn).unwrap();
        assert_eq!(conn.written, DWM_RESET_MSG);
        assert_eq!(conn.remaining(), 0);
    }

    #[test]
    fn position_get() {
        let p = Position {
            x: 42,
            y: -42,
            z: 7,
            qf: 100,
        };
        let mut conn = ScriptedConnection::new(&location_response(0x41, &p.to_bytes()));
        assert_eq!(get_position(&mut conn).unwrap(), p);
        assert_eq!(conn.written, DWM_POS_GET_MSG);

        let mut conn = ScriptedConnection::new(&location_response(0x49, &[0]));
        assert!(matches!(
            get_position(&mut conn),
            Err(DwmError::Framing(FramingError::UnexpectedReturnType { .. }))
        ));
    }

    #[test]
    fn probe_tells_devices_apart() {
        let mut dwm = ScriptedConnection::new(&[0x40, 0x02, 0x00, 0, 0]);
        assert!(probe(&mut dwm));

        // a micro:bit answers with text
        let mut microbit = ScriptedConnection::new(b"\x01ready\n");
        assert!(!probe(&mut microbit));
    }
}
