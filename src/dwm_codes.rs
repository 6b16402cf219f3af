//! Command opcodes, return type discriminators and error codes of the
//! DWM1001-DEV UART API.

use std::fmt;

/// Baud rate of the DWM1001-DEV UART link.
pub const UWB_SERIAL_BAUDRATE: u32 = 115200;

/// Full location: tag position plus the anchors it is ranging to.
pub const DWM_LOC_GET_MSG: [u8; 2] = [0x0C, 0x00];
/// Position computed by the location engine only.
pub const DWM_POS_GET_MSG: [u8; 2] = [0x02, 0x00];
/// Board configuration.
pub const DWM_CFG_GET_MSG: [u8; 2] = [0x08, 0x00];
/// Configure the board as a tag. Followed by the 2 configuration bytes and
/// only takes effect after a reset.
pub const DWM_CFG_TAG_MSG: [u8; 2] = [0x03, 0x04];
/// Reboot the board.
pub const DWM_RESET_MSG: [u8; 2] = [0x14, 0x00];

/// Leading byte of every response header.
pub const DWM_RETURN_BYTE: u8 = 0x40;
/// Object type of a position-only response.
pub const DWM_POSITION_RETURN_TYPE: u8 = 0x41;
/// Object type of a location response carrying anchors.
pub const DWM_LOC_GET_RETURN_TYPE: u8 = 0x49;

/// Length of the response header: return byte, length, error code.
pub const HEADER_LENGTH: usize = 3;
/// Length of the `(object type, object length)` pair following the header.
pub const OBJECT_HEADER_LENGTH: usize = 2;
/// x, y, z as 32-bit integers plus a quality factor byte.
pub const POSITION_LENGTH: usize = 13;
/// Address, distance, quality factor and a position.
pub const ANCHOR_LENGTH: usize = 20;
/// The configuration bitfield.
pub const CONFIG_LENGTH: usize = 2;

/// The error code carried by every response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceErrorCode {
    /// The call succeeded.
    NoError,
    /// Unknown command or broken TLV frame.
    UnknownCommand,
    /// Internal error.
    InternalError,
    /// Invalid parameter.
    InvalidParameter,
    /// The board is busy.
    Busy,
}

impl DeviceErrorCode {
    /// Decodes the error code byte, `None` if the firmware sent something
    /// outside of the documented table.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::NoError),
            1 => Some(Self::UnknownCommand),
            2 => Some(Self::InternalError),
            3 => Some(Self::InvalidParameter),
            4 => Some(Self::Busy),
            _ => None,
        }
    }

    /// The wire value of this error code.
    pub fn code(self) -> u8 {
        match self {
            Self::NoError => 0,
            Self::UnknownCommand => 1,
            Self::InternalError => 2,
            Self::InvalidParameter => 3,
            Self::Busy => 4,
        }
    }
}

impl fmt::Display for DeviceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NoError => "no error",
            Self::UnknownCommand => "unknown command or broken TLV frame",
            Self::InternalError => "internal error",
            Self::InvalidParameter => "invalid parameter",
            Self::Busy => "busy",
        };
        write!(f, "{}", msg)
    }
}
