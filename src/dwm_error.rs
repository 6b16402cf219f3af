//! Errors surfaced by the DWM1001-DEV codec. Nothing in the codec retries or
//! swallows these; recovery belongs to whoever owns the connection.

use crate::dwm_codes::DeviceErrorCode;

use std::{borrow::Cow, error::Error, fmt, io};

/// Everything that can go wrong during a single request/response exchange.
#[derive(Debug)]
pub enum DwmError {
    /// The device answered with a non-zero error code.
    Protocol(DeviceErrorCode),

    /// The response did not have the shape we expected.
    Framing(FramingError),

    /// The connection's read timeout expired before the response was
    /// complete.
    Timeout {
        /// Bytes requested by the read that timed out.
        expected: usize,
        /// Bytes that did arrive before the timeout.
        received: usize,
    },

    /// Any other failure of the underlying connection.
    Io(io::Error),
}

/// The ways a response can be malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// The connection ran dry before the declared number of bytes arrived.
    ShortRead {
        /// Bytes requested.
        expected: usize,
        /// Bytes actually read.
        received: usize,
    },

    /// A declared length disagrees with the layout of the response.
    LengthMismatch {
        /// Length announced by the device.
        declared: usize,
        /// Length implied by the response type or the anchor count.
        expected: usize,
    },

    /// The header did not start with the expected return byte, or an object
    /// had the wrong type for the call.
    UnexpectedReturnType {
        /// The type we were waiting for.
        expected: u8,
        /// The type that arrived.
        found: u8,
    },

    /// The error code byte is outside of the documented table.
    UnknownErrorCode(u8),

    /// A location response carried an object type we cannot decode.
    UnknownObjectType(u8),

    /// The payload had the right length but could not be decoded.
    Malformed,
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use FramingError as FE;
        let msg = match self {
            FE::ShortRead { expected, received } => Cow::from(format!(
                "short read: expected {} bytes, got {}",
                expected, received
            )),
            FE::LengthMismatch { declared, expected } => Cow::from(format!(
                "malformed length: declared {} bytes, layout needs {}",
                declared, expected
            )),
            FE::UnexpectedReturnType { expected, found } => Cow::from(format!(
                "unexpected return type {:#04x}, wanted {:#04x}",
                found, expected
            )),
            FE::UnknownErrorCode(code) => Cow::from(format!("unknown error code {}", code)),
            FE::UnknownObjectType(kind) => {
                Cow::from(format!("unknown object type {:#04x}", kind))
            }
            FE::Malformed => Cow::from("malformed payload"),
        };

        write!(f, "{}", msg)
    }
}

impl Error for FramingError {}

impl fmt::Display for DwmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DwmError::Protocol(code) => {
                write!(f, "device error {}: {}", code.code(), code)
            }
            DwmError::Framing(error) => write!(f, "framing error: {}", error),
            DwmError::Timeout { expected, received } => write!(
                f,
                "timed out after {} of {} bytes",
                received, expected
            ),
            DwmError::Io(error) => write!(f, "io error: {}", error),
        }
    }
}

impl Error for DwmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DwmError::Framing(error) => Some(error),
            DwmError::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<FramingError> for DwmError {
    fn from(value: FramingError) -> Self {
        Self::Framing(value)
    }
}

impl From<io::Error> for DwmError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl DwmError {
    /// The device error code, if this is a [DwmError::Protocol].
    pub fn device_code(&self) -> Option<DeviceErrorCode> {
        match self {
            DwmError::Protocol(code) => Some(*code),
            _ => None,
        }
    }

    /// Whether the device simply asked us to come back later. The codec does
    /// not act on this, callers may.
    pub fn is_busy(&self) -> bool {
        matches!(self, DwmError::Protocol(DeviceErrorCode::Busy))
    }
}
