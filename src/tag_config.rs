//! The DWM1001-DEV board configuration and its 2 byte bitfield.
//!
//! Bit positions, most significant bit first:
//!
//! ```text
//! byte 0: low_power_en | loc_engine_en | reserved | led_en | ble_en | fw_update_en | uwb_mode(2)
//! byte 1: reserved(2)  | role | initiator | bridge | accel_en | meas_mode(2)
//! ```
//!
//! The order is fixed by the board firmware. Configurations can also be kept
//! on disk as [ron] files, e.g.
//!
//! ```text
//! (low_power_enabled:false,location_engine_enabled:true,led_enabled:true,...)
//! ```

use crate::dwm_codes::CONFIG_LENGTH;
use crate::dwm_error::FramingError;
use crate::uwb_message_decoder::parse_tag_config;

use nom::Finish;
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt,
    fs::File,
    io::{Read, Write},
    path::Path,
};

/// Whether the board is a mobile tag or a fixed anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Mobile node, bit value 0
    #[default]
    Tag,
    /// Fixed node, bit value 1
    Anchor,
}

/// The 2 bit UWB radio mode. What each value means is board specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct UwbMode(u8);

impl UwbMode {
    /// Radio off
    pub const OFF: UwbMode = UwbMode(0);
    /// Listen only
    pub const PASSIVE: UwbMode = UwbMode(1);
    /// Ranging
    pub const ACTIVE: UwbMode = UwbMode(2);

    /// `None` if `raw` does not fit in 2 bits.
    pub fn new(raw: u8) -> Option<Self> {
        (raw <= 0b11).then_some(UwbMode(raw))
    }

    /// The raw 2 bit value.
    pub fn raw(self) -> u8 {
        self.0
    }
}

/// The 2 bit measurement mode. Only two-way ranging exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct MeasurementMode(u8);

impl MeasurementMode {
    /// Two-way ranging
    pub const TWR: MeasurementMode = MeasurementMode(0);

    /// `None` if `raw` does not fit in 2 bits.
    pub fn new(raw: u8) -> Option<Self> {
        (raw <= 0b11).then_some(MeasurementMode(raw))
    }

    /// The raw 2 bit value.
    pub fn raw(self) -> u8 {
        self.0
    }
}

macro_rules! two_bit_conversions {
    ($t:ty) => {
        impl TryFrom<u8> for $t {
            type Error = String;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                <$t>::new(value).ok_or_else(|| format!("{} does not fit in 2 bits", value))
            }
        }

        impl From<$t> for u8 {
            fn from(value: $t) -> u8 {
                value.raw()
            }
        }
    };
}

two_bit_conversions!(UwbMode);
two_bit_conversions!(MeasurementMode);

/// Board mode and feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagConfiguration {
    /// Sleep between ranging rounds to save power
    pub low_power_enabled: bool,
    /// The on-board location engine fuses ranges into a position
    pub location_engine_enabled: bool,
    /// Drive the board's status LEDs
    pub led_enabled: bool,
    /// Keep the Bluetooth radio on
    pub ble_enabled: bool,
    /// Accept firmware updates over the air
    pub firmware_update_enabled: bool,
    /// Use the accelerometer to detect when the tag is still
    pub accelerometer_enabled: bool,
    /// Anchor only: this anchor starts the network
    pub initiator: bool,
    /// Anchor only: this anchor bridges the network to a gateway
    pub bridge: bool,
    /// Tag or anchor
    pub role: Role,
    /// Whether the UWB radio is off, listening or ranging
    pub uwb_mode: UwbMode,
    /// How ranges are measured, TWR is the only mode the firmware has
    pub measurement_mode: MeasurementMode,
}

/// The configuration the hunter puts on its board at bring-up.
impl Default for TagConfiguration {
    fn default() -> Self {
        Self {
            low_power_enabled: false,
            location_engine_enabled: true,
            led_enabled: true,
            ble_enabled: true,
            firmware_update_enabled: true,
            accelerometer_enabled: true,
            initiator: false,
            bridge: false,
            role: Role::Tag,
            uwb_mode: UwbMode::ACTIVE,
            measurement_mode: MeasurementMode::TWR,
        }
    }
}

impl TagConfiguration {
    /// Packs the flags into the firmware's bitfield. Reserved bits are 0.
    pub fn to_bytes(&self) -> [u8; CONFIG_LENGTH] {
        let b0 = (self.low_power_enabled as u8) << 7
            | (self.location_engine_enabled as u8) << 6
            | (self.led_enabled as u8) << 4
            | (self.ble_enabled as u8) << 3
            | (self.firmware_update_enabled as u8) << 2
            | self.uwb_mode.raw();
        let b1 = ((self.role == Role::Anchor) as u8) << 5
            | (self.initiator as u8) << 4
            | (self.bridge as u8) << 3
            | (self.accelerometer_enabled as u8) << 2
            | self.measurement_mode.raw();
        [b0, b1]
    }

    /// Unpacks the firmware's bitfield. Reserved bits are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FramingError> {
        if bytes.len() != CONFIG_LENGTH {
            return Err(FramingError::LengthMismatch {
                declared: bytes.len(),
                expected: CONFIG_LENGTH,
            });
        }
        match parse_tag_config(bytes).finish() {
            Ok((_remaining, config)) => Ok(config),
            Err(_) => Err(FramingError::Malformed),
        }
    }

    /// Read a configuration from the [ron] file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TagConfigFileError> {
        let mut handle = File::open(path).map_err(TagConfigFileError::IoError)?;
        Self::from_file(&mut handle)
    }

    /// Read a configuration from the [Read]able object provided.
    pub fn from_file(file: &mut impl Read) -> Result<Self, TagConfigFileError> {
        let mut raw_text = Vec::new();
        file.read_to_end(&mut raw_text)
            .map_err(TagConfigFileError::IoError)?;
        ron::de::from_bytes(&raw_text).map_err(TagConfigFileError::RonSpannedError)
    }

    /// Write this configuration out to `path`.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), TagConfigFileError> {
        let mut handle = File::create(path).map_err(TagConfigFileError::IoError)?;
        self.to_file(&mut handle)
    }

    /// Write this configuration to the [Write]able object provided.
    pub fn to_file(&self, file: &mut impl Write) -> Result<(), TagConfigFileError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(TagConfigFileError::RonError)?;
        file.write_all(text.as_bytes())
            .map_err(TagConfigFileError::IoError)
    }
}

/// Returned when a configuration file cannot be read or written.
#[derive(Debug)]
pub enum TagConfigFileError {
    /// The file could not be opened, read or written.
    IoError(std::io::Error),

    /// Serialization failed.
    RonError(ron::Error),

    /// The file is not a valid configuration.
    RonSpannedError(ron::de::SpannedError),
}

impl fmt::Display for TagConfigFileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TagConfigFileError as TCE;
        let msg = match self {
            TCE::IoError(error) => Cow::from(format!("io error: {}", error)),
            TCE::RonError(error) => Cow::from(format!("ron error: {}", error)),
            TCE::RonSpannedError(error) => Cow::from(format!("bad tag config: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for TagConfigFileError {}
