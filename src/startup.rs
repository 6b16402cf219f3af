//! Board bring-up: push the wanted configuration, reset, and check the board
//! came back with it. Any failure here means the hunter cannot start.

use crate::dwm_api::{get_config, reset, set_tag_config};
use crate::dwm_error::DwmError;
use crate::tag_config::TagConfiguration;

use log::info;
use std::{error::Error, fmt, io::Read, io::Write, time::Duration};

/// How long to give the board between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BringUpTiming {
    /// Pause after writing the configuration.
    pub after_config: Duration,
    /// Pause for the board to reboot.
    pub after_reset: Duration,
}

impl Default for BringUpTiming {
    fn default() -> Self {
        Self {
            after_config: Duration::from_millis(500),
            after_reset: Duration::from_secs(1),
        }
    }
}

impl BringUpTiming {
    /// No waiting, for simulated boards.
    pub fn immediate() -> Self {
        Self {
            after_config: Duration::ZERO,
            after_reset: Duration::ZERO,
        }
    }
}

/// Why bring-up failed.
#[derive(Debug)]
pub enum BringUpError {
    /// A call to the board failed.
    Dwm(DwmError),
    /// The board is up but not running the configuration we gave it.
    ConfigMismatch {
        /// What we asked for
        expected: TagConfiguration,
        /// What the board reports
        actual: TagConfiguration,
    },
}

impl fmt::Display for BringUpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BringUpError::Dwm(e) => write!(f, "DWM1001-DEV bring-up failed: {}", e),
            BringUpError::ConfigMismatch { expected, actual } => write!(
                f,
                "DWM1001-DEV config is {:02x?}, wanted {:02x?}",
                actual.to_bytes(),
                expected.to_bytes()
            ),
        }
    }
}

impl Error for BringUpError {}

impl From<DwmError> for BringUpError {
    fn from(value: DwmError) -> Self {
        Self::Dwm(value)
    }
}

/// Configures the board, resets it and verifies the result.
///
/// With `desired` set to `None` the configuration step is skipped and the
/// board only gets reset and queried. Returns the configuration the board
/// reports afterwards.
pub fn bring_up<C: Read + Write>(
    conn: &mut C,
    desired: Option<&TagConfiguration>,
    timing: &BringUpTiming,
) -> Result<TagConfiguration, BringUpError> {
    if let Some(config) = desired {
        info!("Setting tag configuration {:02x?}", config.to_bytes());
        set_tag_config(conn, config)?;
        spin_sleep::sleep(timing.after_config);
    }

    info!("Resetting board");
    reset(conn)?;
    spin_sleep::sleep(timing.after_reset);

    let actual = get_config(conn)?;
    info!("DWM1001-DEV config: {:?}", actual);

    match desired {
        Some(expected) if *expected != actual => Err(BringUpError::ConfigMismatch {
            expected: *expected,
            actual,
        }),
        _ => Ok(actual),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy_dwm::DummyDwm;
    use crate::dwm_api::tests::ScriptedConnection;
    use crate::dwm_codes::DeviceErrorCode;
    use crate::tag_config::{Role, UwbMode};

    #[test]
    fn configures_simulated_board() {
        let mut dwm = DummyDwm::builder()
            .config(TagConfiguration {
                uwb_mode: UwbMode::OFF,
                ..TagConfiguration::default()
            })
            .build();
        let wanted = TagConfiguration::default();
        let got = bring_up(&mut dwm, Some(&wanted), &BringUpTiming::immediate()).unwrap();
        assert_eq!(got, wanted);
        assert_eq!(dwm.config(), wanted);
    }

    #[test]
    fn reset_only() {
        let mut dwm = DummyDwm::builder().build();
        let got = bring_up(&mut dwm, None, &BringUpTiming::immediate()).unwrap();
        assert_eq!(got, TagConfiguration::default());
    }

    #[test]
    fn board_that_ignores_the_config() {
        // acks set and reset, then reports an anchor configuration
        let mut conn = ScriptedConnection::new(&[
            0x40, 0x01, 0x00, // set
            0x40, 0x01, 0x00, // reset
            0x40, 0x02, 0x00, 0b0101_1110, 0b0010_0100, // get
        ]);
        let err = bring_up(
            &mut conn,
            Some(&TagConfiguration::default()),
            &BringUpTiming::immediate(),
        )
        .unwrap_err();
        match err {
            BringUpError::ConfigMismatch { actual, .. } => assert_eq!(actual.role, Role::Anchor),
            other => panic!("expected a mismatch, got {}", other),
        }
    }

    #[test]
    fn busy_board_is_fatal() {
        let mut dwm = DummyDwm::builder().busy_every(1).build();
        let err = bring_up(&mut dwm, None, &BringUpTiming::immediate()).unwrap_err();
        assert!(matches!(
            err,
            BringUpError::Dwm(DwmError::Protocol(DeviceErrorCode::Busy))
        ));
    }
}
