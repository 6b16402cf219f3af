//! Opening the serial ports the boards hang off.
//!
//! The DWM1001-DEV and the micro:bit both show up as USB serial devices and
//! get their names in plug-in order, so which one is which has to be asked.

use crate::dwm_api::probe;
use crate::dwm_codes::UWB_SERIAL_BAUDRATE;

use log::debug;
use serial2::SerialPort;
use std::{io, path::Path, path::PathBuf, time::Duration};

/// Read timeout for the UART link. A board that stays quiet longer than
/// this is treated as gone for that call.
pub const UWB_READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Opens `path` at 115200 baud with the read and write timeouts the codec
/// relies on.
pub fn open_dwm_port(path: impl AsRef<Path>) -> io::Result<SerialPort> {
    let mut port = SerialPort::open(path.as_ref(), UWB_SERIAL_BAUDRATE)?;
    port.set_read_timeout(UWB_READ_TIMEOUT)?;
    port.set_write_timeout(UWB_READ_TIMEOUT)?;
    Ok(port)
}

/// Serial devices present on this machine.
pub fn available_ports() -> io::Result<Vec<PathBuf>> {
    SerialPort::available_ports()
}

/// Opens both ports, asks the first whether it is a DWM1001-DEV and returns
/// `(uwb, other)`. Input buffers are emptied on both so that neither starts
/// with leftovers of the probe.
pub fn identify_ports(
    first: impl AsRef<Path>,
    second: impl AsRef<Path>,
) -> io::Result<(SerialPort, SerialPort)> {
    let mut first_port = open_dwm_port(&first)?;
    let second_port = open_dwm_port(&second)?;

    let first_is_uwb = probe(&mut first_port);
    first_port.discard_buffers()?;
    second_port.discard_buffers()?;

    if first_is_uwb {
        debug!("{} assigned to uwb", first.as_ref().display());
        Ok((first_port, second_port))
    } else {
        debug!("{} assigned to uwb", second.as_ref().display());
        Ok((second_port, first_port))
    }
}
