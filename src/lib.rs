//! Host-side software for the ghost hunter devices: Raspberry Pis carrying
//! a Decawave DWM1001-DEV ultra-wideband board that works out where the
//! hunter is standing, so the game can tell which clues are nearby.
//!
//! The core of the crate is the codec for the board's UART API, in
//! [dwm_api]: it frames commands, checks the response envelope and decodes
//! positions, anchor lists and the tag configuration bitfield. Around it sit
//! the pieces a hunter needs to use the board:
//!
//! - [dwm_port] opens and identifies the serial ports
//! - [startup] configures and resets the board at bring-up
//! - [poller] asks for the location on a timer from its own thread
//! - [location_tracker] remembers the last fix and filters out jitter
//! - [dummy_dwm] simulates a board for tests and demos
//!
//! ```no_run
//! use ghosthunter::{dwm_api::get_location, dwm_port::open_dwm_port};
//!
//! let mut port = open_dwm_port("/dev/ttyACM0").unwrap();
//! let report = get_location(&mut port).unwrap();
//! for anchor in report.anchors_nearest_first() {
//!     println!("anchor {:04x} at {} mm", anchor.address, anchor.distance);
//! }
//! ```

#![warn(missing_docs)]
pub mod args;
pub mod dummy_dwm;
pub mod dwm_api;
pub mod dwm_codes;
pub mod dwm_error;
pub mod dwm_port;
pub mod gui;
pub mod location_tracker;
pub mod poller;
pub mod position;
pub mod startup;
pub mod tag_config;
pub mod uwb_message_decoder;
