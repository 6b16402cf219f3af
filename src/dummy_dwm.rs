//! A simulated DWM1001-DEV. It speaks the same UART API as the real board,
//! so everything that takes a connection can run against it without
//! hardware.
//!
//! The simulated tag walks around a circle inside a square of four anchors,
//! with a little random jitter on every fix.

use crate::dwm_codes::*;
use crate::position::{Anchor, Position};
use crate::tag_config::TagConfiguration;

use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::VecDeque;
use std::f64::consts::PI;
use std::io::{self, Read, Write};

/// Most anchors a location answer can carry alongside the tag position
/// without overflowing its one byte object length.
pub const MAX_ANCHORS: usize = (u8::MAX as usize - 1 - POSITION_LENGTH) / ANCHOR_LENGTH;

/// Builder for a [DummyDwm].
#[derive(Debug, Clone)]
pub struct DummyDwmBuilder {
    anchors: Vec<Position>,
    center: (i32, i32),
    radius: f64,
    steps_per_lap: usize,
    noise: i32,
    seed: u64,
    busy_every: Option<usize>,
    config: TagConfiguration,
}

impl Default for DummyDwmBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyDwmBuilder {
    /// Four anchors on a 5 m square, the tag circling its middle.
    fn new() -> Self {
        let corner = |x, y| Position {
            x,
            y,
            z: 2000,
            qf: 100,
        };
        DummyDwmBuilder {
            anchors: vec![
                corner(0, 0),
                corner(5000, 0),
                corner(5000, 5000),
                corner(0, 5000),
            ],
            center: (2500, 2500),
            radius: 1500.0,
            steps_per_lap: 50,
            noise: 20,
            seed: 0x6057,
            busy_every: None,
            config: TagConfiguration::default(),
        }
    }

    /// Replaces the anchor positions. Addresses are handed out in order.
    /// Only the first [MAX_ANCHORS] are kept.
    pub fn anchors(self, anchors: &[Position]) -> Self {
        DummyDwmBuilder {
            anchors: anchors.iter().copied().take(MAX_ANCHORS).collect(),
            ..self
        }
    }

    /// The circle the tag walks, in mm.
    pub fn path(self, center: (i32, i32), radius: f64) -> Self {
        DummyDwmBuilder {
            center,
            radius,
            ..self
        }
    }

    /// How many location queries it takes to go round once.
    pub fn steps_per_lap(self, steps_per_lap: usize) -> Self {
        DummyDwmBuilder {
            steps_per_lap: steps_per_lap.max(1),
            ..self
        }
    }

    /// Maximum jitter added to each coordinate, in mm.
    pub fn noise(self, noise: i32) -> Self {
        DummyDwmBuilder {
            noise: noise.abs(),
            ..self
        }
    }

    /// Seed for the jitter.
    pub fn seed(self, seed: u64) -> Self {
        DummyDwmBuilder { seed, ..self }
    }

    /// Answer every `n`th command with `busy`.
    pub fn busy_every(self, n: usize) -> Self {
        DummyDwmBuilder {
            busy_every: (n > 0).then_some(n),
            ..self
        }
    }

    /// The configuration the board boots with.
    pub fn config(self, config: TagConfiguration) -> Self {
        DummyDwmBuilder { config, ..self }
    }

    /// Builds the device.
    pub fn build(self) -> DummyDwm {
        DummyDwm {
            rng: StdRng::seed_from_u64(self.seed),
            anchors: self.anchors,
            center: self.center,
            radius: self.radius,
            steps_per_lap: self.steps_per_lap,
            noise: self.noise,
            busy_every: self.busy_every,
            config: self.config,
            pending_config: None,
            step: 0,
            commands_seen: 0,
            inbox: Vec::new(),
            outbox: VecDeque::new(),
        }
    }
}

/// The simulated board. Write commands into it and read the answers back.
#[derive(Debug)]
pub struct DummyDwm {
    rng: StdRng,
    anchors: Vec<Position>,
    center: (i32, i32),
    radius: f64,
    steps_per_lap: usize,
    noise: i32,
    busy_every: Option<usize>,
    config: TagConfiguration,
    // set_tag_config only takes effect after a reset
    pending_config: Option<TagConfiguration>,
    step: usize,
    commands_seen: usize,
    inbox: Vec<u8>,
    outbox: VecDeque<u8>,
}

impl DummyDwm {
    /// Start configuring a [DummyDwm].
    pub fn builder() -> DummyDwmBuilder {
        DummyDwmBuilder::new()
    }

    /// The configuration the board is currently running.
    pub fn config(&self) -> TagConfiguration {
        self.config
    }

    /// Where the tag truly is right now, before jitter.
    pub fn true_position(&self) -> Position {
        let angle = (self.step % self.steps_per_lap) as f64 / self.steps_per_lap as f64 * 2.0 * PI;
        Position {
            x: self.center.0 + (angle.cos() * self.radius).round() as i32,
            y: self.center.1 + (angle.sin() * self.radius).round() as i32,
            z: 0,
            qf: 100,
        }
    }

    /// How many commands the board has answered, busy ones included.
    pub fn commands_seen(&self) -> usize {
        self.commands_seen
    }

    /// Where the anchors sit, in address order starting at 1.
    pub fn anchor_positions(&self) -> &[Position] {
        &self.anchors
    }

    fn jitter(&mut self) -> i32 {
        self.rng.gen_range(-self.noise..=self.noise)
    }

    fn measured_position(&mut self) -> Position {
        let truth = self.true_position();
        Position {
            x: truth.x + self.jitter(),
            y: truth.y + self.jitter(),
            z: truth.z,
            qf: self.rng.gen_range(80..=100),
        }
    }

    fn ranged_anchors(&mut self, tag: &Position) -> Vec<Anchor> {
        let anchors = self.anchors.clone();
        anchors
            .iter()
            .enumerate()
            .map(|(i, &position)| {
                let dz = (position.z - tag.z) as f64;
                let range = (tag.planar_distance(&position).powi(2) + dz.powi(2)).sqrt();
                Anchor {
                    address: i as u16 + 1,
                    distance: (range.round() as i64 + self.jitter() as i64).max(0) as u32,
                    quality_factor: self.rng.gen_range(90..=100),
                    position,
                }
            })
            .collect()
    }

    fn respond_header(&mut self, length: u8, code: DeviceErrorCode) {
        self.outbox.extend([DWM_RETURN_BYTE, length, code.code()]);
    }

    fn respond_object(&mut self, object_type: u8, payload: &[u8]) {
        self.respond_header(0x01, DeviceErrorCode::NoError);
        self.outbox.extend([object_type, payload.len() as u8]);
        self.outbox.extend(payload.iter().copied());
    }

    fn location(&mut self) {
        let tag = self.measured_position();
        let anchors = self.ranged_anchors(&tag);
        self.step += 1;

        let mut payload = vec![anchors.len() as u8];
        for anchor in &anchors {
            payload.extend_from_slice(&anchor.to_bytes());
        }
        if self.config.location_engine_enabled {
            payload.extend_from_slice(&tag.to_bytes());
        }
        self.respond_object(DWM_LOC_GET_RETURN_TYPE, &payload);
    }

    fn position(&mut self) {
        let mut tag = self.measured_position();
        self.step += 1;
        if !self.config.location_engine_enabled {
            tag.qf = 0;
        }
        self.respond_object(DWM_POSITION_RETURN_TYPE, &tag.to_bytes());
    }

    /// Length of the command starting with `opcode`.
    fn frame_length(opcode: u8) -> usize {
        if opcode == DWM_CFG_TAG_MSG[0] {
            DWM_CFG_TAG_MSG.len() + CONFIG_LENGTH
        } else {
            2
        }
    }

    fn handle(&mut self, frame: &[u8]) {
        debug!("dummy dwm got {:02x?}", frame);
        self.commands_seen += 1;
        if let Some(n) = self.busy_every {
            if self.commands_seen % n == 0 {
                self.respond_header(0x01, DeviceErrorCode::Busy);
                return;
            }
        }

        match frame {
            [0x0C, 0x00] => self.location(),
            [0x02, 0x00] => self.position(),
            [0x08, 0x00] => {
                let bytes = self.config.to_bytes();
                self.respond_header(CONFIG_LENGTH as u8, DeviceErrorCode::NoError);
                self.outbox.extend(bytes);
            }
            [0x03, 0x04, b0, b1] => match TagConfiguration::from_bytes(&[*b0, *b1]) {
                Ok(config) => {
                    self.pending_config = Some(config);
                    self.respond_header(0x01, DeviceErrorCode::NoError);
                }
                Err(_) => self.respond_header(0x01, DeviceErrorCode::InvalidParameter),
            },
            [0x14, 0x00] => {
                if let Some(config) = self.pending_config.take() {
                    self.config = config;
                }
                self.respond_header(0x01, DeviceErrorCode::NoError);
            }
            _ => self.respond_header(0x01, DeviceErrorCode::UnknownCommand),
        }
    }
}

impl Write for DummyDwm {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inbox.extend_from_slice(buf);
        while let Some(&opcode) = self.inbox.first() {
            let len = Self::frame_length(opcode);
            if self.inbox.len() < len {
                break;
            }
            let frame: Vec<u8> = self.inbox.drain(..len).collect();
            self.handle(&frame);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for DummyDwm {
    /// Like a serial port with a timeout, an empty device times out rather
    /// than returning 0.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.outbox.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "dummy dwm has nothing to say"));
        }
        let n = buf.len().min(self.outbox.len());
        for (slot, byte) in buf.iter_mut().zip(self.outbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dwm_api::{get_config, get_location, get_position, probe, reset, set_tag_config};
    use crate::tag_config::{Role, UwbMode};

    #[test]
    fn location_has_all_anchors_and_a_fix() {
        let mut dwm = DummyDwm::builder().build();
        let report = get_location(&mut dwm).unwrap();
        assert_eq!(report.anchors.len(), 4);
        assert_eq!(report.anchors.addresses().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert!(report.position.is_some());
    }

    #[test]
    fn noiseless_tag_follows_the_circle() {
        let mut dwm = DummyDwm::builder()
            .noise(0)
            .path((0, 0), 1000.0)
            .steps_per_lap(4)
            .build();
        let expected = [(1000, 0), (0, 1000), (-1000, 0), (0, -1000), (1000, 0)];
        for (x, y) in expected {
            let pos = get_location(&mut dwm).unwrap().position.unwrap();
            assert_eq!((pos.x, pos.y), (x, y));
        }
    }

    #[test]
    fn noiseless_ranges_are_exact() {
        let mut dwm = DummyDwm::builder()
            .noise(0)
            .anchors(&[Position {
                x: 3000,
                y: 4000,
                z: 0,
                qf: 100,
            }])
            .path((0, 0), 0.0)
            .build();
        let report = get_location(&mut dwm).unwrap();
        assert_eq!(report.anchors.get(1).map(|a| a.distance), Some(5000));
    }

    #[test]
    fn anchor_count_is_capped() {
        assert_eq!(MAX_ANCHORS, 12);
        let ring: Vec<Position> = (0..20)
            .map(|i| Position {
                x: i * 500,
                y: 0,
                z: 2000,
                qf: 100,
            })
            .collect();
        let mut dwm = DummyDwm::builder().anchors(&ring).build();
        assert_eq!(dwm.anchor_positions().len(), MAX_ANCHORS);

        let report = get_location(&mut dwm).unwrap();
        assert_eq!(report.anchors.len(), MAX_ANCHORS);
        assert!(report.position.is_some());
        assert_eq!(dwm.outbox.len(), 0);
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let mut dwm = DummyDwm::builder().noise(30).steps_per_lap(1).build();
        let truth = dwm.true_position();
        for _ in 0..100 {
            let pos = get_position(&mut dwm).unwrap();
            assert!((pos.x - truth.x).abs() <= 30);
            assert!((pos.y - truth.y).abs() <= 30);
            assert!(pos.qf >= 80 && pos.qf <= 100);
        }
    }

    #[test]
    fn location_engine_off_drops_the_fix() {
        let config = TagConfiguration {
            location_engine_enabled: false,
            ..TagConfiguration::default()
        };
        let mut dwm = DummyDwm::builder().config(config).build();
        let report = get_location(&mut dwm).unwrap();
        assert_eq!(report.position, None);
        assert_eq!(report.anchors.len(), 4);
    }

    #[test]
    fn config_applies_after_reset() {
        let mut dwm = DummyDwm::builder().build();
        let wanted = TagConfiguration {
            role: Role::Anchor,
            uwb_mode: UwbMode::PASSIVE,
            ..TagConfiguration::default()
        };

        set_tag_config(&mut dwm, &wanted).unwrap();
        assert_eq!(get_config(&mut dwm).unwrap(), TagConfiguration::default());

        reset(&mut dwm).unwrap();
        assert_eq!(get_config(&mut dwm).unwrap(), wanted);
        assert_eq!(dwm.config(), wanted);
    }

    #[test]
    fn busy_every_third_command() {
        let mut dwm = DummyDwm::builder().busy_every(3).build();
        assert!(get_location(&mut dwm).is_ok());
        assert!(get_location(&mut dwm).is_ok());
        assert!(get_location(&mut dwm).unwrap_err().is_busy());
        // the stream is still in step afterwards
        assert!(get_location(&mut dwm).is_ok());
    }

    #[test]
    fn unknown_command() {
        let mut dwm = DummyDwm::builder().build();
        dwm.write_all(&[0x7F, 0x00]).unwrap();
        let mut header = [0; 3];
        dwm.read_exact(&mut header).unwrap();
        assert_eq!(header, [0x40, 0x01, 0x01]);
    }

    #[test]
    fn nothing_to_read_times_out() {
        let mut dwm = DummyDwm::builder().build();
        let mut buf = [0; 1];
        let err = dwm.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn commands_split_across_writes() {
        let mut dwm = DummyDwm::builder().build();
        dwm.write_all(&[0x08]).unwrap();
        dwm.write_all(&[0x00]).unwrap();
        let mut response = [0; 5];
        dwm.read_exact(&mut response).unwrap();
        assert_eq!(&response[..3], &[0x40, 0x02, 0x00]);
    }

    #[test]
    fn answers_probe() {
        let mut dwm = DummyDwm::builder().build();
        assert!(probe(&mut dwm));
        assert!(get_location(&mut dwm).is_ok());
    }
}
