//! The positioning data model: tag and anchor positions as reported by the
//! DWM1001-DEV, and the [LocationReport] returned by a location query.
//!
//! All distances and coordinates are in millimeters.

use crate::dwm_codes::{ANCHOR_LENGTH, POSITION_LENGTH};

/// A 3-D coordinate with the quality factor the location engine assigned
/// to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// X coordinate, mm
    pub x: i32,
    /// Y coordinate, mm
    pub y: i32,
    /// Z coordinate, mm
    pub z: i32,
    /// Quality factor, 0 to 100 percent
    pub qf: u8,
}

impl Position {
    /// The 13 byte wire representation: x, y, z little-endian then qf.
    pub fn to_bytes(&self) -> [u8; POSITION_LENGTH] {
        let mut buf = [0; POSITION_LENGTH];
        buf[0..4].copy_from_slice(&self.x.to_le_bytes());
        buf[4..8].copy_from_slice(&self.y.to_le_bytes());
        buf[8..12].copy_from_slice(&self.z.to_le_bytes());
        buf[12] = self.qf;
        buf
    }

    /// Distance to `other` in the horizontal plane, ignoring z.
    pub fn planar_distance(&self, other: &Self) -> f64 {
        let dx = other.x as f64 - self.x as f64;
        let dy = other.y as f64 - self.y as f64;
        (dx.powi(2) + dy.powi(2)).sqrt()
    }
}

/// A fixed ranging beacon the tag could see when the location was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor {
    /// UWB address, only meaningful within one response
    pub address: u16,
    /// Measured range from the tag, mm
    pub distance: u32,
    /// Ranging quality factor, percent
    pub quality_factor: u8,
    /// Where the anchor itself sits
    pub position: Position,
}

impl Anchor {
    /// The 20 byte wire representation.
    pub fn to_bytes(&self) -> [u8; ANCHOR_LENGTH] {
        let mut buf = [0; ANCHOR_LENGTH];
        buf[0..2].copy_from_slice(&self.address.to_le_bytes());
        buf[2..6].copy_from_slice(&self.distance.to_le_bytes());
        buf[6] = self.quality_factor;
        buf[7..].copy_from_slice(&self.position.to_bytes());
        buf
    }
}

/// Anchors keyed by address, kept in the order the device listed them.
///
/// Inserting an address that is already present replaces that entry
/// without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorMap {
    entries: Vec<Anchor>,
}

impl AnchorMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `anchor`, replacing any earlier anchor with the same address.
    pub fn insert(&mut self, anchor: Anchor) {
        match self.entries.iter_mut().find(|a| a.address == anchor.address) {
            Some(existing) => *existing = anchor,
            None => self.entries.push(anchor),
        }
    }

    /// The anchor with this address, if the device reported it.
    pub fn get(&self, address: u16) -> Option<&Anchor> {
        self.entries.iter().find(|a| a.address == address)
    }

    /// Number of distinct anchors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no anchors were reported.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Anchors in device order.
    pub fn iter(&self) -> std::slice::Iter<'_, Anchor> {
        self.entries.iter()
    }

    /// Anchor addresses in device order.
    pub fn addresses(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.iter().map(|a| a.address)
    }
}

impl FromIterator<Anchor> for AnchorMap {
    fn from_iter<T: IntoIterator<Item = Anchor>>(iter: T) -> Self {
        let mut map = AnchorMap::new();
        for anchor in iter {
            map.insert(anchor);
        }
        map
    }
}

impl<'a> IntoIterator for &'a AnchorMap {
    type Item = &'a Anchor;
    type IntoIter = std::slice::Iter<'a, Anchor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The decoded answer to one location query. A fresh one is built for
/// every call; nothing here is cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationReport {
    /// The tag's own position, `None` when the location engine has no fix.
    pub position: Option<Position>,
    /// Anchors in range, in device order.
    pub anchors: AnchorMap,
}

impl LocationReport {
    /// Anchors sorted by measured distance, closest first. The device does
    /// not sort them.
    pub fn anchors_nearest_first(&self) -> Vec<Anchor> {
        let mut anchors: Vec<Anchor> = self.anchors.iter().copied().collect();
        anchors.sort_by_key(|a| a.distance);
        anchors
    }
}
