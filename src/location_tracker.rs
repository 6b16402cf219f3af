//! The "where was I last" state of whoever polls the board.
//!
//! UWB fixes wobble by a few centimeters even when the hunter stands still,
//! so a new fix only counts as movement once it is at least `tolerance`
//! away (in the horizontal plane) from the previous one.

use crate::position::{LocationReport, Position};

use std::time::{Duration, Instant};

/// Default movement threshold, mm.
pub const DEFAULT_TOLERANCE_MM: f64 = 100.0;

/// How a new report relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Movement {
    /// The first fix we have seen.
    First(Position),
    /// The tag moved at least the tolerance.
    Moved {
        /// Last known position
        from: Position,
        /// New position
        to: Position,
        /// Planar distance between them, mm
        distance_mm: f64,
    },
    /// The fix changed by less than the tolerance.
    Jitter {
        /// Planar distance from the last fix, mm
        distance_mm: f64,
    },
    /// The report had no tag position.
    NoFix,
}

/// Keeps the last fix and classifies new ones against it.
#[derive(Debug, Clone)]
pub struct LocationTracker {
    tolerance_mm: f64,
    last_report: Option<LocationReport>,
    last_fix: Option<(Position, Instant)>,
}

impl Default for LocationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_MM)
    }
}

impl LocationTracker {
    /// A tracker with no history.
    pub fn new(tolerance_mm: f64) -> Self {
        Self {
            tolerance_mm,
            last_report: None,
            last_fix: None,
        }
    }

    /// Classifies `report` and then remembers it. Every fix replaces the
    /// last known one, jitter included.
    pub fn observe(&mut self, report: LocationReport) -> Movement {
        self.observe_at(report, Instant::now())
    }

    fn observe_at(&mut self, report: LocationReport, now: Instant) -> Movement {
        let movement = match (report.position, self.last_fix) {
            (None, _) => Movement::NoFix,
            (Some(to), None) => Movement::First(to),
            (Some(to), Some((from, _))) => {
                let distance_mm = from.planar_distance(&to);
                if distance_mm >= self.tolerance_mm {
                    Movement::Moved {
                        from,
                        to,
                        distance_mm,
                    }
                } else {
                    Movement::Jitter { distance_mm }
                }
            }
        };

        if let Some(position) = report.position {
            self.last_fix = Some((position, now));
        }
        self.last_report = Some(report);
        movement
    }

    /// The last tag position seen, if any.
    pub fn last_position(&self) -> Option<Position> {
        self.last_fix.map(|(position, _)| position)
    }

    /// The most recent report, fix or not.
    pub fn last_report(&self) -> Option<&LocationReport> {
        self.last_report.as_ref()
    }

    /// Whether the last fix is older than `max_age`. No fix at all counts
    /// as stale.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.is_stale_at(max_age, Instant::now())
    }

    fn is_stale_at(&self, max_age: Duration, now: Instant) -> bool {
        match self.last_fix {
            Some((_, seen)) => now.saturating_duration_since(seen) > max_age,
            None => true,
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.last_report = None;
        self.last_fix = None;
    }
}
