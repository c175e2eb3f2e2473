//! Observations and Their Annotations
//!
//! An [`Observation`] is a single raw positional report of one moving object,
//! carrying the kinematics derived on arrival and an [`Annotation`] bit set
//! that marks it as a critical point of its trajectory.

use bitflags::bitflags;

bitflags! {
    /// Mobility annotation of a single observation.
    ///
    /// The bit order is observable output: decoded labels are listed in
    /// exactly this order, so it must not be rearranged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Annotation: u16 {
        /// The object has just become stationary at this position
        const STOP_START = 1 << 0;
        /// The object is no longer stationary and has started moving again
        const STOP_END = 1 << 1;
        /// Speed over ground diverged significantly from the recent average
        const CHANGE_IN_SPEED_START = 1 << 2;
        /// Speed over ground no longer diverges from the recent average
        const CHANGE_IN_SPEED_END = 1 << 3;
        /// First position reported while moving at very low speed
        const SLOW_MOTION_START = 1 << 4;
        /// Last position reported while moving at very low speed
        const SLOW_MOTION_END = 1 << 5;
        /// Last position reported before a communication gap
        const GAP_START = 1 << 6;
        /// First position reported after a communication gap
        const GAP_END = 1 << 7;
        /// Turning point: heading changed significantly at this position
        const CHANGE_IN_HEADING = 1 << 8;
        /// The position qualifies as noise and joins no window
        const NOISE = 1 << 9;
        /// Already handed over to the sink; guards against double emission
        const REPORTED = 1 << 10;
    }
}

impl Default for Annotation {
    fn default() -> Self {
        Annotation::empty()
    }
}

/// Decoded label strings, index-aligned with the annotation bits
const LABELS: [&str; 10] = [
    "STOP_START",
    "STOP_END",
    "CHANGE_IN_SPEED_START",
    "CHANGE_IN_SPEED_END",
    "SLOW_MOTION_START",
    "SLOW_MOTION_END",
    "GAP_START",
    "GAP_END",
    "CHANGE_IN_HEADING",
    "NOISE",
];

impl Annotation {
    /// All classification bits that make a point *annotated*. NOISE is a
    /// separate emittable class and deliberately not part of this mask.
    const ANNOTATED_MASK: Annotation = Annotation::STOP_START
        .union(Annotation::STOP_END)
        .union(Annotation::CHANGE_IN_SPEED_START)
        .union(Annotation::CHANGE_IN_SPEED_END)
        .union(Annotation::SLOW_MOTION_START)
        .union(Annotation::SLOW_MOTION_END)
        .union(Annotation::GAP_START)
        .union(Annotation::GAP_END)
        .union(Annotation::CHANGE_IN_HEADING);

    /// True if any classification label other than NOISE is set
    pub fn is_annotated(&self) -> bool {
        self.intersects(Self::ANNOTATED_MASK)
    }

    /// Decode the set bits into their label strings, in bit order
    pub fn labels(&self) -> Vec<&'static str> {
        LABELS
            .iter()
            .enumerate()
            .filter(|(i, _)| self.bits() & (1u16 << i) != 0)
            .map(|(_, label)| *label)
            .collect()
    }
}

/// A single raw point location of a moving object, plus the spatiotemporal
/// features computed against its previously reported (non-noise) position.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Object identifier (the MMSI for vessels)
    pub oid: i64,
    /// Longitude in decimal degrees (WGS84)
    pub x: f64,
    /// Latitude in decimal degrees (WGS84)
    pub y: f64,
    /// UNIX epoch timestamp in seconds, monotonic per object
    pub t: i64,
    /// Instantaneous speed over ground in knots, derived on arrival
    pub speed: f64,
    /// Instantaneous heading over ground in degrees `[0, 360)`, or the
    /// undefined-heading sentinel for zero displacement
    pub heading: f64,
    /// Meters travelled since the previous non-noise position
    pub distance: f64,
    /// Seconds elapsed since the previous non-noise position
    pub time_elapsed: i64,
    /// Mobility annotation bit set
    pub annotation: Annotation,
}

impl Observation {
    /// Create a raw observation; kinematic features start unknown and are
    /// filled in by the state machine when the point arrives.
    pub fn new(oid: i64, x: f64, y: f64, t: i64) -> Self {
        Observation {
            oid,
            x,
            y,
            t,
            speed: 0.0,
            heading: 0.0,
            distance: 0.0,
            time_elapsed: 0,
            annotation: Annotation::empty(),
        }
    }

    /// True if this point carries any classification label other than NOISE
    pub fn is_annotated(&self) -> bool {
        self.annotation.is_annotated()
    }
}
