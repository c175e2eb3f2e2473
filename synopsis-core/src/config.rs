//! Mobility Tracking Parameters
//!
//! A [`MobilityProfile`] bundles the thresholds that drive critical-point
//! detection for one vessel type. Profiles are immutable after parsing and
//! shared read-only between all states of that type.

use serde::Deserialize;

/// Threshold bundle for one vessel type (fishing, passenger, tanker, ...).
///
/// Deserialized from the per-type settings document; any key missing there
/// inherits the built-in default below.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MobilityProfile {
    /// Vessel type these settings apply to; filled from the document key
    #[serde(skip)]
    pub vessel_type: String,

    /// Max number of recent raw positions kept per object window
    #[serde(rename = "STATE_SIZE")]
    pub state_size: usize,
    /// Max age in seconds of positions kept per object window
    #[serde(rename = "STATE_TIMESPAN")]
    pub state_timespan: i64,
    /// Seconds without a report above which a communication gap is declared
    #[serde(rename = "GAP_PERIOD")]
    pub gap_period: i64,

    /// Knots; under this speed the vessel is in slow motion
    #[serde(rename = "LOW_SPEED_THRESHOLD")]
    pub low_speed: f64,
    /// Knots; at or over this speed the position is noise
    #[serde(rename = "MAX_SPEED_THRESHOLD")]
    pub max_speed: f64,
    /// Knots; under this speed the vessel may be stopped
    #[serde(rename = "NO_SPEED_THRESHOLD")]
    pub no_speed: f64,

    /// Fractional divergence from mean speed that flags a speed change
    #[serde(rename = "SPEED_RATIO")]
    pub speed_ratio: f64,
    /// Knots per hour; a larger acceleration marks the position as noise
    #[serde(rename = "MAX_RATE_OF_CHANGE")]
    pub max_rate_of_change: f64,
    /// Degrees per second; a larger rate of turn marks the position as noise
    #[serde(rename = "MAX_RATE_OF_TURN")]
    pub max_rate_of_turn: f64,

    /// Meters; within this distance of its recent positions the vessel may
    /// be stopped
    #[serde(rename = "DISTANCE_THRESHOLD")]
    pub distance_threshold: f64,
    /// Degrees; turning more than this flags a change of heading
    #[serde(rename = "ANGLE_THRESHOLD")]
    pub angle_threshold: f64,
}

impl Default for MobilityProfile {
    fn default() -> Self {
        MobilityProfile {
            vessel_type: "Default".to_string(),
            state_size: 5,
            state_timespan: 1000, // seconds
            gap_period: 600,      // seconds
            low_speed: 2.0,       // knots
            max_speed: 30.0,      // knots
            no_speed: 0.5,        // knots
            speed_ratio: 0.25,
            max_rate_of_change: 100.0, // knots per hour
            max_rate_of_turn: 3.0,     // degrees per second
            distance_threshold: 50.0,  // meters
            angle_threshold: 5.0,      // degrees
        }
    }
}
