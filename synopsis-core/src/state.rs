//! Per-Object Mobility State
//!
//! A [`MobilityState`] keeps the velocity vector and mobility status of one
//! moving object over a small window of its latest noise-free positions.
//! Every arriving observation runs through two phases: a *forward* check
//! that derives kinematics and classifies the new point, and a *backward*
//! check that may retro-annotate its predecessor as a turning point. Some
//! classifications are tentative and are revoked when a later observation
//! proves them wrong (a "stop" that was really a slow drift, heading jitter
//! while moored).

use std::collections::VecDeque;
use std::sync::Arc;

use bitflags::bitflags;

use crate::config::MobilityProfile;
use crate::geo::{
    angle_difference, azimuth, haversine_distance, rate_of_change_knots, rate_of_turn,
    slope_difference, speed_knots, EPSILON,
};
use crate::observation::{Annotation, Observation};
use crate::report::PointSink;

bitflags! {
    /// Current mobility status of one object
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        const STOPPED = 1 << 0;
        const SPEED_CHANGED = 1 << 1;
        const SLOW_MOTION = 1 << 2;
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::empty()
    }
}

/// Sliding window over the latest noise-free positions of one object.
///
/// The window is bounded both by count (`state_size`) and by age
/// (`state_timespan`), except while the object is stopped: stop history must
/// survive until the stop is confirmed or revoked.
#[derive(Debug)]
pub struct MobilityState {
    /// Object identifier
    oid: i64,
    /// Timestamp of the latest refresh
    cur_time: i64,
    /// Threshold settings for this object's vessel type
    profile: Arc<MobilityProfile>,
    /// Chronologically ordered noise-free positions, oldest first
    seq: VecDeque<Observation>,
    /// Mobility status bitmap
    status: Status,
}

impl MobilityState {
    /// Create an empty state for one object
    pub fn new(oid: i64, t0: i64, profile: Arc<MobilityProfile>) -> Self {
        MobilityState {
            oid,
            cur_time: t0,
            profile,
            seq: VecDeque::new(),
            status: Status::empty(),
        }
    }

    /// Object identifier this state belongs to
    pub fn oid(&self) -> i64 {
        self.oid
    }

    /// True if no positions are currently held
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Current mobility status bits
    pub fn status(&self) -> Status {
        self.status
    }

    /// Number of positions currently held
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    /// Seed the window with the first position after creation or after a
    /// purge. The point marks the end of a (possibly implicit) gap.
    pub fn init(&mut self, mut p: Observation) {
        p.annotation.insert(Annotation::GAP_END);
        self.cur_time = p.t;
        self.seq.push_back(p);
        self.status = Status::empty();
    }

    /// Absorb a new position: classify it against the window (forward
    /// check), then decide whether its predecessor was a turning point
    /// (backward check).
    pub fn update(&mut self, p: Observation, sink: &mut dyn PointSink) {
        if self.seq.is_empty() {
            // Callers refresh an empty state through init; keep the
            // invariant even if they don't.
            self.init(p);
            return;
        }

        if !self.forward_check(p, sink) {
            // The point was noise or re-seeded the window; its predecessor
            // is out of reach for retro-annotation.
            return;
        }

        self.backward_check(sink);

        if let Some(last) = self.seq.back() {
            if last.annotation.contains(Annotation::STOP_END) {
                self.status.remove(Status::STOPPED);
            }
        }
    }

    /// Forward mobility check: derive the instantaneous features of `p`
    /// against the latest window entry, filter noise, handle gaps, and
    /// annotate stop / speed / slow-motion transitions on `p` itself.
    ///
    /// Returns true when `p` was appended to the window.
    fn forward_check(&mut self, mut p: Observation, sink: &mut dyn PointSink) -> bool {
        let profile = Arc::clone(&self.profile);

        let (q_x, q_y, q_t) = match self.seq.back() {
            Some(q) => (q.x, q.y, q.t),
            None => return false,
        };

        p.distance = haversine_distance(q_x, q_y, p.x, p.y);
        p.time_elapsed = p.t - q_t;

        // Delayed or duplicate timestamps are noise outright
        if p.time_elapsed <= 0 {
            p.annotation.insert(Annotation::NOISE);
            sink.report(p);
            return false;
        }

        p.speed = speed_knots(p.distance, p.time_elapsed);
        p.heading = azimuth(q_x, q_y, p.x, p.y);

        // Communication restored after a gap
        if p.time_elapsed > profile.gap_period {
            p.annotation.insert(Annotation::GAP_END);
            if let Some(q) = self.seq.back_mut() {
                q.annotation.insert(Annotation::GAP_START);
            }

            // A stopped object that has not moved keeps its window (and its
            // stop history); anything else starts over from this point.
            let holds_still = self.status.contains(Status::STOPPED)
                && (p.distance < profile.distance_threshold
                    || self.stop_net_displacement(false) < profile.distance_threshold);
            if !holds_still {
                self.purge(sink);
                self.init(p);
                return false;
            }
        }

        if let Some(q) = self.seq.back() {
            if check_noise(&profile, q, &p) {
                p.annotation.insert(Annotation::NOISE);
                sink.report(p);
                return false;
            }
        }

        self.cur_time = p.t;
        self.seq.push_back(p);

        let n = self.seq.len();
        if n < 2 {
            return true;
        }

        let p_speed = self.seq[n - 1].speed;
        let p_distance = self.seq[n - 1].distance;
        let old_speed = self.seq[n - 2].speed;
        let old_gap_end = self.seq[n - 2].annotation.contains(Annotation::GAP_END);

        if !self.status.contains(Status::STOPPED)
            && p_speed < profile.no_speed
            && (p_distance < profile.distance_threshold
                || self.distance_from_centroid() < profile.distance_threshold)
        {
            // Entering a stop. Right after a gap the stop belongs to the
            // restored point, not the new one.
            if old_gap_end {
                self.seq[n - 2].annotation.insert(Annotation::STOP_START);
            } else {
                self.seq[n - 1].annotation.insert(Annotation::STOP_START);
            }
            self.status.insert(Status::STOPPED);

            if self.status.contains(Status::SLOW_MOTION) {
                self.seq[n - 1].annotation.insert(Annotation::SLOW_MOTION_END);
                self.status.remove(Status::SLOW_MOTION);
            }
            if self.status.contains(Status::SPEED_CHANGED) {
                self.seq[n - 1]
                    .annotation
                    .insert(Annotation::CHANGE_IN_SPEED_END);
                self.status.remove(Status::SPEED_CHANGED);
            }
        } else if self.status.contains(Status::STOPPED)
            && (p_speed >= profile.no_speed || p_distance >= profile.distance_threshold)
        {
            if self.stop_net_displacement(true) > profile.distance_threshold {
                // Not really a stop: the object kept drifting the whole time
                self.revoke_stop();
                self.status.remove(Status::STOPPED);
            } else if self.stop_net_displacement(false) >= profile.distance_threshold {
                self.seq[n - 2].annotation.insert(Annotation::STOP_END);
                self.status.remove(Status::STOPPED);
                // Heading jitter while moored is meaningless
                self.revoke_change_in_heading();
            }
        }

        if !self.status.contains(Status::STOPPED) {
            let mean_speed = self.mean_speed();
            let ratio = ((p_speed - mean_speed) / mean_speed).abs();

            if ratio > profile.speed_ratio && !self.status.contains(Status::SPEED_CHANGED) {
                self.seq[n - 1]
                    .annotation
                    .insert(Annotation::CHANGE_IN_SPEED_START);
                self.status.insert(Status::SPEED_CHANGED);
            }
            if ratio <= profile.speed_ratio && self.status.contains(Status::SPEED_CHANGED) {
                self.seq[n - 1]
                    .annotation
                    .insert(Annotation::CHANGE_IN_SPEED_END);
                self.status.remove(Status::SPEED_CHANGED);
            }

            if p_speed <= profile.low_speed
                && old_speed > profile.low_speed
                && !self.status.contains(Status::SLOW_MOTION)
            {
                self.seq[n - 1]
                    .annotation
                    .insert(Annotation::SLOW_MOTION_START);
                self.status.insert(Status::SLOW_MOTION);
            }
            if p_speed > profile.low_speed
                && old_speed <= profile.low_speed
                && self.status.contains(Status::SLOW_MOTION)
            {
                self.seq[n - 1].annotation.insert(Annotation::SLOW_MOTION_END);
                self.status.remove(Status::SLOW_MOTION);
            }
        }

        true
    }

    /// Backward mobility check: decide whether the previous position (now
    /// second to last) was a turning point, judged by the heading of the
    /// newly appended one.
    fn backward_check(&mut self, sink: &mut dyn PointSink) {
        let profile = Arc::clone(&self.profile);

        let n = self.seq.len();
        if n < 2 {
            return;
        }

        let p_speed = self.seq[n - 1].speed;
        let p_heading = self.seq[n - 1].heading;
        let q_heading = self.seq[n - 2].heading;

        if self.seq[n - 2].annotation.contains(Annotation::GAP_END) {
            // No heading decision is possible across a gap; carry the fresh
            // vector back onto the restored point instead.
            self.seq[n - 2].speed = p_speed;
            self.seq[n - 2].heading = p_heading;
            return;
        }

        if p_speed > profile.no_speed
            && (angle_difference(p_heading, q_heading) > profile.angle_threshold
                || self.accumulated_heading().abs() > profile.angle_threshold)
        {
            // At low speed a small apparent turn is usually sea drift
            if p_speed < profile.low_speed
                && angle_difference(p_heading, self.mean_heading()) < 2.0 * profile.angle_threshold
            {
                return;
            }

            self.seq[n - 2].annotation.insert(Annotation::CHANGE_IN_HEADING);
            if !self
                .status
                .intersects(Status::STOPPED | Status::SLOW_MOTION)
            {
                // The course changed; older positions no longer describe
                // the current leg.
                self.cleanup(sink);
            }
        }
    }

    /// Release window entries that fell out of the count or age bound.
    ///
    /// Does nothing while the object is stopped: the stop history must stay
    /// available in case the stop is later revoked. Always keeps the latest
    /// position for gap detection.
    pub fn expunge_obsolete(&mut self, t: i64, sink: &mut dyn PointSink) {
        if self.status.contains(Status::STOPPED) {
            return;
        }

        while self.seq.len() > 1 {
            let expired = self.seq[0].t <= t - self.profile.state_timespan
                || self.seq.len() > self.profile.state_size;
            if !expired {
                break;
            }
            if let Some(front) = self.seq.pop_front() {
                sink.report(front);
            }
        }

        match self.seq.back() {
            Some(last) => self.cur_time = last.t,
            None => self.status = Status::empty(),
        }
    }

    /// End-of-stream drain: the last retained position becomes a gap start,
    /// stop-time heading jitter is revoked, and the whole window is handed
    /// to the sink.
    pub fn mark_last_as_gap(&mut self, sink: &mut dyn PointSink) {
        if let Some(last) = self.seq.back_mut() {
            last.annotation.insert(Annotation::GAP_START);
            if self.status.contains(Status::STOPPED) {
                self.revoke_change_in_heading();
            }
        }

        while let Some(front) = self.seq.pop_front() {
            sink.report(front);
        }
        self.status = Status::empty();
    }

    /// Hand every window entry to the sink and reset the status
    fn purge(&mut self, sink: &mut dyn PointSink) {
        while let Some(front) = self.seq.pop_front() {
            sink.report(front);
        }
        self.status = Status::empty();
    }

    /// Release everything except the two latest positions
    fn cleanup(&mut self, sink: &mut dyn PointSink) {
        while self.seq.len() > 2 {
            if let Some(front) = self.seq.pop_front() {
                sink.report(front);
            }
        }
    }

    /// Invalidate a tentative stop: clear the most recent STOP_START in the
    /// window. Returns false if none was found.
    fn revoke_stop(&mut self) -> bool {
        for obs in self.seq.iter_mut().rev() {
            if obs.annotation.contains(Annotation::STOP_START) {
                obs.annotation.remove(Annotation::STOP_START);
                return true;
            }
        }
        false
    }

    /// Clear CHANGE_IN_HEADING marks back through the most recent
    /// STOP_START (inclusive). Returns true if the stop start was reached.
    fn revoke_change_in_heading(&mut self) -> bool {
        for obs in self.seq.iter_mut().rev() {
            if obs.annotation.contains(Annotation::CHANGE_IN_HEADING) {
                obs.annotation.remove(Annotation::CHANGE_IN_HEADING);
            }
            if obs.annotation.contains(Annotation::STOP_START) {
                return true;
            }
        }
        false
    }

    /// Time interval in seconds spanned by the window
    fn timespan(&self) -> i64 {
        match self.seq.front() {
            Some(first) => self.cur_time - first.t,
            None => 0,
        }
    }

    /// Total displacement in meters across consecutive window positions.
    /// The oldest entry is skipped: its distance refers to a predecessor
    /// that already left the window.
    fn sum_travel_distance(&self) -> f64 {
        self.seq.iter().skip(1).map(|o| o.distance).sum()
    }

    /// Average speed in knots over the whole window
    fn mean_speed(&self) -> f64 {
        speed_knots(self.sum_travel_distance(), self.timespan())
    }

    /// Mean course of the object: azimuth from the oldest to the latest
    /// position in the window
    fn mean_heading(&self) -> f64 {
        match (self.seq.front(), self.seq.back()) {
            (Some(first), Some(last)) => azimuth(first.x, first.y, last.x, last.y),
            _ => 0.0,
        }
    }

    /// Accumulated signed heading drift across consecutive window positions
    fn accumulated_heading(&self) -> f64 {
        let mut drift = 0.0;
        let mut iter = self.seq.iter();
        if let Some(mut prev) = iter.next() {
            for next in iter {
                drift += slope_difference(prev.heading, next.heading);
                prev = next;
            }
        }
        drift
    }

    /// Distance in meters from the latest position to the centroid of the
    /// window (planar mean of coordinates; fine at window scale)
    fn distance_from_centroid(&self) -> f64 {
        let n = self.seq.len() as f64;
        let cx: f64 = self.seq.iter().map(|o| o.x).sum::<f64>() / n;
        let cy: f64 = self.seq.iter().map(|o| o.y).sum::<f64>() / n;
        match self.seq.back() {
            Some(last) => haversine_distance(last.x, last.y, cx, cy),
            None => 0.0,
        }
    }

    /// Net displacement in meters accumulated since the stop started,
    /// walking the window newest to oldest up to (and including) the
    /// STOP_START mark. With `exclude_current` the latest position is left
    /// out of the sum.
    fn stop_net_displacement(&self, exclude_current: bool) -> f64 {
        let mut iter = self.seq.iter().rev();
        if exclude_current {
            iter.next();
        }

        let mut prev = match iter.next() {
            Some(first) => first,
            None => return 0.0,
        };

        let mut dx = 0.0;
        let mut dy = 0.0;
        for next in iter {
            dx += next.x - prev.x;
            dy += next.y - prev.y;
            prev = next;
            if next.annotation.contains(Annotation::STOP_START) {
                break;
            }
        }

        haversine_distance(0.0, 0.0, dx, dy)
    }
}

/// Noise filter applied to a candidate point `p` against its predecessor
/// `q`. Right after a gap no noise verdict is possible: there is only a
/// single usable location on record.
fn check_noise(profile: &MobilityProfile, q: &Observation, p: &Observation) -> bool {
    if q.annotation.contains(Annotation::GAP_END) || p.annotation.contains(Annotation::GAP_END) {
        return false;
    }

    // Excessive speed
    if p.speed >= profile.max_speed {
        return true;
    }
    // Improbable acceleration or deceleration
    if q.speed > EPSILON && rate_of_change_knots(q, p).abs() >= profile.max_rate_of_change {
        return true;
    }
    // Sudden surge in the rate of turn while actually moving
    if p.speed > profile.low_speed && rate_of_turn(p, q) >= profile.max_rate_of_turn {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that keeps reported points for inspection
    #[derive(Default)]
    struct Collect(Vec<Observation>);

    impl PointSink for Collect {
        fn report(&mut self, point: Observation) {
            self.0.push(point);
        }
    }

    fn default_state() -> MobilityState {
        MobilityState::new(1, 1000, Arc::new(MobilityProfile::default()))
    }

    fn feed(state: &mut MobilityState, sink: &mut Collect, points: &[(f64, f64, i64)]) {
        for &(x, y, t) in points {
            let obs = Observation::new(1, x, y, t);
            state.expunge_obsolete(t, sink);
            if state.is_empty() {
                state.init(obs);
            } else {
                state.update(obs, sink);
            }
        }
    }

    #[test]
    fn test_init_marks_gap_end() {
        let mut state = default_state();
        state.init(Observation::new(1, 0.0, 0.0, 1000));
        assert_eq!(state.len(), 1);
        assert!(state.seq[0].annotation.contains(Annotation::GAP_END));
    }

    #[test]
    fn test_duplicate_timestamp_is_noise() {
        let mut state = default_state();
        let mut sink = Collect::default();
        feed(&mut state, &mut sink, &[(0.0, 0.0, 1000), (0.001, 0.0, 1000)]);

        assert_eq!(state.len(), 1);
        assert_eq!(sink.0.len(), 1);
        assert!(sink.0[0].annotation.contains(Annotation::NOISE));
        assert!(!sink.0[0].is_annotated());
    }

    #[test]
    fn test_excessive_speed_is_noise() {
        let mut state = default_state();
        let mut sink = Collect::default();
        // Third point jumps ~5 degrees in 10 seconds; the second is shielded
        // from the noise filter by the gap-end mark on the first.
        feed(
            &mut state,
            &mut sink,
            &[(0.0, 0.0, 1000), (0.001, 0.0, 1010), (5.0, 0.0, 1020)],
        );

        assert_eq!(state.len(), 2);
        assert_eq!(sink.0.len(), 1);
        assert!(sink.0[0].annotation.contains(Annotation::NOISE));
    }

    #[test]
    fn test_first_point_after_window_seed_escapes_noise_filter() {
        let mut state = default_state();
        let mut sink = Collect::default();
        // Implausible jump right after init: the predecessor carries
        // GAP_END, so no noise verdict is possible yet.
        feed(&mut state, &mut sink, &[(0.0, 0.0, 1000), (5.0, 5.0, 1010)]);

        assert_eq!(state.len(), 2);
        assert!(sink.0.is_empty());
    }

    #[test]
    fn test_gap_purges_moving_window() {
        let mut state = default_state();
        let mut sink = Collect::default();
        feed(
            &mut state,
            &mut sink,
            &[
                (0.0, 0.0, 1000),
                (0.0001, 0.0, 1030),
                (0.5, 0.5, 4630), // 3600 s later
            ],
        );

        // Window re-seeded with the third point only
        assert_eq!(state.len(), 1);
        assert_eq!(sink.0.len(), 2);
        assert!(sink.0[0].annotation.contains(Annotation::GAP_END));
        assert!(sink.0[1].annotation.contains(Annotation::GAP_START));
    }

    #[test]
    fn test_gap_while_stopped_keeps_window() {
        let mut state = default_state();
        let mut sink = Collect::default();
        // Five coincident points enter a stop, then a long silence with no
        // movement: the stop continues and nothing is purged.
        feed(
            &mut state,
            &mut sink,
            &[
                (0.0, 0.0, 1000),
                (0.0, 0.0, 1060),
                (0.0, 0.0, 1120),
                (0.0, 0.0, 1180),
                (0.0, 0.0, 1240),
                (0.0, 0.0, 4840), // 3600 s later, same spot
            ],
        );

        assert!(state.status().contains(Status::STOPPED));
        assert!(sink.0.is_empty());
        assert_eq!(state.len(), 6);
    }

    #[test]
    fn test_stop_start_lands_on_gap_end_point() {
        let mut state = default_state();
        let mut sink = Collect::default();
        feed(&mut state, &mut sink, &[(0.0, 0.0, 1000), (0.0, 0.0, 1060)]);

        assert!(state.status().contains(Status::STOPPED));
        // The first point carries GAP_END, so the stop is anchored there
        assert!(state.seq[0].annotation.contains(Annotation::STOP_START));
        assert!(!state.seq[1].annotation.contains(Annotation::STOP_START));
    }

    #[test]
    fn test_confirmed_stop_gets_stop_end() {
        let mut state = default_state();
        let mut sink = Collect::default();
        feed(
            &mut state,
            &mut sink,
            &[
                (0.0, 0.0, 1000),
                (0.0, 0.0, 1060),
                (0.0, 0.0, 1120),
                (0.005, 0.0, 1180), // ~556 m away at ~18 knots
            ],
        );

        assert!(!state.status().contains(Status::STOPPED));
        // STOP_END lands on the last stationary point, not the mover
        assert!(state.seq[state.len() - 2]
            .annotation
            .contains(Annotation::STOP_END));
        // The stop start itself stays valid
        assert!(sink
            .0
            .iter()
            .any(|o| o.annotation.contains(Annotation::STOP_START)));
    }

    #[test]
    fn test_false_stop_is_revoked() {
        let mut state = default_state();
        let mut sink = Collect::default();
        // Creep at ~0.39 knots: each 12 m step stays under the stop
        // thresholds, so a stop is (wrongly) entered while the net drift
        // keeps growing past the distance threshold.
        let mut creep: Vec<(f64, f64, i64)> = (0..6)
            .map(|i| (0.000108 * i as f64, 0.0, 1000 + 60 * i as i64))
            .collect();
        // A 60 m step finally trips the stop-exit check; by then the
        // accumulated displacement proves this never was a stop.
        creep.push((0.001080, 0.0, 1360));
        feed(&mut state, &mut sink, &creep);

        assert!(!state.status().contains(Status::STOPPED));
        let stop_starts = state
            .seq
            .iter()
            .filter(|o| o.annotation.contains(Annotation::STOP_START))
            .count();
        assert_eq!(stop_starts, 0);
    }

    #[test]
    fn test_slow_motion_start_and_end() {
        let mut state = default_state();
        let mut sink = Collect::default();
        // ~2.5 knots, dipping to ~1.5 knots for two steps, then back up to
        // ~2.8. The deceleration is gentle enough to clear the noise
        // filter's rate-of-change bound.
        feed(
            &mut state,
            &mut sink,
            &[
                (0.0, 0.0, 1000),
                (0.000694, 0.0, 1060),
                (0.001388, 0.0, 1120),
                (0.001804, 0.0, 1180), // ~1.5 knots
                (0.002220, 0.0, 1240),
                (0.002996, 0.0, 1300), // ~2.8 knots
            ],
        );

        let starts: Vec<i64> = state
            .seq
            .iter()
            .filter(|o| o.annotation.contains(Annotation::SLOW_MOTION_START))
            .map(|o| o.t)
            .collect();
        let ends: Vec<i64> = state
            .seq
            .iter()
            .filter(|o| o.annotation.contains(Annotation::SLOW_MOTION_END))
            .map(|o| o.t)
            .collect();
        assert_eq!(starts, vec![1180]);
        assert_eq!(ends, vec![1300]);
        assert!(!state.status().contains(Status::SLOW_MOTION));
    }

    #[test]
    fn test_heading_change_is_retro_annotated() {
        let mut state = default_state();
        let mut sink = Collect::default();
        // Three legs east, then one leg north: the turn happened at the
        // third point, flagged when the fourth arrives.
        feed(
            &mut state,
            &mut sink,
            &[
                (0.0, 0.0, 1000),
                (0.005, 0.0, 1060),
                (0.01, 0.0, 1120),
                (0.01, 0.005, 1180),
            ],
        );

        // Window cleaned to the two newest points after the turn
        assert_eq!(state.len(), 2);
        assert!(state.seq[0].annotation.contains(Annotation::CHANGE_IN_HEADING));
        assert_eq!(state.seq[0].t, 1120);
        // The two oldest points were released by the cleanup
        assert_eq!(sink.0.len(), 2);
        assert_eq!(sink.0[0].t, 1000);
    }

    #[test]
    fn test_speed_change_start_and_end() {
        let mut state = default_state();
        let mut sink = Collect::default();
        // Two legs at ~4 knots, a ramp to ~7 via ~5.5 (each step within the
        // rate-of-change bound), then steady until the window mean catches
        // up with the new pace.
        feed(
            &mut state,
            &mut sink,
            &[
                (0.0, 0.0, 1000),
                (0.001109, 0.0, 1060),
                (0.002218, 0.0, 1120),
                (0.003743, 0.0, 1180), // ~5.5 knots
                (0.005684, 0.0, 1240), // ~7 knots
                (0.007625, 0.0, 1300),
                (0.009566, 0.0, 1360),
            ],
        );

        let flagged: Vec<(i64, Annotation)> = state
            .seq
            .iter()
            .chain(sink.0.iter())
            .filter(|o| {
                o.annotation.intersects(
                    Annotation::CHANGE_IN_SPEED_START | Annotation::CHANGE_IN_SPEED_END,
                )
            })
            .map(|o| (o.t, o.annotation))
            .collect();
        assert_eq!(flagged.len(), 2);
        assert!(flagged
            .iter()
            .any(|(t, a)| *t == 1240 && a.contains(Annotation::CHANGE_IN_SPEED_START)));
        assert!(flagged
            .iter()
            .any(|(t, a)| *t == 1360 && a.contains(Annotation::CHANGE_IN_SPEED_END)));
        assert!(!state.status().contains(Status::SPEED_CHANGED));
    }

    #[test]
    fn test_expunge_respects_count_bound() {
        let mut state = default_state();
        let mut sink = Collect::default();
        let line: Vec<(f64, f64, i64)> = (0..8)
            .map(|i| (0.005 * i as f64, 0.0, 1000 + 60 * i as i64))
            .collect();
        feed(&mut state, &mut sink, &line);

        // state_size is 5; the window may briefly hold one more
        assert!(state.len() <= 6);
        assert!(!sink.0.is_empty());
    }

    #[test]
    fn test_expunge_skipped_while_stopped() {
        let mut state = default_state();
        let mut sink = Collect::default();
        let moored: Vec<(f64, f64, i64)> = (0..12)
            .map(|i| (0.0, 0.0, 1000 + 60 * i as i64))
            .collect();
        feed(&mut state, &mut sink, &moored);

        // All twelve points stay: stop history may still be revoked
        assert_eq!(state.len(), 12);
        assert!(sink.0.is_empty());
    }

    #[test]
    fn test_mark_last_as_gap_empties_state() {
        let mut state = default_state();
        let mut sink = Collect::default();
        feed(&mut state, &mut sink, &[(0.0, 0.0, 1000), (0.005, 0.0, 1060)]);

        state.mark_last_as_gap(&mut sink);
        assert!(state.is_empty());
        assert_eq!(sink.0.len(), 2);
        assert!(sink.0[1].annotation.contains(Annotation::GAP_START));
    }

    #[test]
    fn test_single_point_drain_carries_both_gap_marks() {
        let mut state = default_state();
        let mut sink = Collect::default();
        feed(&mut state, &mut sink, &[(0.0, 0.0, 1000)]);

        state.mark_last_as_gap(&mut sink);
        assert_eq!(sink.0.len(), 1);
        let annotation = sink.0[0].annotation;
        assert!(annotation.contains(Annotation::GAP_END | Annotation::GAP_START));
    }

    #[test]
    fn test_stopped_and_slow_motion_are_exclusive() {
        let mut state = default_state();
        let mut sink = Collect::default();
        // Slow crawl first (slow motion), then dead stop
        feed(
            &mut state,
            &mut sink,
            &[
                (0.0, 0.0, 1000),
                (0.000694, 0.0, 1060), // ~2.5 knots
                (0.001027, 0.0, 1120), // ~1.2 knots, slow motion starts
                (0.001027, 0.0, 1180), // full stop
                (0.001027, 0.0, 1240),
            ],
        );

        let status = state.status();
        assert!(status.contains(Status::STOPPED));
        assert!(!status.contains(Status::SLOW_MOTION));
        // Entering the stop closed the slow-motion phase on the same point
        let stop_point = state
            .seq
            .iter()
            .find(|o| o.annotation.contains(Annotation::STOP_START))
            .unwrap();
        assert!(stop_point.annotation.contains(Annotation::SLOW_MOTION_END));
    }
}
