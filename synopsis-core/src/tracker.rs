//! Per-Object Dispatch
//!
//! The tracker owns one [`MobilityState`] per observed object and routes
//! every incoming observation to it, resolving the object's vessel type to
//! its threshold profile on first sight.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::MobilityProfile;
use crate::observation::Observation;
use crate::report::PointSink;
use crate::state::MobilityState;

/// Vessel type applied when an object or a type has no specific entry
pub const DEFAULT_VESSEL_TYPE: &str = "Default";

/// Routes observations to per-object mobility states.
#[derive(Debug)]
pub struct SynopsisTracker {
    /// Threshold profiles per vessel type, shared read-only
    profiles: HashMap<String, Arc<MobilityProfile>>,
    /// Vessel type per object identifier
    vessel_types: HashMap<i64, String>,
    /// Live window per object, ordered so the drain is deterministic
    states: BTreeMap<i64, MobilityState>,
}

impl SynopsisTracker {
    /// Create a tracker from the parsed profiles and the id-to-type table.
    /// A `"Default"` profile is guaranteed to exist afterwards.
    pub fn new(
        mut profiles: HashMap<String, Arc<MobilityProfile>>,
        vessel_types: HashMap<i64, String>,
    ) -> Self {
        profiles
            .entry(DEFAULT_VESSEL_TYPE.to_string())
            .or_insert_with(|| Arc::new(MobilityProfile::default()));

        SynopsisTracker {
            profiles,
            vessel_types,
            states: BTreeMap::new(),
        }
    }

    /// Number of distinct objects seen so far
    pub fn object_count(&self) -> usize {
        self.states.len()
    }

    /// Absorb one observation: age out obsolete window entries, then update
    /// (or seed) the object's state.
    pub fn observe(&mut self, p: Observation, sink: &mut dyn PointSink) {
        if let Some(state) = self.states.get_mut(&p.oid) {
            state.expunge_obsolete(p.t, sink);
            if state.is_empty() {
                state.init(p);
            } else {
                state.update(p, sink);
            }
            return;
        }

        let profile = self.resolve_profile(p.oid);
        let mut state = MobilityState::new(p.oid, p.t, profile);
        state.init(p);
        self.states.insert(state.oid(), state);
    }

    /// End of stream: flush every object's window to the sink. All states
    /// are empty afterwards.
    pub fn drain(&mut self, sink: &mut dyn PointSink) {
        for state in self.states.values_mut() {
            state.mark_last_as_gap(sink);
        }
    }

    fn resolve_profile(&self, oid: i64) -> Arc<MobilityProfile> {
        let vessel_type = self
            .vessel_types
            .get(&oid)
            .map(String::as_str)
            .unwrap_or(DEFAULT_VESSEL_TYPE);

        match self.profiles.get(vessel_type) {
            Some(profile) => {
                log::debug!("object {} uses {} profile", oid, profile.vessel_type);
                Arc::clone(profile)
            }
            None => {
                log::debug!(
                    "object {} has unknown vessel type {}, using defaults",
                    oid,
                    vessel_type
                );
                self.profiles
                    .get(DEFAULT_VESSEL_TYPE)
                    .cloned()
                    .unwrap_or_default()
            }
        }
    }
}
