//! Synopsis Core - Trajectory synopsis library for vessel position streams
//!
//! This crate contains the pure mobility-tracking logic used to compress a
//! stream of raw positional reports into annotated critical points. It has no
//! I/O dependencies; reading streams and writing result files is the job of
//! the `synopsis-cli` crate.
//!
//! # Pipeline
//!
//! ```text
//! raw observations ──► SynopsisTracker ──► per-object MobilityState ──► ReportBuffer
//!                      (oid dispatch)      (classify / revoke / evict)   (time-ordered output)
//! ```
//!
//! Each moving object gets a [`state::MobilityState`]: a bounded window of its
//! most recent noise-free observations. Every arriving observation is
//! classified against that window (stop, slow motion, speed change, heading
//! change, communication gap, noise) and the window decides which historical
//! points can be released to the sink.
//!
//! # Example
//!
//! ```rust
//! use synopsis_core::config::MobilityProfile;
//! use synopsis_core::observation::Observation;
//! use synopsis_core::report::ReportBuffer;
//! use synopsis_core::tracker::SynopsisTracker;
//! use std::collections::HashMap;
//!
//! let mut tracker = SynopsisTracker::new(HashMap::new(), HashMap::new());
//! let mut buffer = ReportBuffer::new(true);
//!
//! tracker.observe(Observation::new(1, 23.6, 37.9, 1000), &mut buffer);
//! tracker.observe(Observation::new(1, 23.7, 37.9, 1060), &mut buffer);
//! tracker.drain(&mut buffer);
//!
//! let mut out = Vec::new();
//! let stats = buffer.emit_results(&mut out, false).unwrap();
//! assert_eq!(stats.accepted, 2);
//! ```

pub mod config;
pub mod geo;
pub mod observation;
pub mod report;
pub mod state;
pub mod tracker;

// Re-export commonly used types
pub use config::MobilityProfile;
pub use observation::{Annotation, Observation};
pub use report::{EmitStats, PointSink, ReportBuffer};
pub use state::MobilityState;
pub use tracker::SynopsisTracker;
