//! Result Collection and Ordered Emission
//!
//! Observations leave a mobility window in eviction order, which is not
//! strictly chronological (a stop may be confirmed on a historical point
//! after newer points were already released). The [`ReportBuffer`] absorbs
//! that by keying accepted points on their timestamp and only writing them
//! out, in ascending time order, once the run is complete.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::observation::{Annotation, Observation};

/// Field delimiter in the output file
pub const DELIMITER: char = ' ';

/// Separator between multiple labels of one point
pub const SEPARATOR: char = ';';

/// Decimal places for geographic and kinematic fields
pub const PRECISION: usize = 5;

/// Receiving end of the mobility pipeline.
///
/// Ownership of an observation transfers here permanently: once reported, a
/// point is no longer reachable from any window.
pub trait PointSink {
    /// Accept a point for eventual output
    fn report(&mut self, point: Observation);
}

/// Counters produced by [`ReportBuffer::emit_results`]
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitStats {
    /// Points accepted into the buffer over the whole run
    pub accepted: usize,
    /// Points carrying at least one classification label (NOISE aside)
    pub annotated: usize,
    /// Points classified as noise
    pub noise: usize,
}

/// Buffering sink that orders accepted points by timestamp.
///
/// Points sharing a timestamp keep their insertion order, so ties between
/// objects reported in the same second stay deterministic.
#[derive(Debug, Default)]
pub struct ReportBuffer {
    include_id: bool,
    points: BTreeMap<i64, Vec<Observation>>,
    accepted: usize,
}

impl ReportBuffer {
    /// Create a buffer; `include_id` controls whether the object identifier
    /// column appears in the output.
    pub fn new(include_id: bool) -> Self {
        ReportBuffer {
            include_id,
            points: BTreeMap::new(),
            accepted: 0,
        }
    }

    /// Number of points accepted so far
    pub fn len(&self) -> usize {
        self.accepted
    }

    /// True if nothing has been reported yet
    pub fn is_empty(&self) -> bool {
        self.accepted == 0
    }

    /// Write all collected points to `out` in ascending timestamp order.
    ///
    /// With `annotated_only`, normal points are suppressed and only
    /// annotated or noise points appear in the output. Geographic and
    /// kinematic fields are printed with [`PRECISION`] decimals; rows end in
    /// CRLF.
    pub fn emit_results<W: Write>(&self, out: &mut W, annotated_only: bool) -> io::Result<EmitStats> {
        let mut stats = EmitStats {
            accepted: self.accepted,
            ..EmitStats::default()
        };

        if self.include_id {
            write!(out, "id{DELIMITER}")?;
        }
        write!(out, "lon{DELIMITER}lat{DELIMITER}t{DELIMITER}speed{DELIMITER}heading{DELIMITER}annotation\r\n")?;

        for point in self.points.values().flatten() {
            let annotated = point.is_annotated();
            let is_noise = point.annotation.contains(Annotation::NOISE);

            let label = if annotated {
                stats.annotated += 1;
                point.annotation.labels().join(&SEPARATOR.to_string())
            } else if is_noise {
                stats.noise += 1;
                "NOISE".to_string()
            } else {
                String::new()
            };

            if annotated_only && !annotated && !is_noise {
                continue;
            }

            if self.include_id {
                write!(out, "{}{DELIMITER}", point.oid)?;
            }
            write!(
                out,
                "{:.prec$}{DELIMITER}{:.prec$}{DELIMITER}{}{DELIMITER}{:.prec$}{DELIMITER}{:.prec$}{DELIMITER}{}\r\n",
                point.x,
                point.y,
                point.t,
                point.speed,
                point.heading,
                label,
                prec = PRECISION,
            )?;
        }

        Ok(stats)
    }
}

impl PointSink for ReportBuffer {
    fn report(&mut self, mut point: Observation) {
        // A point already handed over once must not be emitted twice
        if point.annotation.contains(Annotation::REPORTED) {
            return;
        }
        point.annotation.insert(Annotation::REPORTED);
        self.points.entry(point.t).or_default().push(point);
        self.accepted += 1;
    }
}
