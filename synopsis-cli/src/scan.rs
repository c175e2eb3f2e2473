//! Streaming Input Scan
//!
//! Simulates a positional data stream from an ASCII file: records are
//! consumed in batches bounded by a cursor timestamp that the caller
//! advances by a fixed slide. The scan prefetches one record past the
//! cursor and holds it back for the next batch, so no record is lost and
//! none is delivered early.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use thiserror::Error;

use synopsis_core::observation::Observation;

/// Batch cursor advance in seconds
pub const SLIDE: i64 = 600;

/// Errors raised while opening or probing the input stream
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot open input file {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("no usable start timestamp in {0}")]
    NoStartTimestamp(String),
}

/// Read the timestamp of the first record, which seeds the batching cursor.
///
/// `time_attr` is the zero-based column of the timestamp. A missing file,
/// an empty file or an unparsable value is fatal for the run.
pub fn start_timestamp(path: &Path, time_attr: usize) -> Result<i64, ScanError> {
    let file = File::open(path).map_err(|source| ScanError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .map_err(|source| ScanError::Open {
            path: path.display().to_string(),
            source,
        })?;

    first_line
        .split_whitespace()
        .nth(time_attr)
        .and_then(|field| field.parse().ok())
        .ok_or_else(|| ScanError::NoStartTimestamp(path.display().to_string()))
}

/// Line-oriented scan over a space-delimited positional stream.
///
/// Rows are `oid x y t`, or `x y t` when the whole file concerns a single
/// object (in which case every record gets the one assigned id).
pub struct Scan {
    lines: Lines<BufReader<File>>,
    single_id: Option<i64>,
    pending: Option<Observation>,
    /// True once the file ran out of records
    pub exhausted: bool,
    /// Records delivered so far
    pub rec_count: usize,
}

impl Scan {
    /// Open the input file. `single_id` switches to the id-less row layout
    /// and assigns that identifier to every record.
    pub fn new(path: &Path, single_id: Option<i64>) -> Result<Self, ScanError> {
        let file = File::open(path).map_err(|source| ScanError::Open {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Scan {
            lines: BufReader::new(file).lines(),
            single_id,
            pending: None,
            exhausted: false,
            rec_count: 0,
        })
    }

    /// Deliver all records with timestamps up to and including `t`.
    ///
    /// The first record read past the cursor is held back and returned by a
    /// later call once the cursor catches up.
    pub fn consume_input(&mut self, t: i64) -> Vec<Observation> {
        let mut batch = Vec::new();

        if let Some(prefetched) = self.pending.take() {
            if prefetched.t > t {
                // The cursor has not reached the next record yet
                self.pending = Some(prefetched);
                return batch;
            }
            self.rec_count += 1;
            batch.push(prefetched);
        }

        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    log::warn!("input read error: {}", e);
                    self.exhausted = true;
                    break;
                }
                None => {
                    self.exhausted = true;
                    break;
                }
            };

            match self.decode(&line) {
                Some(obs) => {
                    if obs.t > t {
                        self.pending = Some(obs);
                        break;
                    }
                    self.rec_count += 1;
                    batch.push(obs);
                }
                None if line.trim().is_empty() => {
                    // An empty line ends the stream by convention
                    self.exhausted = true;
                    break;
                }
                None => {
                    log::debug!("skipping malformed input line: {}", line);
                }
            }
        }

        batch
    }

    fn decode(&self, line: &str) -> Option<Observation> {
        let mut fields = line.split_whitespace();

        let oid = match self.single_id {
            Some(id) => id,
            None => fields.next()?.parse().ok()?,
        };
        let x = fields.next()?.parse().ok()?;
        let y = fields.next()?.parse().ok()?;
        let t = fields.next()?.parse().ok()?;

        Some(Observation::new(oid, x, y, t))
    }
}
