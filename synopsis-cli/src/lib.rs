//! # Synopsis CLI
//!
//! Command-line front end for the trajectory synopsis pipeline: consume a
//! time-sorted positional stream from an ASCII file, push every record
//! through the per-object mobility tracking in [`synopsis_core`], and write
//! the annotated critical points to an output file in timestamp order.
//!
//! ```text
//! input file ──► Scan (SLIDE batches) ──► SynopsisTracker ──► ReportBuffer ──► output file
//! ```
//!
//! The binary in `main.rs` is a thin wrapper: argument parsing and logger
//! setup there, everything else in [`run`] so the pipeline stays callable
//! from integration tests.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use synopsis_core::report::{EmitStats, ReportBuffer};
use synopsis_core::tracker::SynopsisTracker;

pub mod scan;
pub mod settings;

use scan::{Scan, SLIDE};

#[derive(Parser, Clone, Debug)]
#[command(name = "synopsis", version, about = "Annotate vessel position streams with mobility critical points")]
pub struct Cli {
    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Input ASCII file with space-delimited positional records
    pub input_file: PathBuf,

    /// 1-based column of the object identifier; negative when the input has
    /// no identifier column and concerns a single object
    #[arg(allow_hyphen_values = true)]
    pub id_attr: i64,

    /// 1-based column of the timestamp attribute
    pub timestamp_attr: usize,

    /// JSON document with threshold settings per vessel type
    pub settings_json: PathBuf,

    /// Semicolon-delimited CSV with vessel information (id and type)
    pub vessel_info_csv: PathBuf,

    /// Output file for the annotated points
    pub output_file: PathBuf,

    /// Emit only annotated and noise points, skipping normal ones
    #[arg(action = clap::ArgAction::Set)]
    pub annotated_only: bool,
}

/// What a completed run produced
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    /// Input records consumed
    pub records: usize,
    /// Distinct objects seen
    pub objects: usize,
    /// Output counters
    pub stats: EmitStats,
}

/// Drive the whole pipeline to stream exhaustion and write the output file.
pub fn run(args: &Cli) -> anyhow::Result<RunSummary> {
    let include_id = args.id_attr >= 1;
    let single_id = if include_id {
        None
    } else {
        Some(derive_single_id())
    };

    let time_attr = args
        .timestamp_attr
        .checked_sub(1)
        .context("timestamp-attr is 1-based and must be positive")?;

    // The first record seeds the batching cursor; without it there is
    // nothing to process.
    let t0 = scan::start_timestamp(&args.input_file, time_attr)?;
    let mut scan = Scan::new(&args.input_file, single_id)?;

    let profiles = match settings::load_profiles(&args.settings_json) {
        Ok(profiles) => profiles,
        Err(e) => {
            warn!("{}; applying built-in default settings", e);
            HashMap::new()
        }
    };
    let vessel_types = match settings::load_vessel_types(&args.vessel_info_csv) {
        Ok(table) => table,
        Err(e) => {
            warn!("{}; every vessel gets the default profile", e);
            HashMap::new()
        }
    };

    let mut tracker = SynopsisTracker::new(profiles, vessel_types);
    let mut buffer = ReportBuffer::new(include_id);

    info!("input: {}", args.input_file.display());
    let started = Instant::now();

    let mut cursor = t0;
    while !scan.exhausted {
        cursor += SLIDE;
        for observation in scan.consume_input(cursor) {
            tracker.observe(observation, &mut buffer);
        }
    }

    // Stream exhausted: flush what every object still holds
    tracker.drain(&mut buffer);

    let out = File::create(&args.output_file).with_context(|| {
        format!("cannot create output file {}", args.output_file.display())
    })?;
    let mut writer = BufWriter::new(out);
    let stats = buffer.emit_results(&mut writer, args.annotated_only)?;
    writer.flush()?;

    let summary = RunSummary {
        records: scan.rec_count,
        objects: tracker.object_count(),
        stats,
    };

    info!(
        "output: {} ({} records, {} objects, {:.3} s)",
        args.output_file.display(),
        summary.records,
        summary.objects,
        started.elapsed().as_secs_f64()
    );
    info!(
        "{} annotated points, {} noise points",
        stats.annotated, stats.noise
    );
    if summary.records > 0 {
        info!(
            "compression ratio: {:.3}",
            (summary.records.saturating_sub(stats.annotated)) as f64 / summary.records as f64
        );
    }

    Ok(summary)
}

/// Identifier assigned to every record of an id-less input. Any positive
/// integer works; the sub-second clock keeps runs distinguishable.
fn derive_single_id() -> i64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1_000_000) as i64 + 1
}
