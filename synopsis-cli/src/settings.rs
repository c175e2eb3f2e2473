//! Settings and Vessel Information Loading
//!
//! Two companion files tune the tracker: a JSON document with threshold
//! settings per vessel type, and a semicolon-delimited CSV that maps object
//! identifiers to their vessel type. Both are optional; whatever is missing
//! falls back to the built-in defaults.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use synopsis_core::config::MobilityProfile;

/// Errors raised while loading the companion files
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot parse settings document {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("cannot read vessel info {path}: {source}")]
    VesselInfo { path: String, source: csv::Error },
}

/// Load the per-vessel-type threshold document.
///
/// The document maps a vessel type name to a flat object with any subset of
/// the threshold keys; missing keys inherit the built-in defaults. A
/// `"Default"` entry overrides the built-ins for otherwise unknown types.
pub fn load_profiles(path: &Path) -> Result<HashMap<String, Arc<MobilityProfile>>, SettingsError> {
    let file = File::open(path).map_err(|source| SettingsError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let raw: HashMap<String, MobilityProfile> = serde_json::from_reader(BufReader::new(file))
        .map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })?;

    let mut profiles = HashMap::new();
    for (vessel_type, mut profile) in raw {
        profile.vessel_type = vessel_type.clone();
        log::debug!("loaded settings for {}: {:?}", vessel_type, profile);
        profiles.insert(vessel_type, Arc::new(profile));
    }

    Ok(profiles)
}

/// Load the vessel information table: column 0 is the object identifier,
/// column 2 the vessel type. The first row is a header. Rows that do not
/// decode are skipped.
pub fn load_vessel_types(path: &Path) -> Result<HashMap<i64, String>, SettingsError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|source| SettingsError::VesselInfo {
            path: path.display().to_string(),
            source,
        })?;

    let mut table = HashMap::new();
    for row in reader.records() {
        let record = match row {
            Ok(record) => record,
            Err(e) => {
                log::debug!("skipping unreadable vessel info row: {}", e);
                continue;
            }
        };

        let id = record.get(0).and_then(|field| field.trim().parse().ok());
        let vessel_type = record.get(2).map(|field| field.trim().to_string());
        match (id, vessel_type) {
            (Some(id), Some(vessel_type)) => {
                table.insert(id, vessel_type);
            }
            _ => log::debug!("skipping malformed vessel info row: {:?}", record),
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_profiles_merge_over_defaults() {
        let file = temp_file(
            r#"{
                "Fishing": {"GAP_PERIOD": 1800, "LOW_SPEED_THRESHOLD": 4.5},
                "Default": {"STATE_SIZE": 10}
            }"#,
        );
        let profiles = load_profiles(file.path()).unwrap();

        let fishing = &profiles["Fishing"];
        assert_eq!(fishing.vessel_type, "Fishing");
        assert_eq!(fishing.gap_period, 1800);
        assert_eq!(fishing.low_speed, 4.5);
        // Untouched keys keep the built-in values
        assert_eq!(fishing.state_size, 5);

        let default = &profiles["Default"];
        assert_eq!(default.state_size, 10);
        assert_eq!(default.gap_period, 600);
    }

    #[test]
    fn test_profiles_missing_file_errors() {
        let result = load_profiles(Path::new("/nonexistent/settings.json"));
        assert!(matches!(result, Err(SettingsError::Open { .. })));
    }

    #[test]
    fn test_profiles_invalid_json_errors() {
        let file = temp_file("{ not json");
        assert!(matches!(
            load_profiles(file.path()),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_vessel_types_reads_id_and_type_columns() {
        let file = temp_file(
            "id;name;type\n228037700;Aegean Star;Passenger\n240123000;Thetis;Fishing\n",
        );
        let table = load_vessel_types(file.path()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table[&228037700], "Passenger");
        assert_eq!(table[&240123000], "Fishing");
    }

    #[test]
    fn test_vessel_types_skips_malformed_rows() {
        let file = temp_file("id;name;type\nnot-a-number;Ghost;Tug\n228037700;Aegean Star;Passenger\n");
        let table = load_vessel_types(file.path()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table[&228037700], "Passenger");
    }

    #[test]
    fn test_vessel_types_short_row_is_skipped() {
        let file = temp_file("id;name;type\n228037700;Aegean Star\n240123000;Thetis;Fishing\n");
        let table = load_vessel_types(file.path()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table[&240123000], "Fishing");
    }
}
