use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::tracker::MetricsTracker;
use crate::types::Measurement;

/// Find usage logs: `path` itself when it is a file, otherwise every
/// `.jsonl` file under it. Sorted so replay counts are reproducible.
pub fn discover_logs(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().is_some_and(|ext| ext == "jsonl") {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    files
}

/// Parse one usage log: one JSON measurement per line.
///
/// Lines that do not parse are skipped; a log written by a live service
/// can end in a partial line.
pub fn parse_log(path: &Path) -> Vec<Measurement> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(_) => return Vec::new(),
    };

    let reader = BufReader::new(file);
    let mut measurements = Vec::new();

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };

        if !line.contains("\"model\"") {
            continue;
        }

        if let Ok(m) = serde_json::from_str::<Measurement>(&line) {
            measurements.push(m);
        }
    }

    measurements
}

/// Replay every log into the tracker and return the number of records.
///
/// Files are parsed and recorded from the rayon pool; the tracker's
/// locking makes the resulting totals independent of scheduling.
pub fn replay(paths: &[PathBuf], tracker: &MetricsTracker) -> usize {
    paths
        .par_iter()
        .map(|path| {
            let measurements = parse_log(path);
            let count = measurements.len();
            for m in measurements {
                tracker.record(m);
            }
            count
        })
        .sum()
}
