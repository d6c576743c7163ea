//! WAL segment file naming and enumeration.
//!
//! Segments are named `wal_<unix_ms>.log`, where the timestamp is the
//! moment the segment was created. This lets [`list_segments`] order
//! segments by creation time from the filename alone, without opening
//! each file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::Timestamp;

const PREFIX: &str = "wal_";
const SUFFIX: &str = ".log";

/// Builds the path for a segment created at `ts`.
pub fn segment_path(dir: &Path, ts: Timestamp) -> PathBuf {
    dir.join(format!("{PREFIX}{}{SUFFIX}", ts.as_millis()))
}

/// Parses the creation timestamp out of a segment file name.
pub fn parse_segment_ts(path: &Path) -> Option<Timestamp> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    stem.parse::<i64>().ok().map(Timestamp::from_millis)
}

/// Lists every WAL segment under `dir`, sorted oldest-first by the
/// timestamp encoded in its filename.
pub fn list_segments(dir: &Path) -> Result<Vec<(Timestamp, PathBuf)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut segments: Vec<(Timestamp, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter_map(|p| parse_segment_ts(&p).map(|ts| (ts, p)))
        .collect();
    segments.sort_by_key(|(ts, _)| *ts);
    Ok(segments)
}
