//! Atomic JSON checkpoints
//!
//! A checkpoint is a single JSON object. Besides its payload keys it carries two
//! reserved keys with the run timing, stored as epoch seconds. Writes go to a
//! temporary file in the target directory which is then renamed over the
//! target, so a reader only ever sees a complete snapshot.

use crate::{HarvestError, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Reserved key holding the start of the run that wrote the checkpoint
pub const START_TIME_KEY: &str = "_start_time";

/// Reserved key holding the time of the last flush
pub const LAST_SAVED_KEY: &str = "_last_saved";

/// Current time as whole epoch seconds
pub fn epoch_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Wall-clock timing of the run owning a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTiming {
    pub started_at: i64,
    pub last_saved: i64,
}

impl RunTiming {
    /// Timing for a run starting now
    pub fn start_now() -> Self {
        let now = epoch_seconds();
        Self {
            started_at: now,
            last_saved: now,
        }
    }

    /// Records a flush happening now
    pub fn touch(&mut self) {
        self.last_saved = epoch_seconds().max(self.started_at);
    }

    /// Seconds between the start of the run and the last flush
    pub fn elapsed_secs(&self) -> i64 {
        self.last_saved - self.started_at
    }

    /// Removes the reserved keys from a checkpoint object
    ///
    /// Returns `None` when the checkpoint carries no timing (older files).
    pub fn take_from(map: &mut Map<String, Value>, path: &Path) -> Result<Option<Self>> {
        let started = map.remove(START_TIME_KEY);
        let saved = map.remove(LAST_SAVED_KEY);

        match (started, saved) {
            (None, None) => Ok(None),
            (started, saved) => {
                let started_at = timing_value(started.as_ref(), START_TIME_KEY, path)?;
                let last_saved = match saved {
                    Some(v) => timing_value(Some(&v), LAST_SAVED_KEY, path)?,
                    None => started_at,
                };
                Ok(Some(Self {
                    started_at,
                    last_saved,
                }))
            }
        }
    }

    /// Appends the reserved keys to a checkpoint object
    pub fn insert_into(&self, map: &mut Map<String, Value>) {
        map.insert(START_TIME_KEY.to_string(), Value::from(self.started_at));
        map.insert(LAST_SAVED_KEY.to_string(), Value::from(self.last_saved));
    }
}

/// Maps a missing checkpoint to `None`, passing every other outcome through
pub fn if_present<T>(loaded: Result<T>) -> Result<Option<T>> {
    match loaded {
        Ok(value) => Ok(Some(value)),
        Err(HarvestError::CheckpointMissing { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Accepts integer or float epoch seconds
fn timing_value(value: Option<&Value>, key: &str, path: &Path) -> Result<i64> {
    value
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .ok_or_else(|| HarvestError::Checkpoint {
            path: path.to_path_buf(),
            message: format!("reserved key '{}' must be numeric", key),
        })
}

/// Reads a checkpoint file as a JSON object
///
/// # Returns
///
/// * `Ok(Map)` - The checkpoint object, reserved keys included
/// * `Err(HarvestError::CheckpointMissing)` - The file does not exist
/// * `Err(HarvestError::Checkpoint)` - The file is not a JSON object
pub fn read_checkpoint(path: &Path) -> Result<Map<String, Value>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(HarvestError::CheckpointMissing {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    let value: Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| HarvestError::Checkpoint {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(HarvestError::Checkpoint {
            path: path.to_path_buf(),
            message: format!("expected a JSON object, found {}", json_kind(&other)),
        }),
    }
}

/// Atomically replaces a checkpoint file with the given object
///
/// The parent directory is created if needed. The temporary file lives in the
/// same directory as the target so the final rename never crosses filesystems.
pub fn write_checkpoint(path: &Path, map: &Map<String, Value>) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, map)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| HarvestError::Io(e.error))?;

    tracing::trace!("Wrote checkpoint {}", path.display());
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
