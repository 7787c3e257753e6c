//! Session persistence boundary.
//!
//! The core only needs a stable, round-trippable encoding of the two maps;
//! where records live is up to the [`SessionStore`] implementation. Two are
//! provided: a directory of JSON files and an in-memory map.
//!
//! Wire shape:
//!
//! ```json
//! { "session_id": "ab12", "color_map": { "1": [255, 0, 0] }, "opacity_map": { "1": 0.5 } }
//! ```
//!
//! On load, part keys may be numeric strings (`"1"`, `" 01 "`) or part labels
//! (`"skin"`); all are normalized to [`PartId`]. Two keys naming the same part
//! are rejected. `colorMap` / `opacityMap` are accepted as field names too.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::edit_state::{ColorMap, OpacityMap, Rgb, check_opacity};
use crate::error::{Result, StoreError};
use crate::parts::{self, PartId};

pub trait SessionStore {
    fn save(&mut self, session_id: &str, colors: &ColorMap, opacities: &OpacityMap) -> Result<()>;
    fn load(&self, session_id: &str) -> Result<(ColorMap, OpacityMap)>;
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    session_id: String,
    #[serde(default, alias = "colorMap")]
    color_map: BTreeMap<String, Rgb>,
    #[serde(default, alias = "opacityMap")]
    opacity_map: BTreeMap<String, f32>,
}

/// Resolve a wire key: an integer in the mask range, or a registered label.
fn parse_part_key(key: &str) -> std::result::Result<PartId, StoreError> {
    let trimmed = key.trim();
    if let Ok(raw) = trimmed.parse::<i64>() {
        return match u8::try_from(raw) {
            Ok(v) => Ok(PartId::from_mask_value(v)),
            Err(_) => Err(StoreError::InvalidKey(key.to_string())),
        };
    }
    let id = parts::label_to_id(trimmed);
    if id.is_unknown() {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(id)
}

pub fn encode_record(session_id: &str, colors: &ColorMap, opacities: &OpacityMap) -> Result<String> {
    let record = SessionRecord {
        session_id: session_id.to_string(),
        color_map: colors
            .iter()
            .map(|(id, rgb)| (id.to_string(), *rgb))
            .collect(),
        opacity_map: opacities
            .iter()
            .map(|(id, o)| (id.to_string(), *o))
            .collect(),
    };
    let json = serde_json::to_string_pretty(&record).map_err(StoreError::from)?;
    Ok(json)
}

/// Parse a record and normalize its keys. Opacities outside [0, 1] fail with
/// `InvalidOpacity`.
pub fn decode_record(json: &str) -> Result<(ColorMap, OpacityMap)> {
    let record: SessionRecord = serde_json::from_str(json).map_err(StoreError::from)?;

    let mut colors = ColorMap::new();
    for (key, rgb) in record.color_map {
        let id = parse_part_key(&key)?;
        if colors.insert(id, rgb).is_some() {
            return Err(StoreError::InvalidKey(key).into());
        }
    }
    let mut opacities = OpacityMap::new();
    for (key, value) in record.opacity_map {
        let id = parse_part_key(&key)?;
        if opacities.insert(id, check_opacity(id, value)?).is_some() {
            return Err(StoreError::InvalidKey(key).into());
        }
    }
    Ok((colors, opacities))
}

/// Session ids become file names, so keep them to a safe alphabet.
pub fn validate_session_id(session_id: &str) -> std::result::Result<(), StoreError> {
    let ok = !session_id.is_empty()
        && session_id.len() <= 128
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidSessionId(session_id.to_string()))
    }
}

// ============================================================================
// JSON FILE STORE
// ============================================================================

/// One pretty-printed JSON file per session: `{dir}/{session_id}.json`.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, session_id: &str) -> std::result::Result<PathBuf, StoreError> {
        validate_session_id(session_id)?;
        Ok(self.dir.join(format!("{}.json", session_id)))
    }
}

impl SessionStore for JsonFileStore {
    fn save(&mut self, session_id: &str, colors: &ColorMap, opacities: &OpacityMap) -> Result<()> {
        let path = self.record_path(session_id)?;
        let json = encode_record(session_id, colors, opacities)?;
        std::fs::create_dir_all(&self.dir).map_err(StoreError::from)?;
        std::fs::write(&path, json).map_err(StoreError::from)?;
        crate::log_info!("Session saved: {}", path.display());
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<(ColorMap, OpacityMap)> {
        let path = self.record_path(session_id)?;
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                crate::log_warn!("No session file: {}", path.display());
                return Err(StoreError::NotFound(session_id.to_string()).into());
            }
            Err(e) => return Err(StoreError::from(e).into()),
        };
        let maps = decode_record(&json)?;
        crate::log_info!("Session loaded: {}", path.display());
        Ok(maps)
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// Keeps encoded records in memory. Records still go through the wire format
/// so behaviour matches the file store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw JSON record, as if written by another client.
    pub fn insert_raw(&mut self, session_id: &str, json: impl Into<String>) {
        self.records.insert(session_id.to_string(), json.into());
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn save(&mut self, session_id: &str, colors: &ColorMap, opacities: &OpacityMap) -> Result<()> {
        validate_session_id(session_id)?;
        let json = encode_record(session_id, colors, opacities)?;
        self.records.insert(session_id.to_string(), json);
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<(ColorMap, OpacityMap)> {
        match self.records.get(session_id) {
            Some(json) => decode_record(json),
            None => Err(StoreError::NotFound(session_id.to_string()).into()),
        }
    }
}
