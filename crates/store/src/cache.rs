//! File-backed TTL cache for agent report responses.
//!
//! Each record is one pretty-printed JSON file whose name is a pure
//! function of `(function_id, case_id, params)`. Expiry is lazy: an
//! expired record found during a read is deleted on the spot. Caching is
//! strictly a performance optimization, so every storage failure degrades
//! to a miss (reads) or a logged skip (writes) instead of surfacing to the
//! caller. Concurrent writers to the same key are not coordinated; keys
//! derive from immutable request parameters, so the last writer wins with
//! equivalent content.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use caseview_core::FunctionId;

/// Durable envelope for one cached agent response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub function_id: FunctionId,
    pub case_id: String,
    pub response_data: Value,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub cache_params: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("could not create cache directory `{path}`: {source}")]
    CreateDir { path: PathBuf, source: std::io::Error },
}

pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|source| CacheError::CreateDir { path: dir.clone(), source })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up a record, treating expired, corrupt, or unreadable files as
    /// a miss. Expired records are deleted as a side effect.
    pub fn get(
        &self,
        function_id: FunctionId,
        case_id: &str,
        params: &[(&str, &str)],
    ) -> Option<CacheRecord> {
        let key = cache_key(function_id, case_id, params);
        let path = self.dir.join(&key);

        if !path.exists() {
            debug!(%key, "cache miss");
            return None;
        }

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(source) => {
                error!(%key, error = %source, "cache read error, treating as miss");
                return None;
            }
        };

        let record: CacheRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(source) => {
                error!(%key, error = %source, "corrupt cache record, treating as miss");
                return None;
            }
        };

        if Utc::now() >= record.expires_at {
            info!(%key, "cache expired");
            if let Err(source) = fs::remove_file(&path) {
                warn!(%key, error = %source, "could not delete expired cache record");
            }
            return None;
        }

        info!(%key, "cache hit");
        Some(record)
    }

    /// Store a record, overwriting any existing one with the same key.
    /// Write failures are logged and swallowed.
    pub fn set(
        &self,
        function_id: FunctionId,
        case_id: &str,
        response_data: Value,
        ttl: Duration,
        params: &[(&str, &str)],
    ) {
        let key = cache_key(function_id, case_id, params);
        let path = self.dir.join(&key);

        let now = Utc::now();
        let record = CacheRecord {
            function_id,
            case_id: case_id.to_owned(),
            response_data,
            cached_at: now,
            expires_at: now + ttl,
            cache_params: params
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
                .collect(),
        };

        let serialized = match serde_json::to_string_pretty(&record) {
            Ok(serialized) => serialized,
            Err(source) => {
                error!(%key, error = %source, "cache record failed to serialize, skipping write");
                return;
            }
        };

        match fs::write(&path, serialized) {
            Ok(()) => info!(%key, expires_at = %record.expires_at, "cached response"),
            Err(source) => error!(%key, error = %source, "cache write error, skipping"),
        }
    }

    /// Delete a record, reporting whether one existed.
    pub fn invalidate(
        &self,
        function_id: FunctionId,
        case_id: &str,
        params: &[(&str, &str)],
    ) -> bool {
        let key = cache_key(function_id, case_id, params);
        let path = self.dir.join(&key);

        if path.exists() && fs::remove_file(&path).is_ok() {
            info!(%key, "cache invalidated");
            return true;
        }
        false
    }

    /// Cached file names, optionally filtered by report type, in sorted
    /// order.
    pub fn list(&self, function_id: Option<FunctionId>) -> Vec<String> {
        let prefix = match function_id {
            Some(function_id) => format!("report_{function_id}_"),
            None => "report_".to_owned(),
        };

        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(&prefix) && name.ends_with(".json"))
            .collect();
        names.sort();
        names
    }
}

/// Deterministic cache file name: params are sorted by name and empty
/// values are excluded, so insertion order never changes the key.
fn cache_key(function_id: FunctionId, case_id: &str, params: &[(&str, &str)]) -> String {
    let mut parts = vec![format!("report_{function_id}"), sanitize(case_id)];

    let mut sorted: Vec<&(&str, &str)> =
        params.iter().filter(|(_, value)| !value.is_empty()).collect();
    sorted.sort_by_key(|(name, _)| *name);

    parts.extend(sorted.iter().map(|(_, value)| sanitize(value)));
    format!("{}.json", parts.join("_"))
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-') { ch } else { '-' })
        .collect()
}
