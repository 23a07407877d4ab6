//! Read-only access to the local JSON case documents.
//!
//! Cases live as `<root>/cases/<case_id>.json`. Documents are loosely
//! structured; only the nested `property` fields the report endpoints need
//! are lifted into a typed view.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::warn;

pub struct CaseStore {
    root: PathBuf,
}

impl CaseStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load one case document. Missing files and unparseable JSON both
    /// yield `None`; the latter is logged.
    pub fn get_case(&self, case_id: &str) -> Option<Value> {
        self.load_json(&self.root.join("cases").join(format!("{case_id}.json")))
    }

    /// All parseable case documents, in file-name order.
    pub fn list_cases(&self) -> Vec<Value> {
        let cases_dir = self.root.join("cases");
        let Ok(entries) = fs::read_dir(&cases_dir) else {
            return Vec::new();
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        paths.iter().filter_map(|path| self.load_json(path)).collect()
    }

    fn load_json(&self, path: &Path) -> Option<Value> {
        if !path.exists() {
            return None;
        }
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(path = %path.display(), %error, "could not read case document");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(path = %path.display(), %error, "case document is not valid JSON");
                None
            }
        }
    }
}

/// The property fields the report endpoints key off.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CaseProperty {
    pub county_code: Option<String>,
    pub zip_code: Option<String>,
    pub address: Option<String>,
}

impl CaseProperty {
    pub fn from_case(case: &Value) -> Self {
        let property = case.get("property");
        let field = |name: &str| {
            property
                .and_then(|fields| fields.get(name))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };
        Self {
            county_code: field("countyCode"),
            zip_code: field("zipCode"),
            address: field("address"),
        }
    }

    /// Two-letter state code parsed from the address, when derivable.
    pub fn state_code(&self) -> Option<String> {
        self.address.as_deref().and_then(extract_state_code)
    }
}

/// Extract a 2-letter state code from a free-form US address.
///
/// Prefers a standalone 2-letter uppercase segment between commas
/// (`"123 Main St, Austin, TX, 78701"`), then falls back to scraping the
/// uppercase letters from the second-to-last comma segment.
pub fn extract_state_code(address: &str) -> Option<String> {
    let segments: Vec<&str> = address.split(',').map(str::trim).collect();

    for segment in &segments {
        let candidate = segment.split_whitespace().next().unwrap_or("");
        if candidate.len() == 2 && candidate.chars().all(|ch| ch.is_ascii_uppercase()) {
            return Some(candidate.to_owned());
        }
    }

    if segments.len() >= 3 {
        let state: String = segments[segments.len() - 2]
            .chars()
            .filter(|ch| ch.is_ascii_uppercase())
            .take(2)
            .collect();
        if state.len() == 2 {
            return Some(state);
        }
    }

    None
}
