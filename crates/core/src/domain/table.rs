use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single row as returned by the data agent: string keys, arbitrary values.
pub type TableRow = Map<String, Value>;

/// Report-type tag used for cache keys and agent call context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionId {
    #[serde(rename = "A")]
    PropertySummary,
    #[serde(rename = "B")]
    ZipStats,
    #[serde(rename = "C")]
    RiskAssessment,
}

impl FunctionId {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::PropertySummary => "A",
            Self::ZipStats => "B",
            Self::RiskAssessment => "C",
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Status reported by the data agent for a table payload.
///
/// Agents are free to send any string; anything outside the known set is
/// folded into `Unknown` rather than rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Success,
    NoData,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TableStatus {
    /// Lenient parse for raw agent payloads. Absent or unrecognized
    /// statuses become `Unknown`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("success") => Self::Success,
            Some("no_data") => Self::NoData,
            Some("error") => Self::Error,
            _ => Self::Unknown,
        }
    }
}

/// Canonical tabular shape every agent payload is normalized into.
///
/// `rows` holds only mapping-shaped rows; `column_keys` always reflects the
/// keys actually present across `rows` unless the source supplied its own
/// ordered list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentTable {
    pub status: TableStatus,
    #[serde(default)]
    pub column_count: Option<i64>,
    #[serde(default)]
    pub row_count: Option<i64>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    #[serde(default)]
    pub column_keys: Vec<String>,
}

impl AgentTable {
    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{FunctionId, TableStatus};

    #[test]
    fn function_id_serializes_as_short_tag() {
        let serialized =
            serde_json::to_string(&FunctionId::PropertySummary).expect("serialize function id");
        assert_eq!(serialized, "\"A\"");
        assert_eq!(FunctionId::ZipStats.tag(), "B");
        assert_eq!(FunctionId::RiskAssessment.to_string(), "C");
    }

    #[test]
    fn status_parse_folds_unrecognized_values_into_unknown() {
        assert_eq!(TableStatus::parse(Some("success")), TableStatus::Success);
        assert_eq!(TableStatus::parse(Some(" NO_DATA ")), TableStatus::NoData);
        assert_eq!(TableStatus::parse(Some("error")), TableStatus::Error);
        assert_eq!(TableStatus::parse(Some("partial")), TableStatus::Unknown);
        assert_eq!(TableStatus::parse(None), TableStatus::Unknown);
    }

    #[test]
    fn status_deserializes_unknown_strings_without_failing() {
        let status: TableStatus =
            serde_json::from_str("\"mystery\"").expect("unknown status should deserialize");
        assert_eq!(status, TableStatus::Unknown);
    }
}
