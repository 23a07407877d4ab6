//! Core domain for the caseview underwriting backend.
//!
//! Holds everything that has real invariants: the canonical agent-table
//! shape, the normalizer that tames loosely-typed agent payloads, the
//! aggregation procedures behind each report type, the legacy cache
//! payload upgrader, and application configuration. No network or cache
//! I/O happens here; those live in `caseview-store` and `caseview-agent`.

pub mod aggregate;
pub mod config;
pub mod domain;
pub mod normalize;
pub mod upgrade;

pub use aggregate::{
    aggregate_property_rows, aggregate_zip_rows, risk_tables_have_rows, PropertyAggregates,
    ZipAggregates,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::report::{CountyClaimRow, PropertySummary, RiskAssessment, ZipClaimStats};
pub use domain::table::{AgentTable, FunctionId, TableRow, TableStatus};
pub use normalize::{coerce_f64, coerce_i64, derive_column_keys, normalize_table};
pub use upgrade::upgrade_risk_payload;
